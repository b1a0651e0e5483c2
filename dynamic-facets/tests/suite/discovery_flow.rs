use crate::common::Host;
use crate::common::ScriptedEndpoint;
use crate::common::index_fields;
use crate::common::record;
use crate::common::results;
use crate::common::strings;
use anyhow::Result;
use facetgen_dynamic_facets::BuildingQueryOutcome;
use facetgen_dynamic_facets::DISCOVERY_SEARCH_HUB;
use facetgen_dynamic_facets::DiscoveryPhase;
use facetgen_dynamic_facets::GeneratorConfig;
use facetgen_dynamic_facets::SelectedFacetList;
use facetgen_protocol::ExecuteQueryOptions;
use facetgen_protocol::FieldValue;
use facetgen_protocol::FieldValueSort;
use facetgen_protocol::QueryResults;
use pretty_assertions::assert_eq;
use serde_json::json;

/// 25 records: `region` in 20 of them with 3 values, `color` in 5, `author`
/// in all 25 with a distinct value each.
fn catalog_results() -> QueryResults {
    let records = (0..25)
        .map(|i| {
            let mut raw = json!({ "author": format!("author {i}") });
            if i < 20 {
                raw["region"] = json!(["emea", "apac", "amer"][i % 3]);
            }
            if i < 5 {
                raw["color"] = json!(["red", "blue"][i % 2]);
            }
            record(raw)
        })
        .collect();
    results(records)
}

fn catalog_endpoint() -> ScriptedEndpoint {
    ScriptedEndpoint::new()
        .with_fields(index_fields(&["region", "color", "author"]))
        .with_results(catalog_results())
}

fn list(fields: &[&str]) -> SelectedFacetList {
    SelectedFacetList::new(strings(fields))
}

#[tokio::test]
async fn cold_start_full_scan_selects_frequent_fields() -> Result<()> {
    let config = GeneratorConfig {
        blacklist: strings(&["author"]),
        ..GeneratorConfig::full_scan()
    };
    let mut host = Host::start(config, catalog_endpoint()).await?;
    assert_eq!(host.endpoint.field_listings(), 1);
    assert_eq!(host.generator.catalog().snapshot().len(), 3);

    host.search("laptop").await;

    // region: 20 >= 7.5 with 3 values; color: 5 < 7.5.
    assert_eq!(host.generated(), strings(&["region"]));
    assert_eq!(host.generator.current_facets(), &list(&["region"]));
    assert_eq!(host.generator.state().phase, DiscoveryPhase::Ready);
    assert_eq!(host.executed, 1);
    assert_eq!(host.executor.total(), 1);

    let searches = host.endpoint.searches();
    assert_eq!(searches.len(), 1);
    assert_eq!(searches[0].expression.as_deref(), Some("laptop"));
    assert_eq!(searches[0].search_hub.as_deref(), Some(DISCOVERY_SEARCH_HUB));
    assert_eq!(searches[0].number_of_results, 25);
    assert_eq!(searches[0].excerpt_length, 0);

    let created = host.factory.created();
    assert_eq!(created.len(), 1);
    assert_eq!(created[0].field, "@region");
    assert_eq!(created[0].id, "region");
    assert_eq!(created[0].title, "region");
    Ok(())
}

#[tokio::test]
async fn blacklisted_field_is_never_counted() -> Result<()> {
    let mut unlisted = Host::start(GeneratorConfig::full_scan(), catalog_endpoint()).await?;
    unlisted.search("laptop").await;
    assert_eq!(unlisted.generated(), strings(&["author", "region"]));

    let config = GeneratorConfig::from_json_str(r#"{ "blacklist": "@author" }"#)?;
    let mut listed = Host::start(config, catalog_endpoint()).await?;
    listed.search("laptop").await;
    assert_eq!(listed.generated(), strings(&["region"]));
    Ok(())
}

#[tokio::test]
async fn repeated_query_is_served_from_cache() -> Result<()> {
    let config = GeneratorConfig {
        blacklist: strings(&["author"]),
        ..GeneratorConfig::full_scan()
    };
    let mut host = Host::start(config, catalog_endpoint()).await?;

    host.search("laptop").await;
    host.search("phone").await;
    assert_eq!(host.endpoint.discovery_calls(), 2);

    host.search("laptop").await;

    assert_eq!(host.endpoint.discovery_calls(), 2);
    assert_eq!(host.generator.cache().len(), 2);
    assert_eq!(host.generator.cache().lookup("laptop"), Some(&list(&["region"])));
    assert_eq!(host.generated(), strings(&["region"]));
    // laptop, phone, laptop: each executed once, two replays scheduled.
    assert_eq!(host.executed, 3);
    assert_eq!(host.executor.total(), 2);
    Ok(())
}

#[tokio::test]
async fn unchanged_query_is_left_alone() -> Result<()> {
    let mut host = Host::start(GeneratorConfig::full_scan(), catalog_endpoint()).await?;
    host.search("laptop").await;
    let created = host.factory.created().len();

    host.search("laptop").await;

    assert_eq!(host.factory.created().len(), created);
    assert_eq!(host.endpoint.discovery_calls(), 1);
    assert_eq!(host.executed, 2);
    Ok(())
}

#[tokio::test]
async fn push_aggregation_takes_listed_values_unconditionally() -> Result<()> {
    let endpoint = ScriptedEndpoint::new().with_values(vec![
        FieldValue::new("brand", 120),
        FieldValue::new("color", 64),
        FieldValue::new("size", 2),
        FieldValue::new("weight", 1),
    ]);
    let config = GeneratorConfig {
        query_to_execute: "@source==\"Catalog\"".to_string(),
        ..GeneratorConfig::push_aggregation("@brand")
    };
    let mut host = Host::start(config, endpoint).await?;
    assert_eq!(host.endpoint.field_listings(), 0);

    host.search("laptop").await;

    let listings = host.endpoint.listings();
    assert_eq!(listings.len(), 1);
    assert_eq!(listings[0].field, "@brand");
    assert_eq!(listings[0].sort_criteria, FieldValueSort::Occurrences);
    assert_eq!(listings[0].maximum_number_of_values, 10);
    assert_eq!(
        listings[0].query_override.as_deref(),
        Some("laptop @source==\"Catalog\"")
    );
    assert!(host.endpoint.searches().is_empty());
    assert_eq!(host.generated(), strings(&["brand", "color", "size", "weight"]));
    Ok(())
}

#[tokio::test]
async fn push_results_tally_group_field_values() -> Result<()> {
    let endpoint = ScriptedEndpoint::new().with_results(results(vec![
        record(json!({ "facetnames": ["brand", "color"] })),
        record(json!({ "facetnames": ["brand", "size"] })),
        record(json!({ "facetnames": ["brand", "color"] })),
        record(json!({ "title": "no group field" })),
    ]));
    let config = GeneratorConfig {
        no_of_facets: 2,
        ..GeneratorConfig::push_results("facetnames")
    };
    let mut host = Host::start(config, endpoint).await?;

    host.search("laptop").await;

    let searches = host.endpoint.searches();
    assert_eq!(searches[0].sort_criteria.as_deref(), Some("datedescending"));
    assert_eq!(
        searches[0].fields_to_include,
        Some(strings(&["@facetnames"]))
    );
    assert_eq!(host.generated(), strings(&["brand", "color"]));
    Ok(())
}

#[tokio::test]
async fn replay_is_silent() -> Result<()> {
    let mut host = Host::start(GeneratorConfig::full_scan(), catalog_endpoint()).await?;
    host.interface.set_query("laptop");

    let job = match host
        .generator
        .handle_building_query(&mut host.registry, &mut host.interface)
    {
        BuildingQueryOutcome::Cancel {
            discovery: Some(job),
        } => job,
        other => panic!("expected a discovery job, got {other:?}"),
    };

    // Signals arriving while discovery runs are held without a second call.
    for _ in 0..3 {
        let held = host
            .generator
            .handle_building_query(&mut host.registry, &mut host.interface);
        assert!(held.is_cancelled());
    }

    host.generator.discover(job).await;

    assert_eq!(host.endpoint.discovery_calls(), 1);
    assert_eq!(
        host.executor.take_scheduled(),
        Some(ExecuteQueryOptions {
            ignore_warning_search_event: true,
            log_in_actions_history: false,
        })
    );
    assert_eq!(host.executor.take_scheduled(), None);
    Ok(())
}
