use crate::common::Host;
use crate::common::ScriptedEndpoint;
use crate::common::TestFacet;
use crate::common::index_fields;
use crate::common::record;
use crate::common::results;
use crate::common::strings;
use anyhow::Result;
use facetgen_dynamic_facets::DiscoveryStrategy;
use facetgen_dynamic_facets::FacetSource;
use facetgen_dynamic_facets::GeneratorConfig;
use facetgen_dynamic_facets::SelectedFacetList;
use pretty_assertions::assert_eq;
use serde_json::json;
use std::collections::HashMap;
use tracing_test::traced_test;

/// 25 records all carrying `brand == "acme"`, 20 of them a `region`.
fn single_brand_endpoint() -> ScriptedEndpoint {
    let records = (0..25)
        .map(|i| {
            let mut raw = json!({ "brand": "acme" });
            if i < 20 {
                raw["region"] = json!(["emea", "apac", "amer"][i % 3]);
            }
            record(raw)
        })
        .collect();
    ScriptedEndpoint::new()
        .with_fields(index_fields(&["brand", "region", "ec_item_group"]))
        .with_results(results(records))
}

fn advanced() -> GeneratorConfig {
    GeneratorConfig {
        use_advanced_query: true,
        ..GeneratorConfig::full_scan()
    }
}

#[tokio::test]
async fn single_valued_field_is_dropped_without_selection() -> Result<()> {
    let mut host = Host::start(advanced(), single_brand_endpoint()).await?;

    host.search("laptop").await;

    assert_eq!(host.generated(), strings(&["region"]));
    Ok(())
}

#[tokio::test]
async fn selected_field_survives_and_is_preselected() -> Result<()> {
    let mut host = Host::start(advanced(), single_brand_endpoint()).await?;
    host.registry
        .register(TestFacet::mounted("brand-filter", "@brand", &["acme"]));

    host.search("laptop").await;

    let query_key = "laptop @brand==\"acme\"";
    let searches = host.endpoint.searches();
    assert_eq!(searches[0].expression.as_deref(), Some(query_key));
    assert_eq!(
        host.generator.cache().lookup(query_key),
        Some(&SelectedFacetList::new(strings(&["brand", "region"])))
    );
    assert_eq!(host.generated(), strings(&["brand", "region"]));
    assert_eq!(host.selected("brand"), Some(strings(&["acme"])));
    assert_eq!(host.selected("region"), Some(Vec::new()));
    Ok(())
}

#[tokio::test]
async fn selection_change_rediscovers_in_advanced_mode() -> Result<()> {
    let mut host = Host::start(advanced(), single_brand_endpoint()).await?;
    host.search("laptop").await;
    assert_eq!(host.endpoint.discovery_calls(), 1);

    if let Some(region) = host.registry.get_mut("region") {
        region.select_multiple_values(&strings(&["emea"]));
    }
    host.interface.set("f:region", json!(["emea"]));
    host.run_pipeline().await;

    assert_eq!(host.endpoint.discovery_calls(), 2);
    assert_eq!(
        host.endpoint.searches()[1].expression.as_deref(),
        Some("laptop @region==\"emea\"")
    );
    assert_eq!(host.selected("region"), Some(strings(&["emea"])));
    Ok(())
}

#[tokio::test]
async fn state_change_is_ignored_without_advanced_mode() -> Result<()> {
    let mut host = Host::start(GeneratorConfig::full_scan(), single_brand_endpoint()).await?;
    host.search("laptop").await;

    host.interface.set("f:region", json!(["emea"]));
    host.run_pipeline().await;

    assert_eq!(host.endpoint.discovery_calls(), 1);
    assert_eq!(host.factory.created().len(), 1);
    Ok(())
}

#[tokio::test]
async fn titles_come_from_dictionary_or_field_name() -> Result<()> {
    let records = (0..10)
        .map(|i| {
            record(json!({
                "region": (["north", "south"][i % 2]),
                "ec_item_group": (["a", "b", "c"][i % 3]),
            }))
        })
        .collect();
    let endpoint = ScriptedEndpoint::new()
        .with_fields(index_fields(&["region", "ec_item_group"]))
        .with_results(results(records));
    let config = GeneratorConfig {
        title_prefix: Some("ec_".to_string()),
        dictionary: HashMap::from([("region".to_string(), "Sales region".to_string())]),
        ..GeneratorConfig::full_scan()
    };
    let mut host = Host::start(config, endpoint).await?;

    host.search("laptop").await;

    let titles: Vec<(String, String)> = host
        .factory
        .created()
        .into_iter()
        .map(|spec| (spec.id, spec.title))
        .collect();
    assert_eq!(
        titles,
        vec![
            ("ec_item_group".to_string(), "item group".to_string()),
            ("region".to_string(), "Sales region".to_string()),
        ]
    );

    host.generator.update_dictionary(HashMap::from([(
        "ec_item_group".to_string(),
        "Item group".to_string(),
    )]));
    host.search("phone").await;
    let latest = host.factory.created();
    assert_eq!(latest[2].title, "Item group");
    assert_eq!(latest[3].title, "region");
    Ok(())
}

#[tokio::test]
async fn url_selection_is_restored_on_generated_facets() -> Result<()> {
    let config = GeneratorConfig {
        restore_from_url: true,
        ..GeneratorConfig::full_scan()
    };
    let mut host = Host::start(config, single_brand_endpoint()).await?;
    host.interface
        .set_location("https://shop.example.com/search#q=laptop&f:region=[emea,apac]");

    host.search("laptop").await;

    assert_eq!(host.selected("region"), Some(strings(&["emea", "apac"])));
    Ok(())
}

#[tokio::test]
async fn url_selection_matching_state_is_not_reapplied() -> Result<()> {
    let config = GeneratorConfig {
        restore_from_url: true,
        ..GeneratorConfig::full_scan()
    };
    let mut host = Host::start(config, single_brand_endpoint()).await?;
    host.interface
        .set_location("https://shop.example.com/search#f:region=[emea]");
    host.interface.set("f:region", json!(["emea"]));

    host.search("laptop").await;

    assert_eq!(host.selected("region"), Some(Vec::new()));
    Ok(())
}

#[tokio::test]
#[traced_test]
async fn malformed_url_state_is_logged_and_skipped() -> Result<()> {
    let config = GeneratorConfig {
        restore_from_url: true,
        ..GeneratorConfig::full_scan()
    };
    let mut host = Host::start(config, single_brand_endpoint()).await?;
    host.interface
        .set_location("https://shop.example.com/search#f:region=emea");

    host.search("laptop").await;

    assert!(logs_contain("unable to parse facet state in the url"));
    assert_eq!(host.generated(), strings(&["region"]));
    Ok(())
}

#[tokio::test]
async fn diagnostics_report_each_regeneration_once() -> Result<()> {
    let config = GeneratorConfig {
        diagnostics: true,
        ..GeneratorConfig::full_scan()
    };
    let mut host = Host::start(config, single_brand_endpoint()).await?;

    host.search("laptop").await;
    host.search("phone").await;
    host.search("laptop").await;
    host.search("laptop").await;

    let sources: Vec<FacetSource> = host.reports.iter().map(|report| report.source).collect();
    assert_eq!(
        sources,
        vec![
            FacetSource::Discovery(DiscoveryStrategy::FullScan),
            FacetSource::Discovery(DiscoveryStrategy::FullScan),
            FacetSource::Cache,
        ]
    );
    assert_eq!(host.reports[0].discovery_query_ms, Some(12));
    assert!(host.reports[0].scan_time_ms.is_some());
    assert!(host.reports[0].replay_time_ms.is_some());
    assert!(host.reports[2].from_cache());
    assert_eq!(host.reports[2].facets, 1);
    assert_eq!(host.generator.state().last_query_duration_ms, Some(12));
    Ok(())
}

#[tokio::test]
async fn diagnostics_are_off_by_default() -> Result<()> {
    let mut host = Host::start(GeneratorConfig::full_scan(), single_brand_endpoint()).await?;
    host.search("laptop").await;
    assert!(host.reports.is_empty());
    Ok(())
}
