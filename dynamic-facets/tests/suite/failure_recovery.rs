use crate::common::Behavior;
use crate::common::Host;
use crate::common::ScriptedEndpoint;
use crate::common::index_fields;
use crate::common::record;
use crate::common::results;
use crate::common::strings;
use anyhow::Result;
use facetgen_dynamic_facets::DiscoveryPhase;
use facetgen_dynamic_facets::GeneratorConfig;
use pretty_assertions::assert_eq;
use serde_json::json;
use tracing_test::traced_test;

fn endpoint() -> ScriptedEndpoint {
    let records = (0..10)
        .map(|i| record(json!({ "region": (["north", "south"][i % 2]) })))
        .collect();
    ScriptedEndpoint::new()
        .with_fields(index_fields(&["region"]))
        .with_results(results(records))
}

#[tokio::test(start_paused = true)]
#[traced_test]
async fn hung_discovery_times_out_and_replays_unfiltered() -> Result<()> {
    let config = GeneratorConfig {
        discovery_timeout_ms: 2_000,
        ..GeneratorConfig::full_scan()
    };
    let mut host = Host::start(config, endpoint()).await?;
    host.endpoint.set_behavior(Behavior::Hang);

    host.search("laptop").await;

    assert!(logs_contain("timed out after 2000ms"));
    assert_eq!(host.generator.state().phase, DiscoveryPhase::Ready);
    assert!(host.generated().is_empty());
    assert!(host.generator.cache().is_empty());
    assert_eq!(host.executor.total(), 1);
    assert_eq!(host.executed, 1);
    Ok(())
}

#[tokio::test]
#[traced_test]
async fn failed_discovery_caches_nothing() -> Result<()> {
    let mut host = Host::start(GeneratorConfig::full_scan(), endpoint()).await?;
    host.endpoint
        .set_behavior(Behavior::Fail("service unavailable".to_string()));

    host.search("laptop").await;

    assert!(logs_contain("facet discovery failed"));
    assert!(logs_contain("service unavailable"));
    assert!(host.generated().is_empty());
    assert!(host.generator.cache().is_empty());
    assert_eq!(host.executed, 1);
    Ok(())
}

#[tokio::test]
async fn failure_clears_previous_facets_then_later_query_retries() -> Result<()> {
    let mut host = Host::start(GeneratorConfig::full_scan(), endpoint()).await?;
    host.search("laptop").await;
    assert_eq!(host.generated(), strings(&["region"]));

    host.endpoint
        .set_behavior(Behavior::Fail("service unavailable".to_string()));
    host.search("phone").await;
    assert!(host.generated().is_empty());
    assert_eq!(host.endpoint.discovery_calls(), 2);

    // Same query again: nothing changed, nothing retried.
    host.search("phone").await;
    assert_eq!(host.endpoint.discovery_calls(), 2);

    host.endpoint.set_behavior(Behavior::Respond);
    host.search("tablet").await;
    assert_eq!(host.generated(), strings(&["region"]));
    assert_eq!(host.endpoint.discovery_calls(), 3);
    assert!(host.generator.cache().lookup("phone").is_none());
    Ok(())
}

#[tokio::test]
async fn empty_catalog_degrades_to_no_facets() -> Result<()> {
    let endpoint = ScriptedEndpoint::new().with_results(results(vec![
        record(json!({ "region": "north" })),
        record(json!({ "region": "south" })),
    ]));
    let mut host = Host::start(GeneratorConfig::full_scan(), endpoint).await?;
    assert!(host.generator.catalog().is_empty());

    host.search("laptop").await;

    assert!(host.generated().is_empty());
    assert_eq!(host.endpoint.discovery_calls(), 1);
    assert_eq!(host.executed, 1);
    Ok(())
}
