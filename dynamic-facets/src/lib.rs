/*!
# Dynamic Facets

Generates the facets of a search interface from the fields the current
results carry, instead of a fixed facet list:
- **Discovery** scores candidate fields on a batch of results, or reads them
  from a push-source group field
- **Selection policy** keeps fields that appear often enough and offer more
  than one value
- **Per-query cache** runs discovery at most once per query
- **Parent gate** holds generation until a parent facet has a selection

## Flow

```text
building query
  ├─> ParentDependencyGate ── deny ──> clear generated facets
  ├─> unchanged query ──────────────> proceed
  ├─> QueryFacetCache hit ──────────> regenerate facets, proceed
  └─> miss ──> cancel query
                 └─> DiscoveryJob (full scan | push results | push aggregation)
                       └─> cache, re-execute query ──> regenerate facets
```

## Example

```rust,no_run
use facetgen_dynamic_facets::{BuildingQueryOutcome, Collaborators, DynamicFacetGenerator};
use facetgen_dynamic_facets::{FacetRegistry, GeneratorConfig, MemoryInterfaceState};

async fn on_building_query(
    generator: &mut DynamicFacetGenerator,
    registry: &mut FacetRegistry,
    state: &mut MemoryInterfaceState,
) -> bool {
    match generator.handle_building_query(registry, state) {
        BuildingQueryOutcome::Proceed => true,
        BuildingQueryOutcome::Cancel { discovery } => {
            if let Some(job) = discovery {
                // Re-executes the query through the host once done.
                generator.discover(job).await;
            }
            false
        }
    }
}

# async fn setup(collaborators: Collaborators) -> anyhow::Result<()> {
let config = GeneratorConfig::from_json_str(r#"{ "noOfFacets": 5, "tresholdPercentage": 20 }"#)?;
let mut generator = DynamicFacetGenerator::new(config, collaborators)?;
generator.initialize().await;
# Ok(())
# }
```

## Strategies

- **FullScan** (default): tally every catalogued field of `no_of_results` records
- **PushResults**: tally the values of the push group field across records
- **PushAggregation**: list the most frequent values of the push group field
*/

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

mod cache;
mod catalog;
mod config;
mod controller;
mod diagnostics;
mod discovery;
mod endpoint;
mod error;
mod gate;
mod policy;
mod scorer;
mod selection;
mod state;
mod store;
mod url_state;
mod widgets;

pub use cache::QueryFacetCache;
pub use catalog::{FIELD_CATALOG_KEY, FieldCatalog};
pub use config::{DiscoveryStrategy, GeneratorConfig, MissingParentPolicy, parse_field_list};
pub use controller::{
    BuildingQueryOutcome, Collaborators, DiscoveryPhase, DiscoveryState, DynamicFacetGenerator,
    QuerySuccessArgs,
};
pub use diagnostics::{DiagnosticsReport, FacetSource};
pub use discovery::{
    DISCOVERY_SEARCH_HUB, DiscoveryJob, DiscoveryOutcome, aggregation_request,
    push_results_request, scan_request,
};
pub use endpoint::{QueryExecutor, SearchEndpoint};
pub use error::{FacetGeneratorError, Result};
pub use gate::{GateDecision, ParentDependencyGate};
pub use policy::{FacetSelectionPolicy, SelectedFacetList};
pub use scorer::{FieldObservation, FieldTally};
pub use selection::SelectedValuesSnapshot;
pub use state::{InterfaceState, MemoryInterfaceState, QUERY_STATE_KEY, facet_state_key};
pub use store::{FileKeyValueStore, KeyValueStore, MemoryKeyValueStore};
pub use url_state::{facet_values_from_url, parse_facet_values, url_params};
pub use widgets::{FacetRegistry, FacetWidget, FacetWidgetFactory, FacetWidgetSpec, facet_title};
