//! The three ways of discovering facet fields for one query.
//!
//! A [`DiscoveryJob`] owns everything one pass needs, so the host can run it
//! wherever it drives its futures and hand the result back to the generator.

use crate::config::DiscoveryStrategy;
use crate::config::GeneratorConfig;
use crate::endpoint::SearchEndpoint;
use crate::error::FacetGeneratorError;
use crate::error::Result;
use crate::policy::FacetSelectionPolicy;
use crate::policy::SelectedFacetList;
use crate::scorer::FieldTally;
use crate::selection::SelectedValuesSnapshot;
use facetgen_protocol::FieldValueSort;
use facetgen_protocol::ListFieldValuesRequest;
use facetgen_protocol::SearchRequest;
use facetgen_protocol::field_reference;
use indexmap::IndexSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// Search hub reported by discovery queries, so analytics can tell them
/// apart from user queries.
pub const DISCOVERY_SEARCH_HUB: &str = "GettingFacets";

/// Sort applied by the push result scan.
pub const PUSH_RESULTS_SORT: &str = "datedescending";

/// Request scanned by the full-result strategy.
pub fn scan_request(query: &str, query_to_execute: &str, number_of_results: usize) -> SearchRequest {
    SearchRequest {
        pipeline: Some(String::new()),
        search_hub: Some(DISCOVERY_SEARCH_HUB.to_string()),
        enable_did_you_mean: false,
        retrieve_first_sentences: false,
        enable_debug: false,
        enable_query_syntax: true,
        enable_duplicate_filtering: false,
        excerpt_length: 0,
        ..SearchRequest::new()
    }
    .with_number_of_results(number_of_results)
    .add_advanced_expression(query_to_execute)
    .add_expression(query)
}

/// Request scanned by the push result strategy: newest records first, only
/// the group field returned.
pub fn push_results_request(
    query: &str,
    query_to_execute: &str,
    number_of_results: usize,
    group_field: &str,
) -> SearchRequest {
    scan_request(query, query_to_execute, number_of_results)
        .with_sort_criteria(PUSH_RESULTS_SORT)
        .with_fields_to_include(vec![field_reference(group_field)])
}

/// Listing request of the push aggregation strategy.
pub fn aggregation_request(
    query: &str,
    query_to_execute: &str,
    max_facets: usize,
    group_field: &str,
) -> ListFieldValuesRequest {
    let query_override = format!("{query} {query_to_execute}").trim().to_string();
    ListFieldValuesRequest {
        field: field_reference(group_field),
        sort_criteria: FieldValueSort::Occurrences,
        maximum_number_of_values: max_facets,
        query_override: Some(query_override),
    }
}

/// Result of one discovery pass.
#[derive(Debug, Clone, PartialEq)]
pub struct DiscoveryOutcome {
    /// Query the facets were discovered for, as sent.
    pub query_key: String,
    pub strategy: DiscoveryStrategy,
    pub facets: SelectedFacetList,
    /// Server-side duration of the discovery query. Field-value listings do
    /// not report one.
    pub query_duration_ms: Option<u64>,
    /// Time spent scoring the returned records.
    pub scan_time_ms: u64,
    pub total_time_ms: u64,
}

/// A self-contained discovery pass for one query.
pub struct DiscoveryJob {
    endpoint: Arc<dyn SearchEndpoint>,
    strategy: DiscoveryStrategy,
    query_key: String,
    query_to_execute: String,
    policy: FacetSelectionPolicy,
    catalog: Arc<IndexSet<String>>,
    blacklist: Vec<String>,
    selected: SelectedValuesSnapshot,
    group_field: Option<String>,
}

impl DiscoveryJob {
    pub fn new(
        endpoint: Arc<dyn SearchEndpoint>,
        config: &GeneratorConfig,
        query_key: impl Into<String>,
        catalog: Arc<IndexSet<String>>,
        selected: SelectedValuesSnapshot,
    ) -> Self {
        Self {
            endpoint,
            strategy: config.strategy,
            query_key: query_key.into(),
            query_to_execute: config.query_to_execute.clone(),
            policy: FacetSelectionPolicy::from_config(config),
            catalog,
            blacklist: config.blacklist.clone(),
            selected,
            group_field: config.group_field().map(str::to_string),
        }
    }

    pub fn query_key(&self) -> &str {
        &self.query_key
    }

    pub async fn run(self) -> Result<DiscoveryOutcome> {
        let start = Instant::now();
        debug!(
            query = %self.query_key,
            strategy = self.strategy.label(),
            "running facet discovery"
        );
        let (facets, query_duration_ms, scan_time_ms) = match self.strategy {
            DiscoveryStrategy::FullScan => self.full_scan().await?,
            DiscoveryStrategy::PushResults => self.push_results().await?,
            DiscoveryStrategy::PushAggregation => self.push_aggregation().await?,
        };
        let total_time_ms = start.elapsed().as_millis() as u64;
        debug!(
            query = %self.query_key,
            facets = facets.len(),
            elapsed_ms = total_time_ms,
            "facet discovery finished"
        );
        Ok(DiscoveryOutcome {
            query_key: self.query_key,
            strategy: self.strategy,
            facets,
            query_duration_ms,
            scan_time_ms,
            total_time_ms,
        })
    }

    async fn full_scan(&self) -> Result<(SelectedFacetList, Option<u64>, u64)> {
        let request = scan_request(
            &self.query_key,
            &self.query_to_execute,
            self.policy.result_window,
        );
        let results = self.endpoint.search(request).await?;

        let scan_start = Instant::now();
        let mut tally = FieldTally::with_blacklist(&self.blacklist);
        tally.scan_records(&results.results, &self.catalog);
        let facets = self
            .policy
            .select(tally.ranked(), results.total_count_filtered, &self.selected);
        Ok((facets, Some(results.duration), elapsed_ms(scan_start.elapsed())))
    }

    async fn push_results(&self) -> Result<(SelectedFacetList, Option<u64>, u64)> {
        let group_field = self.required_group_field()?;
        let request = push_results_request(
            &self.query_key,
            &self.query_to_execute,
            self.policy.result_window,
            group_field,
        );
        let results = self.endpoint.search(request).await?;

        let scan_start = Instant::now();
        let mut tally = FieldTally::with_blacklist(&self.blacklist);
        tally.scan_group_field(&results.results, group_field);
        let facets = self.policy.top(tally.ranked());
        Ok((facets, Some(results.duration), elapsed_ms(scan_start.elapsed())))
    }

    async fn push_aggregation(&self) -> Result<(SelectedFacetList, Option<u64>, u64)> {
        let group_field = self.required_group_field()?;
        let request = aggregation_request(
            &self.query_key,
            &self.query_to_execute,
            self.policy.max_facets,
            group_field,
        );
        let values = self.endpoint.list_field_values(request).await?;

        let scan_start = Instant::now();
        let facets = values
            .into_iter()
            .map(|value| value.value)
            .filter(|value| !value.is_empty())
            .take(self.policy.max_facets)
            .collect();
        Ok((facets, None, elapsed_ms(scan_start.elapsed())))
    }

    fn required_group_field(&self) -> Result<&str> {
        self.group_field.as_deref().ok_or_else(|| {
            FacetGeneratorError::InvalidConfig(format!(
                "strategy {} requires push_group_field",
                self.strategy.label()
            ))
        })
    }
}

fn elapsed_ms(elapsed: Duration) -> u64 {
    elapsed.as_millis() as u64
}
