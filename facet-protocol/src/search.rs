use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;

/// Query descriptor sent to the search endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    /// Basic query expression.
    #[serde(rename = "q", default, skip_serializing_if = "Option::is_none")]
    pub expression: Option<String>,

    /// Advanced query expression, always applied as a filter.
    #[serde(rename = "aq", default, skip_serializing_if = "Option::is_none")]
    pub advanced_expression: Option<String>,

    /// Query pipeline; `Some("")` bypasses the configured pipeline.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pipeline: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_hub: Option<String>,

    #[serde(default = "default_true")]
    pub enable_did_you_mean: bool,

    #[serde(default)]
    pub retrieve_first_sentences: bool,

    #[serde(rename = "debug", default)]
    pub enable_debug: bool,

    #[serde(default = "default_true")]
    pub enable_query_syntax: bool,

    #[serde(default = "default_true")]
    pub enable_duplicate_filtering: bool,

    #[serde(default = "default_excerpt_length")]
    pub excerpt_length: u32,

    #[serde(default = "default_number_of_results")]
    pub number_of_results: usize,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_criteria: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields_to_include: Option<Vec<String>>,
}

fn default_true() -> bool {
    true
}

fn default_excerpt_length() -> u32 {
    200
}

fn default_number_of_results() -> usize {
    10
}

impl Default for SearchRequest {
    fn default() -> Self {
        Self {
            expression: None,
            advanced_expression: None,
            pipeline: None,
            search_hub: None,
            enable_did_you_mean: true,
            retrieve_first_sentences: false,
            enable_debug: false,
            enable_query_syntax: true,
            enable_duplicate_filtering: true,
            excerpt_length: default_excerpt_length(),
            number_of_results: default_number_of_results(),
            sort_criteria: None,
            fields_to_include: None,
        }
    }
}

impl SearchRequest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a part to the basic expression. Empty parts are ignored.
    pub fn add_expression(mut self, part: &str) -> Self {
        self.expression = join_expression(self.expression.take(), part);
        self
    }

    /// Appends a part to the advanced expression. Empty parts are ignored.
    pub fn add_advanced_expression(mut self, part: &str) -> Self {
        self.advanced_expression = join_expression(self.advanced_expression.take(), part);
        self
    }

    pub fn with_number_of_results(mut self, count: usize) -> Self {
        self.number_of_results = count;
        self
    }

    pub fn with_sort_criteria(mut self, criteria: impl Into<String>) -> Self {
        self.sort_criteria = Some(criteria.into());
        self
    }

    pub fn with_fields_to_include(mut self, fields: Vec<String>) -> Self {
        self.fields_to_include = Some(fields);
        self
    }
}

fn join_expression(current: Option<String>, part: &str) -> Option<String> {
    let part = part.trim();
    if part.is_empty() {
        return current;
    }
    match current {
        Some(existing) if !existing.is_empty() => Some(format!("{existing} {part}")),
        _ => Some(part.to_string()),
    }
}

/// One record of a result set. Only the raw field map matters to facet
/// discovery.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unique_id: Option<String>,

    #[serde(default)]
    pub raw: Map<String, Value>,
}

impl QueryResult {
    pub fn from_raw(raw: Map<String, Value>) -> Self {
        Self {
            unique_id: None,
            raw,
        }
    }
}

/// Result set returned by the search endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResults {
    /// Total number of matching records, after filtering.
    #[serde(default)]
    pub total_count_filtered: u64,

    /// Server-side execution time in milliseconds.
    #[serde(default)]
    pub duration: u64,

    #[serde(default)]
    pub results: Vec<QueryResult>,
}

/// Options for re-executing the host query.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteQueryOptions {
    #[serde(default)]
    pub ignore_warning_search_event: bool,

    #[serde(default)]
    pub log_in_actions_history: bool,
}

impl ExecuteQueryOptions {
    /// Options for a silent replay: no warning event, nothing logged in the
    /// actions history.
    pub fn replay() -> Self {
        Self {
            ignore_warning_search_event: true,
            log_in_actions_history: false,
        }
    }
}
