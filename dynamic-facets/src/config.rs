use crate::catalog::FIELD_CATALOG_KEY;
use crate::error::FacetGeneratorError;
use crate::error::Result;
use facetgen_protocol::bare_field_name;
use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;
use std::collections::HashMap;
use std::time::Duration;

/// How candidate facet fields are discovered on a cache miss.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscoveryStrategy {
    /// Scan a batch of results and score every catalogued field.
    #[default]
    FullScan,
    /// Scan a batch of results, reading candidates from the push group field.
    PushResults,
    /// Ask the index for the most frequent values of the push group field.
    PushAggregation,
}

impl DiscoveryStrategy {
    /// Maps the component's `usePush` / `usePushAsQuery` flags.
    pub fn from_flags(use_push: bool, use_push_as_query: bool) -> Self {
        match (use_push, use_push_as_query) {
            (false, _) => DiscoveryStrategy::FullScan,
            (true, true) => DiscoveryStrategy::PushResults,
            (true, false) => DiscoveryStrategy::PushAggregation,
        }
    }

    pub fn is_push(self) -> bool {
        !matches!(self, DiscoveryStrategy::FullScan)
    }

    pub fn label(self) -> &'static str {
        match self {
            DiscoveryStrategy::FullScan => "full_scan",
            DiscoveryStrategy::PushResults => "push_results",
            DiscoveryStrategy::PushAggregation => "push_aggregation",
        }
    }
}

/// What to do when `depends_on` names a facet that is not in the interface.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingParentPolicy {
    /// Log a warning and keep generating facets.
    #[default]
    Allow,
    /// Treat the missing parent as having no selection.
    Block,
}

/// Configuration for one dynamic facet generator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratorConfig {
    /// Advanced expression always applied to discovery queries
    #[serde(default, alias = "queryToExecute")]
    pub query_to_execute: String,

    /// Fields never considered as facets (comma-separated string or list)
    #[serde(default, deserialize_with = "deserialize_field_list")]
    pub blacklist: Vec<String>,

    /// Number of results scanned per discovery query
    #[serde(default = "default_no_of_results", alias = "noOfResults")]
    pub no_of_results: usize,

    /// Maximum number of facets to generate
    #[serde(default = "default_no_of_facets", alias = "noOfFacets")]
    pub no_of_facets: usize,

    /// Minimum share of scanned results (0 - 100) a field must appear in
    #[serde(
        default = "default_threshold_percentage",
        alias = "tresholdPercentage",
        alias = "thresholdPercentage"
    )]
    pub threshold_percentage: f64,

    /// Discovery strategy
    #[serde(default)]
    pub strategy: DiscoveryStrategy,

    /// Component flag `usePush`. Picks a push strategy on load when
    /// `strategy` is left at its default
    #[serde(default, alias = "usePush")]
    pub use_push: bool,

    /// Component flag `usePushAsQuery`. With `use_push`, scan results instead
    /// of listing the group field values
    #[serde(default, alias = "usePushAsQuery")]
    pub use_push_as_query: bool,

    /// Field holding candidate facet names for the push strategies
    #[serde(default, alias = "pushGroupField")]
    pub push_group_field: Option<String>,

    /// Id of the facet that must have a selection before facets are generated
    #[serde(default, alias = "dependsOn")]
    pub depends_on: Option<String>,

    /// Behavior when the `depends_on` facet does not exist
    #[serde(default)]
    pub missing_parent: MissingParentPolicy,

    /// Fold current facet selections into the discovery query
    #[serde(default, alias = "useAdvancedQuery")]
    pub use_advanced_query: bool,

    /// Only consider user-defined index fields
    #[serde(default = "default_true", alias = "useOnlyUserFields")]
    pub use_only_user_fields: bool,

    /// Report round-trip timings after each regeneration
    #[serde(default)]
    pub diagnostics: bool,

    /// Display titles by bare field name
    #[serde(default)]
    pub dictionary: HashMap<String, String>,

    /// Prefix stripped from field names when no dictionary title exists
    #[serde(default, alias = "titlePrefix")]
    pub title_prefix: Option<String>,

    /// Upper bound on one discovery call
    #[serde(default = "default_discovery_timeout_ms", alias = "discoveryTimeoutMs")]
    pub discovery_timeout_ms: u64,

    /// Lifetime of the persisted field catalog
    #[serde(default = "default_field_cache_days", alias = "fieldCacheDays")]
    pub field_cache_days: u32,

    /// Re-apply facet selections found in the page URL to generated facets
    #[serde(default, alias = "restoreFromUrl")]
    pub restore_from_url: bool,

    /// Store key of the persisted field catalog, distinct per generator
    /// sharing a store
    #[serde(default = "default_catalog_key", alias = "catalogKey")]
    pub catalog_key: String,
}

fn default_no_of_results() -> usize {
    25
}

fn default_no_of_facets() -> usize {
    10
}

fn default_threshold_percentage() -> f64 {
    30.0
}

fn default_true() -> bool {
    true
}

fn default_discovery_timeout_ms() -> u64 {
    10_000
}

fn default_field_cache_days() -> u32 {
    7
}

fn default_catalog_key() -> String {
    FIELD_CATALOG_KEY.to_string()
}

#[derive(Deserialize)]
#[serde(untagged)]
enum FieldList {
    Joined(String),
    Items(Vec<String>),
}

fn deserialize_field_list<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let list = match FieldList::deserialize(deserializer)? {
        FieldList::Joined(joined) => parse_field_list(&joined),
        FieldList::Items(items) => items
            .iter()
            .map(|item| bare_field_name(item).to_string())
            .filter(|item| !item.is_empty())
            .collect(),
    };
    Ok(list)
}

/// Splits a comma-separated field list into bare field names.
pub fn parse_field_list(joined: &str) -> Vec<String> {
    joined
        .split(',')
        .map(bare_field_name)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            query_to_execute: String::new(),
            blacklist: Vec::new(),
            no_of_results: default_no_of_results(),
            no_of_facets: default_no_of_facets(),
            threshold_percentage: default_threshold_percentage(),
            strategy: DiscoveryStrategy::FullScan,
            use_push: false,
            use_push_as_query: false,
            push_group_field: None,
            depends_on: None,
            missing_parent: MissingParentPolicy::Allow,
            use_advanced_query: false,
            use_only_user_fields: true,
            diagnostics: false,
            dictionary: HashMap::new(),
            title_prefix: None,
            discovery_timeout_ms: default_discovery_timeout_ms(),
            field_cache_days: default_field_cache_days(),
            restore_from_url: false,
            catalog_key: default_catalog_key(),
        }
    }
}

impl GeneratorConfig {
    /// Validate configuration
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.no_of_results == 0 {
            return Err("no_of_results must be > 0".to_string());
        }

        if self.no_of_facets == 0 {
            return Err("no_of_facets must be > 0".to_string());
        }

        if !(0.0..=100.0).contains(&self.threshold_percentage) {
            return Err(format!(
                "threshold_percentage must be in [0, 100], got {}",
                self.threshold_percentage
            ));
        }

        if self.strategy.is_push() && self.group_field().is_none() {
            return Err(format!(
                "strategy {} requires push_group_field",
                self.strategy.label()
            ));
        }

        if self.discovery_timeout_ms == 0 {
            return Err("discovery_timeout_ms must be > 0".to_string());
        }

        if self.field_cache_days == 0 {
            return Err("field_cache_days must be > 0".to_string());
        }

        if self.catalog_key.trim().is_empty() {
            return Err("catalog_key must not be empty".to_string());
        }

        Ok(())
    }

    /// Create config scanning results against the field catalog
    pub fn full_scan() -> Self {
        Self::default()
    }

    /// Create config reading candidates from a group field of scanned results
    pub fn push_results(group_field: impl Into<String>) -> Self {
        Self {
            strategy: DiscoveryStrategy::PushResults,
            push_group_field: Some(group_field.into()),
            ..Default::default()
        }
    }

    /// Create config aggregating a group field directly on the index
    pub fn push_aggregation(group_field: impl Into<String>) -> Self {
        Self {
            strategy: DiscoveryStrategy::PushAggregation,
            push_group_field: Some(group_field.into()),
            ..Default::default()
        }
    }

    pub fn from_json_str(input: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(input)?;
        config.loaded()
    }

    pub fn from_toml_str(input: &str) -> Result<Self> {
        let config: Self = toml::from_str(input)?;
        config.loaded()
    }

    fn loaded(mut self) -> Result<Self> {
        self.apply_component_flags();
        self.validate().map_err(FacetGeneratorError::InvalidConfig)?;
        Ok(self)
    }

    /// Resolve `use_push` / `use_push_as_query` into `strategy`. An explicit
    /// push strategy is kept.
    pub(crate) fn apply_component_flags(&mut self) {
        if self.use_push && self.strategy == DiscoveryStrategy::FullScan {
            self.strategy = DiscoveryStrategy::from_flags(self.use_push, self.use_push_as_query);
        }
    }

    /// Bare name of the push group field, if one is configured.
    pub fn group_field(&self) -> Option<&str> {
        self.push_group_field
            .as_deref()
            .map(bare_field_name)
            .filter(|field| !field.is_empty())
    }

    /// Id of the parent facet, if one is configured.
    pub fn parent_facet_id(&self) -> Option<&str> {
        self.depends_on
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }

    pub fn discovery_timeout(&self) -> Duration {
        Duration::from_millis(self.discovery_timeout_ms)
    }

    pub fn field_cache_ttl(&self) -> chrono::TimeDelta {
        chrono::TimeDelta::days(i64::from(self.field_cache_days))
    }
}
