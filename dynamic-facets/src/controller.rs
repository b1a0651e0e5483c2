use crate::cache::QueryFacetCache;
use crate::catalog::FieldCatalog;
use crate::config::DiscoveryStrategy;
use crate::config::GeneratorConfig;
use crate::diagnostics::DiagnosticsReport;
use crate::diagnostics::FacetSource;
use crate::discovery::DiscoveryJob;
use crate::discovery::DiscoveryOutcome;
use crate::endpoint::QueryExecutor;
use crate::endpoint::SearchEndpoint;
use crate::error::FacetGeneratorError;
use crate::error::Result;
use crate::gate::GateDecision;
use crate::gate::ParentDependencyGate;
use crate::policy::SelectedFacetList;
use crate::selection::SelectedValuesSnapshot;
use crate::state::InterfaceState;
use crate::state::facet_state_key;
use crate::store::KeyValueStore;
use crate::url_state::facet_values_from_url;
use crate::widgets::FacetRegistry;
use crate::widgets::FacetWidget;
use crate::widgets::FacetWidgetFactory;
use crate::widgets::FacetWidgetSpec;
use crate::widgets::facet_title;
use facetgen_protocol::ExecuteQueryOptions;
use facetgen_protocol::bare_field_name;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::time::Instant;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::warn;

/// Host services a generator is wired to.
pub struct Collaborators {
    pub endpoint: Arc<dyn SearchEndpoint>,
    pub executor: Arc<dyn QueryExecutor>,
    pub widgets: Arc<dyn FacetWidgetFactory>,
    /// Persists the field catalog between sessions.
    pub store: Arc<dyn KeyValueStore>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum DiscoveryPhase {
    #[default]
    Idle,
    /// A discovery pass was dispatched for `query_key` and has not completed.
    AwaitingDiscovery { query_key: String },
    /// Generated facets match the last handled query.
    Ready,
}

/// Session state of one generator.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscoveryState {
    pub phase: DiscoveryPhase,
    /// Basic query of the last pass that produced facets.
    pub previous_query: Option<String>,
    pub previous_signature: Option<String>,
    /// Server-side duration of the last discovery query.
    pub last_query_duration_ms: Option<u64>,
}

impl DiscoveryState {
    pub fn is_awaiting_discovery(&self) -> bool {
        matches!(self.phase, DiscoveryPhase::AwaitingDiscovery { .. })
    }
}

/// What the host pipeline should do with the query being built.
#[must_use]
pub enum BuildingQueryOutcome {
    /// Execute the query.
    Proceed,
    /// Do not execute the query this round. When `discovery` is set, run it
    /// (see [`DynamicFacetGenerator::discover`]); the generator re-executes
    /// the query once it completes.
    Cancel { discovery: Option<DiscoveryJob> },
}

impl BuildingQueryOutcome {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, BuildingQueryOutcome::Cancel { .. })
    }
}

impl std::fmt::Debug for BuildingQueryOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BuildingQueryOutcome::Proceed => write!(f, "Proceed"),
            BuildingQueryOutcome::Cancel { discovery } => f
                .debug_struct("Cancel")
                .field("discovery", &discovery.as_ref().map(DiscoveryJob::query_key))
                .finish(),
        }
    }
}

/// Payload of the host's query-success signal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QuerySuccessArgs {
    /// The query was fired by search-as-you-type.
    pub search_as_you_type: bool,
}

/// Discovery result waiting for the replayed query.
struct PendingFacets {
    query_key: String,
    strategy: DiscoveryStrategy,
    facets: SelectedFacetList,
    scan_time_ms: u64,
    discovery_query_ms: Option<u64>,
    started: Instant,
    replay_started: Instant,
}

struct ReportDraft {
    query: String,
    source: FacetSource,
    facets: usize,
    started: Instant,
    scan_time_ms: Option<u64>,
    replay_started: Option<Instant>,
    discovery_query_ms: Option<u64>,
}

/// Generates the facets of a search interface from the fields its results
/// actually carry.
///
/// The host calls [`handle_building_query`](Self::handle_building_query)
/// before executing each query and honors the returned outcome. A cancelled
/// query comes back through the host pipeline once discovery completes, and
/// that pass generates the facets.
pub struct DynamicFacetGenerator {
    config: GeneratorConfig,
    endpoint: Arc<dyn SearchEndpoint>,
    executor: Arc<dyn QueryExecutor>,
    widgets: Arc<dyn FacetWidgetFactory>,
    catalog: FieldCatalog,
    cache: QueryFacetCache,
    gate: ParentDependencyGate,
    snapshot: SelectedValuesSnapshot,
    state: DiscoveryState,
    discovery_started: Option<Instant>,
    pending: Option<PendingFacets>,
    failed_query: Option<String>,
    current_facets: SelectedFacetList,
    generated: Vec<String>,
    report: Option<ReportDraft>,
}

impl DynamicFacetGenerator {
    pub fn new(mut config: GeneratorConfig, collaborators: Collaborators) -> Result<Self> {
        config.apply_component_flags();
        config.validate().map_err(FacetGeneratorError::InvalidConfig)?;
        let catalog = FieldCatalog::new(
            collaborators.store,
            config.field_cache_ttl(),
            config.use_only_user_fields,
        )
        .with_key(config.catalog_key.clone());
        let gate = ParentDependencyGate::from_config(&config);
        Ok(Self {
            config,
            endpoint: collaborators.endpoint,
            executor: collaborators.executor,
            widgets: collaborators.widgets,
            catalog,
            cache: QueryFacetCache::new(),
            gate,
            snapshot: SelectedValuesSnapshot::new(),
            state: DiscoveryState::default(),
            discovery_started: None,
            pending: None,
            failed_query: None,
            current_facets: SelectedFacetList::default(),
            generated: Vec::new(),
            report: None,
        })
    }

    /// Load the field catalog, fetching it from the index when the persisted
    /// copy is missing or expired. Returns the number of catalogued fields.
    ///
    /// Push strategies read candidates from their group field and skip the
    /// catalog. A failed fetch leaves the catalog empty.
    pub async fn initialize(&mut self) -> usize {
        if self.config.strategy.is_push() {
            debug!(
                strategy = self.config.strategy.label(),
                "push strategy, skipping field catalog"
            );
            return 0;
        }
        let loaded = self.catalog.load().len();
        if loaded > 0 {
            return loaded;
        }
        match self.refresh_catalog().await {
            Ok(count) => count,
            Err(err) => {
                warn!("failed to load facetable fields: {err}");
                0
            }
        }
    }

    pub async fn refresh_catalog(&mut self) -> Result<usize> {
        self.catalog.refresh(self.endpoint.as_ref()).await
    }

    /// Decide what happens to the query the host is about to execute.
    pub fn handle_building_query(
        &mut self,
        registry: &mut FacetRegistry,
        interface: &mut dyn InterfaceState,
    ) -> BuildingQueryOutcome {
        if self.gate.evaluate(registry) == GateDecision::Deny {
            debug!(
                depends_on = self.gate.parent().unwrap_or_default(),
                "parent facet has no selection, clearing generated facets"
            );
            self.clear_generated_facets(registry, interface);
            self.state.previous_query = None;
            self.state.previous_signature = None;
            return BuildingQueryOutcome::Proceed;
        }

        let Some(query) = interface.query() else {
            debug!("query not initialized yet");
            return BuildingQueryOutcome::Proceed;
        };
        let signature = interface.signature();

        let same_query = self.state.previous_query.as_deref() == Some(query.as_str());
        let same_state = self.state.previous_signature.as_deref() == Some(signature.as_str());
        if same_query && (same_state || !self.config.use_advanced_query) {
            debug!(query = %query, "generated facets already match the query");
            return BuildingQueryOutcome::Proceed;
        }

        if let DiscoveryPhase::AwaitingDiscovery { query_key } = &self.state.phase {
            debug!(query = %query_key, "discovery in flight, holding query");
            return BuildingQueryOutcome::Cancel { discovery: None };
        }

        let started = Instant::now();
        let query_key = self.query_key(&query, registry);
        let pending = self
            .pending
            .take()
            .filter(|pending| pending.query_key == query_key);
        let failed = self
            .failed_query
            .take()
            .is_some_and(|failed| failed == query_key);

        let (facets, draft) = if let Some(pending) = pending {
            let draft = ReportDraft {
                query: query_key,
                source: FacetSource::Discovery(pending.strategy),
                facets: pending.facets.len(),
                started: pending.started,
                scan_time_ms: Some(pending.scan_time_ms),
                replay_started: Some(pending.replay_started),
                discovery_query_ms: pending.discovery_query_ms,
            };
            (pending.facets, draft)
        } else if failed {
            debug!(query = %query_key, "discovery failed for query, proceeding without facets");
            let draft = ReportDraft::new(query_key, FacetSource::Fallback, 0, started);
            (SelectedFacetList::default(), draft)
        } else if let Some(facets) = self.cache.lookup(&query_key) {
            debug!(query = %query_key, facets = facets.len(), "facets served from cache");
            let draft = ReportDraft::new(query_key, FacetSource::Cache, facets.len(), started);
            (facets.clone(), draft)
        } else {
            info!(
                query = %query_key,
                strategy = self.config.strategy.label(),
                "cancelling query to discover its facets"
            );
            let job = DiscoveryJob::new(
                Arc::clone(&self.endpoint),
                &self.config,
                query_key.clone(),
                self.catalog.snapshot(),
                self.snapshot.clone(),
            );
            self.state.phase = DiscoveryPhase::AwaitingDiscovery { query_key };
            self.discovery_started = Some(started);
            return BuildingQueryOutcome::Cancel {
                discovery: Some(job),
            };
        };

        self.state.previous_query = Some(query);
        self.state.previous_signature = Some(signature);
        self.state.phase = DiscoveryPhase::Ready;
        self.regenerate(facets, registry, interface);
        self.report = self.config.diagnostics.then_some(draft);
        BuildingQueryOutcome::Proceed
    }

    /// Run `job` under the discovery timeout and process its result.
    pub async fn discover(&mut self, job: DiscoveryJob) {
        let timeout = self.config.discovery_timeout();
        let query = job.query_key().to_string();
        let result = match tokio::time::timeout(timeout, job.run()).await {
            Ok(result) => result,
            Err(_) => Err(FacetGeneratorError::DiscoveryTimeout {
                query,
                timeout_ms: self.config.discovery_timeout_ms,
            }),
        };
        self.complete_discovery(result);
    }

    /// Record the result of the dispatched discovery and re-execute the
    /// cancelled query.
    ///
    /// A failed discovery caches nothing; the re-executed query then goes
    /// through without generated facets.
    pub fn complete_discovery(&mut self, result: Result<DiscoveryOutcome>) {
        let query_key = match std::mem::take(&mut self.state.phase) {
            DiscoveryPhase::AwaitingDiscovery { query_key } => query_key,
            other => {
                warn!("discovery result received with no discovery pending");
                self.state.phase = other;
                return;
            }
        };
        let started = self.discovery_started.take().unwrap_or_else(Instant::now);

        match result {
            Ok(outcome) => {
                info!(
                    query = %query_key,
                    strategy = outcome.strategy.label(),
                    facets = outcome.facets.len(),
                    elapsed_ms = outcome.total_time_ms,
                    "facets discovered, re-executing query"
                );
                self.state.last_query_duration_ms = outcome.query_duration_ms;
                self.cache.store(&query_key, outcome.facets.clone());
                self.pending = Some(PendingFacets {
                    query_key,
                    strategy: outcome.strategy,
                    facets: outcome.facets,
                    scan_time_ms: outcome.scan_time_ms,
                    discovery_query_ms: outcome.query_duration_ms,
                    started,
                    replay_started: Instant::now(),
                });
            }
            Err(err) => {
                warn!(query = %query_key, "facet discovery failed, re-executing query without facets: {err}");
                self.failed_query = Some(query_key);
            }
        }

        self.executor.execute_query(ExecuteQueryOptions::replay());
    }

    /// Report the timings of the last regeneration, once, when diagnostics
    /// are enabled.
    pub fn handle_query_success(&mut self, args: QuerySuccessArgs) -> Option<DiagnosticsReport> {
        if args.search_as_you_type {
            return None;
        }
        let draft = self.report.take()?;
        let now = Instant::now();
        let report = DiagnosticsReport {
            query: draft.query,
            source: draft.source,
            facets: draft.facets,
            total_time_ms: now.duration_since(draft.started).as_millis() as u64,
            scan_time_ms: draft.scan_time_ms,
            replay_time_ms: draft
                .replay_started
                .map(|replay| now.duration_since(replay).as_millis() as u64),
            discovery_query_ms: draft.discovery_query_ms,
        };
        info!(query = %report.query, "facet generation timings\n{report}");
        Some(report)
    }

    /// Remove every facet this generator created and blank its state entry.
    pub fn clear_generated_facets(
        &mut self,
        registry: &mut FacetRegistry,
        interface: &mut dyn InterfaceState,
    ) {
        for id in self.generated.drain(..) {
            if let Some(mut widget) = registry.remove(&id) {
                widget.disable();
            }
            interface.blank(&facet_state_key(&id));
        }
        self.current_facets = SelectedFacetList::default();
    }

    /// Replace the field → title dictionary used for facets generated from
    /// now on.
    pub fn update_dictionary(&mut self, dictionary: HashMap<String, String>) {
        self.config.dictionary = dictionary;
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    pub fn state(&self) -> &DiscoveryState {
        &self.state
    }

    pub fn cache(&self) -> &QueryFacetCache {
        &self.cache
    }

    pub fn catalog(&self) -> &FieldCatalog {
        &self.catalog
    }

    /// Facet fields currently generated, in display order.
    pub fn current_facets(&self) -> &SelectedFacetList {
        &self.current_facets
    }

    /// Ids of the facets this generator registered.
    pub fn generated_facets(&self) -> &[String] {
        &self.generated
    }

    /// Selections captured by the last advanced-query pass.
    pub fn selected_values(&self) -> &SelectedValuesSnapshot {
        &self.snapshot
    }

    fn query_key(&mut self, query: &str, registry: &FacetRegistry) -> String {
        if !self.config.use_advanced_query {
            return query.to_string();
        }
        self.snapshot = SelectedValuesSnapshot::capture(registry);
        let fragment = self.snapshot.advanced_expression();
        match (query.is_empty(), fragment.is_empty()) {
            (_, true) => query.to_string(),
            (true, false) => fragment,
            (false, false) => format!("{query} {fragment}"),
        }
    }

    fn regenerate(
        &mut self,
        facets: SelectedFacetList,
        registry: &mut FacetRegistry,
        interface: &mut dyn InterfaceState,
    ) {
        self.clear_generated_facets(registry, interface);
        let location = if self.config.restore_from_url {
            interface.location()
        } else {
            None
        };

        for field in &facets {
            let field = bare_field_name(field);
            if field.is_empty() {
                continue;
            }
            let title = facet_title(
                field,
                &self.config.dictionary,
                self.config.title_prefix.as_deref(),
            );
            let spec = FacetWidgetSpec::for_field(field, title);
            if registry.contains(&spec.id) {
                warn!(facet = %spec.id, "a facet with this id already exists, not generating it");
                continue;
            }

            let mut widget = self.widgets.create(&spec);
            if let Some(values) = self.snapshot.get(field) {
                widget.select_multiple_values(values);
            }
            if let Some(location) = location.as_deref() {
                restore_url_selection(widget.as_mut(), location, &*interface);
            }
            self.generated.push(spec.id);
            registry.register(widget);
        }

        debug!(facets = self.generated.len(), "generated facets");
        self.current_facets = facets;
    }
}

impl ReportDraft {
    fn new(query: String, source: FacetSource, facets: usize, started: Instant) -> Self {
        Self {
            query,
            source,
            facets,
            started,
            scan_time_ms: None,
            replay_started: None,
            discovery_query_ms: None,
        }
    }
}

/// Pre-select `widget` with the values the URL records for it, when they
/// differ from the interface state.
fn restore_url_selection(
    widget: &mut dyn FacetWidget,
    location: &str,
    interface: &dyn InterfaceState,
) {
    let id = widget.id().to_string();
    match facet_values_from_url(location, &id) {
        Ok(Some(values)) if !values.is_empty() => {
            let recorded = interface.read(&facet_state_key(&id));
            if recorded != Some(Value::from(values.clone())) {
                debug!(facet = %id, "restoring facet selection from url");
                widget.select_multiple_values(&values);
            }
        }
        Ok(_) => {}
        Err(err) => error!(facet = %id, "unable to parse facet state in the url: {err}"),
    }
}
