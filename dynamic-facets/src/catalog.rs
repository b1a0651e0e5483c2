use crate::endpoint::SearchEndpoint;
use crate::error::Result;
use crate::store::KeyValueStore;
use chrono::DateTime;
use chrono::TimeDelta;
use chrono::Utc;
use facetgen_protocol::bare_field_name;
use indexmap::IndexSet;
use serde::Deserialize;
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;
use tracing::info;
use tracing::warn;

/// Store key under which the catalog is persisted.
pub const FIELD_CATALOG_KEY: &str = "DynamicQueryFacetGeneratorF";

#[derive(Debug, Serialize, Deserialize)]
struct PersistedCatalog {
    fields: Vec<String>,
    #[serde(rename = "expDate")]
    expires_at: DateTime<Utc>,
}

/// Facetable field names of the index, cached in a [`KeyValueStore`] for a
/// fixed window.
///
/// A stale list keeps being served until it expires; the catalog carries no
/// version to detect index schema changes.
pub struct FieldCatalog {
    store: Arc<dyn KeyValueStore>,
    key: String,
    ttl: TimeDelta,
    use_only_user_fields: bool,
    fields: Arc<IndexSet<String>>,
}

impl FieldCatalog {
    pub fn new(store: Arc<dyn KeyValueStore>, ttl: TimeDelta, use_only_user_fields: bool) -> Self {
        Self {
            store,
            key: FIELD_CATALOG_KEY.to_string(),
            ttl,
            use_only_user_fields,
            fields: Arc::new(IndexSet::new()),
        }
    }

    /// Use a different store key, for interfaces hosting several generators
    /// against different indexes.
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    /// Load the persisted fields if they have not expired.
    ///
    /// An expired, missing or unreadable entry leaves the catalog empty; the
    /// caller is expected to [`refresh`](Self::refresh) it.
    pub fn load(&mut self) -> Arc<IndexSet<String>> {
        self.load_at(Utc::now())
    }

    pub fn load_at(&mut self, now: DateTime<Utc>) -> Arc<IndexSet<String>> {
        let fields = match self.read_persisted() {
            Ok(Some(persisted)) if now <= persisted.expires_at => {
                debug!(count = persisted.fields.len(), "field catalog loaded from store");
                persisted.fields.into_iter().collect()
            }
            Ok(Some(persisted)) => {
                debug!(expired_at = %persisted.expires_at, "field catalog expired");
                IndexSet::new()
            }
            Ok(None) => IndexSet::new(),
            Err(err) => {
                warn!("failed to read persisted field catalog: {err}");
                IndexSet::new()
            }
        };
        self.fields = Arc::new(fields);
        self.snapshot()
    }

    /// Fetch the index field list, keep the groupable fields and persist
    /// them with a fresh expiry.
    pub async fn refresh(&mut self, endpoint: &dyn SearchEndpoint) -> Result<usize> {
        self.refresh_at(endpoint, Utc::now()).await
    }

    pub async fn refresh_at(
        &mut self,
        endpoint: &dyn SearchEndpoint,
        now: DateTime<Utc>,
    ) -> Result<usize> {
        let descriptions = endpoint.list_fields().await?;
        let fields: IndexSet<String> = descriptions
            .iter()
            .filter(|field| field.is_groupable())
            .filter(|field| !(self.use_only_user_fields && field.is_system()))
            .map(|field| bare_field_name(&field.name).to_string())
            .filter(|name| !name.is_empty())
            .collect();

        let persisted = PersistedCatalog {
            fields: fields.iter().cloned().collect(),
            expires_at: now + self.ttl,
        };
        self.store
            .save(&self.key, &serde_json::to_string(&persisted)?)?;

        info!(
            listed = descriptions.len(),
            kept = fields.len(),
            "field catalog refreshed"
        );
        let count = fields.len();
        self.fields = Arc::new(fields);
        Ok(count)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains(bare_field_name(field))
    }

    /// Shared view of the current field set.
    pub fn snapshot(&self) -> Arc<IndexSet<String>> {
        Arc::clone(&self.fields)
    }

    fn read_persisted(&self) -> Result<Option<PersistedCatalog>> {
        let Some(raw) = self.store.load(&self.key)? else {
            return Ok(None);
        };
        Ok(Some(serde_json::from_str(&raw)?))
    }
}
