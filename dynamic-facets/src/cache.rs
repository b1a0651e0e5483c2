use crate::policy::SelectedFacetList;
use indexmap::IndexMap;
use tracing::debug;

/// Facet lists already discovered in this interface session, keyed by the
/// exact query string the discovery ran for.
///
/// Entries are never evicted and the first stored list for a key wins.
#[derive(Debug, Default)]
pub struct QueryFacetCache {
    entries: IndexMap<String, SelectedFacetList>,
}

impl QueryFacetCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lookup(&self, query_key: &str) -> Option<&SelectedFacetList> {
        self.entries.get(query_key)
    }

    /// Store `facets` for `query_key`. Returns `false` and keeps the existing
    /// list when the key is already cached.
    pub fn store(&mut self, query_key: &str, facets: SelectedFacetList) -> bool {
        if self.entries.contains_key(query_key) {
            debug!(query = query_key, "facet list already cached");
            return false;
        }
        self.entries.insert(query_key.to_string(), facets);
        true
    }

    pub fn contains(&self, query_key: &str) -> bool {
        self.entries.contains_key(query_key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &SelectedFacetList)> {
        self.entries
            .iter()
            .map(|(query, facets)| (query.as_str(), facets))
    }
}
