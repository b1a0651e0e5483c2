use serde_json::Value;
use std::collections::BTreeMap;

/// State attribute holding the basic query expression.
pub const QUERY_STATE_KEY: &str = "q";

/// State attribute of a facet's selected values.
pub fn facet_state_key(facet_id: &str) -> String {
    format!("f:{facet_id}")
}

/// Shared attribute store of the search interface.
pub trait InterfaceState: Send {
    /// Current basic query, `None` until the interface has initialized it.
    fn query(&self) -> Option<String>;

    fn read(&self, key: &str) -> Option<Value>;

    /// Reset `key` to an empty selection.
    fn blank(&mut self, key: &str);

    /// Opaque serialization of the whole state, compared between passes.
    fn signature(&self) -> String;

    /// Current page URL, when the interface runs in one.
    fn location(&self) -> Option<String> {
        None
    }
}

/// In-memory [`InterfaceState`].
#[derive(Debug, Clone, Default)]
pub struct MemoryInterfaceState {
    attributes: BTreeMap<String, Value>,
    location: Option<String>,
}

impl MemoryInterfaceState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_query(query: impl Into<String>) -> Self {
        let mut state = Self::new();
        state.set_query(query);
        state
    }

    pub fn set_query(&mut self, query: impl Into<String>) {
        self.set(QUERY_STATE_KEY, Value::String(query.into()));
    }

    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        self.attributes.insert(key.into(), value);
    }

    pub fn set_location(&mut self, location: impl Into<String>) {
        self.location = Some(location.into());
    }
}

impl InterfaceState for MemoryInterfaceState {
    fn query(&self) -> Option<String> {
        match self.attributes.get(QUERY_STATE_KEY)? {
            Value::String(query) => Some(query.clone()),
            Value::Null => None,
            other => Some(other.to_string()),
        }
    }

    fn read(&self, key: &str) -> Option<Value> {
        self.attributes.get(key).cloned()
    }

    fn blank(&mut self, key: &str) {
        if let Some(value) = self.attributes.get_mut(key) {
            *value = Value::Array(Vec::new());
        }
    }

    fn signature(&self) -> String {
        serde_json::to_string(&self.attributes).unwrap_or_default()
    }

    fn location(&self) -> Option<String> {
        self.location.clone()
    }
}
