use thiserror::Error;

#[derive(Error, Debug)]
pub enum FacetGeneratorError {
    #[error("Endpoint error: {0}")]
    Endpoint(String),

    #[error("Discovery for query '{query}' timed out after {timeout_ms}ms")]
    DiscoveryTimeout { query: String, timeout_ms: u64 },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed URL state: {0}")]
    UrlState(String),
}

impl From<toml::de::Error> for FacetGeneratorError {
    fn from(err: toml::de::Error) -> Self {
        FacetGeneratorError::InvalidConfig(err.to_string())
    }
}

impl From<url::ParseError> for FacetGeneratorError {
    fn from(err: url::ParseError) -> Self {
        FacetGeneratorError::UrlState(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, FacetGeneratorError>;
