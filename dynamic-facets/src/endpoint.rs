use crate::error::Result;
use async_trait::async_trait;
use facetgen_protocol::ExecuteQueryOptions;
use facetgen_protocol::FieldDescription;
use facetgen_protocol::FieldValue;
use facetgen_protocol::ListFieldValuesRequest;
use facetgen_protocol::QueryResults;
use facetgen_protocol::SearchRequest;

/// Calls the generator makes against the search backend.
#[async_trait]
pub trait SearchEndpoint: Send + Sync {
    /// Execute a query and return its result set.
    async fn search(&self, request: SearchRequest) -> Result<QueryResults>;

    /// List every field known to the index, with its group-by capabilities.
    async fn list_fields(&self) -> Result<Vec<FieldDescription>>;

    /// List the values of one field, as computed by the index.
    async fn list_field_values(&self, request: ListFieldValuesRequest) -> Result<Vec<FieldValue>>;
}

/// Handle on the host query pipeline.
///
/// `execute_query` only schedules a new pass of the pipeline. The
/// building-query signal for that pass must reach the generator after the
/// current call returns, never from inside it.
pub trait QueryExecutor: Send + Sync {
    fn execute_query(&self, options: ExecuteQueryOptions);
}
