//! Wire types shared between the dynamic facet generator and the search
//! host it plugs into: query descriptors, result sets, index field metadata
//! and field-value listings.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

mod fields;
mod search;

pub use fields::FieldDescription;
pub use fields::FieldSourceType;
pub use fields::FieldValue;
pub use fields::FieldValueSort;
pub use fields::ListFieldValuesRequest;
pub use search::ExecuteQueryOptions;
pub use search::QueryResult;
pub use search::QueryResults;
pub use search::SearchRequest;

/// Prefix the index uses to mark a field reference (`@brand`).
pub const FIELD_PREFIX: char = '@';

/// Returns the bare field name, without the leading `@`.
pub fn bare_field_name(field: &str) -> &str {
    let trimmed = field.trim();
    trimmed.strip_prefix(FIELD_PREFIX).unwrap_or(trimmed)
}

/// Returns the field reference form (`@name`) of a bare or prefixed name.
pub fn field_reference(field: &str) -> String {
    format!("{FIELD_PREFIX}{}", bare_field_name(field))
}
