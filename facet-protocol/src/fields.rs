use serde::Deserialize;
use serde::Serialize;

/// Where the index says a field comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldSourceType {
    System,
    User,
    #[serde(other)]
    Unknown,
}

/// One entry of the index field metadata listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDescription {
    /// Field reference, usually with the `@` prefix.
    pub name: String,

    #[serde(default)]
    pub group_by_field: bool,

    #[serde(default)]
    pub split_group_by_field: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_source_type: Option<FieldSourceType>,
}

impl FieldDescription {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            group_by_field: false,
            split_group_by_field: false,
            field_source_type: None,
        }
    }

    pub fn groupable(mut self) -> Self {
        self.group_by_field = true;
        self
    }

    pub fn with_source(mut self, source: FieldSourceType) -> Self {
        self.field_source_type = Some(source);
        self
    }

    /// Whether the index can compute group-by values on this field.
    pub fn is_groupable(&self) -> bool {
        self.group_by_field || self.split_group_by_field
    }

    pub fn is_system(&self) -> bool {
        self.field_source_type == Some(FieldSourceType::System)
    }
}

/// Ordering of a field-value listing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldValueSort {
    #[default]
    Occurrences,
    Alphaascending,
    Alphadescending,
}

/// Request for the most frequent values of one field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListFieldValuesRequest {
    pub field: String,

    #[serde(default)]
    pub sort_criteria: FieldValueSort,

    pub maximum_number_of_values: usize,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query_override: Option<String>,
}

/// A value and the number of records carrying it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldValue {
    pub value: String,

    #[serde(rename = "numberOfResults", alias = "count", default)]
    pub count: u64,
}

impl FieldValue {
    pub fn new(value: impl Into<String>, count: u64) -> Self {
        Self {
            value: value.into(),
            count,
        }
    }
}
