use crate::widgets::FacetRegistry;
use facetgen_protocol::bare_field_name;
use facetgen_protocol::field_reference;
use indexmap::IndexMap;

/// Selected values of every registered facet, keyed by bare field name.
///
/// Fields of facets without a selection are kept with an empty list so the
/// snapshot mirrors the registry it was captured from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectedValuesSnapshot {
    values: IndexMap<String, Vec<String>>,
}

impl SelectedValuesSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn capture(registry: &FacetRegistry) -> Self {
        let mut snapshot = Self::new();
        for widget in registry.iter() {
            snapshot.insert(widget.field(), widget.selected_values());
        }
        snapshot
    }

    /// Record `values` for `field`. Two facets on the same field merge their
    /// selections.
    pub fn insert(&mut self, field: &str, values: Vec<String>) {
        let entry = self
            .values
            .entry(bare_field_name(field).to_string())
            .or_default();
        for value in values {
            if !entry.contains(&value) {
                entry.push(value);
            }
        }
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.values
            .get(bare_field_name(field))
            .map(Vec::as_slice)
            .filter(|values| !values.is_empty())
    }

    pub fn has_selection(&self, field: &str) -> bool {
        self.get(field).is_some()
    }

    /// `true` when no field has a selected value.
    pub fn is_empty(&self) -> bool {
        self.values.values().all(Vec::is_empty)
    }

    /// Fields with at least one selected value, in capture order.
    pub fn selections(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.values
            .iter()
            .filter(|(_, values)| !values.is_empty())
            .map(|(field, values)| (field.as_str(), values.as_slice()))
    }

    /// Filter expression restricting results to the selected values, one
    /// `@field==...` term per selected field, space separated.
    pub fn advanced_expression(&self) -> String {
        self.selections()
            .map(|(field, values)| field_filter(field, values))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

fn field_filter(field: &str, values: &[String]) -> String {
    let field = field_reference(field);
    match values {
        [single] => format!("{field}=={}", quote(single)),
        _ => {
            let quoted = values.iter().map(|value| quote(value)).collect::<Vec<_>>();
            format!("{field}==({})", quoted.join(","))
        }
    }
}

fn quote(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\\\""))
}
