//! Occurrence tallies over one batch of records.

use facetgen_protocol::QueryResult;
use facetgen_protocol::bare_field_name;
use indexmap::IndexMap;
use indexmap::IndexSet;
use serde_json::Value;
use std::collections::HashSet;

/// Accumulated occurrences of one candidate field during a discovery pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldObservation {
    pub field: String,
    /// Number of increments, one per record (or group value) carrying the field.
    pub occurrences: usize,
    /// Every raw value seen, duplicates included.
    pub values: Vec<String>,
}

impl FieldObservation {
    fn new(field: &str) -> Self {
        Self {
            field: field.to_string(),
            occurrences: 0,
            values: Vec::new(),
        }
    }

    pub fn distinct_values(&self) -> usize {
        self.values.iter().collect::<HashSet<_>>().len()
    }
}

/// Field name → observation map for a single discovery pass.
///
/// Observations keep the order in which fields were first encountered, which
/// is also the tie-break order of [`FieldTally::ranked`].
#[derive(Debug, Default)]
pub struct FieldTally {
    observations: IndexMap<String, FieldObservation>,
    blacklist: HashSet<String>,
}

impl FieldTally {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_blacklist<I, S>(blacklist: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            observations: IndexMap::new(),
            blacklist: blacklist
                .into_iter()
                .map(|field| bare_field_name(field.as_ref()).to_string())
                .collect(),
        }
    }

    /// Count one occurrence of `field`, recording `value` (each element
    /// when it is an array).
    pub fn observe(&mut self, field: &str, value: &Value) {
        let field = bare_field_name(field);
        if self.blacklist.contains(field) {
            return;
        }
        let observation = self
            .observations
            .entry(field.to_string())
            .or_insert_with(|| FieldObservation::new(field));
        observation.occurrences += 1;
        match value {
            Value::Array(items) => observation.values.extend(items.iter().map(value_text)),
            other => observation.values.push(value_text(other)),
        }
    }

    /// Tally every raw field of every record that the catalog lists.
    pub fn scan_records(&mut self, records: &[QueryResult], catalog: &IndexSet<String>) {
        for record in records {
            for (key, value) in &record.raw {
                if catalog.contains(bare_field_name(key)) {
                    self.observe(key, value);
                }
            }
        }
    }

    /// Tally the values of one array-valued group field: each value is a
    /// candidate, observed with the record's whole group array.
    pub fn scan_group_field(&mut self, records: &[QueryResult], group_field: &str) {
        let group_field = bare_field_name(group_field);
        for record in records {
            let Some(group) = record.raw.get(group_field) else {
                continue;
            };
            let candidates = match group {
                Value::Array(items) => items.iter().map(value_text).collect::<Vec<_>>(),
                Value::Null => continue,
                other => vec![value_text(other)],
            };
            for candidate in &candidates {
                self.observe(candidate, group);
            }
        }
    }

    pub fn get(&self, field: &str) -> Option<&FieldObservation> {
        self.observations.get(bare_field_name(field))
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    /// Observations by descending occurrence count. Equal counts keep their
    /// encounter order.
    pub fn ranked(self) -> Vec<FieldObservation> {
        let mut ranked: Vec<FieldObservation> = self.observations.into_values().collect();
        ranked.sort_by(|a, b| b.occurrences.cmp(&a.occurrences));
        ranked
    }
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
