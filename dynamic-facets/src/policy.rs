use crate::config::GeneratorConfig;
use crate::scorer::FieldObservation;
use crate::selection::SelectedValuesSnapshot;
use serde::Deserialize;
use serde::Serialize;

/// Ordered field names chosen for one query, at most `no_of_facets` long.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SelectedFacetList(Vec<String>);

impl SelectedFacetList {
    pub fn new(fields: Vec<String>) -> Self {
        Self(fields)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, String> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

}

impl FromIterator<String> for SelectedFacetList {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a SelectedFacetList {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Ranking and filtering rule applied to scanned observations.
///
/// A field qualifies when its occurrence count reaches the threshold and it
/// offers more than one distinct value. A single-valued field still
/// qualifies when the user already filtered on it, so the active value stays
/// deselectable.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FacetSelectionPolicy {
    pub max_facets: usize,
    pub threshold_percentage: f64,
    /// Number of records a discovery query fetches.
    pub result_window: usize,
}

impl FacetSelectionPolicy {
    pub fn from_config(config: &GeneratorConfig) -> Self {
        Self {
            max_facets: config.no_of_facets,
            threshold_percentage: config.threshold_percentage,
            result_window: config.no_of_results,
        }
    }

    /// Occurrences a field needs, for a result set of `total_count` matches.
    pub fn min_occurrences(&self, total_count: u64) -> f64 {
        let scanned = total_count.min(self.result_window as u64);
        scanned as f64 * (self.threshold_percentage / 100.0)
    }

    /// Keep the qualifying fields among the top `max_facets` observations.
    /// `ranked` must already be sorted by descending occurrences.
    pub fn select(
        &self,
        ranked: Vec<FieldObservation>,
        total_count: u64,
        selected: &SelectedValuesSnapshot,
    ) -> SelectedFacetList {
        let min_occurrences = self.min_occurrences(total_count);
        ranked
            .into_iter()
            .take(self.max_facets)
            .filter(|observation| {
                let discriminative =
                    observation.distinct_values() > 1 || selected.has_selection(&observation.field);
                observation.occurrences as f64 >= min_occurrences && discriminative
            })
            .map(|observation| observation.field)
            .collect()
    }

    /// Take the top `max_facets` observations without any filtering.
    pub fn top(&self, ranked: Vec<FieldObservation>) -> SelectedFacetList {
        ranked
            .into_iter()
            .take(self.max_facets)
            .map(|observation| observation.field)
            .collect()
    }
}
