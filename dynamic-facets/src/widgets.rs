use facetgen_protocol::bare_field_name;
use facetgen_protocol::field_reference;
use indexmap::IndexMap;
use std::collections::HashMap;

/// Capabilities the generator needs from a rendered facet, whatever its
/// variant. Hierarchical facets report their selected path as values.
pub trait FacetWidget: Send {
    fn id(&self) -> &str;

    /// Field reference the facet is bound to (`@brand`).
    fn field(&self) -> &str;

    fn selected_values(&self) -> Vec<String>;

    fn select_multiple_values(&mut self, values: &[String]);

    /// Stop the facet from contributing to queries.
    fn disable(&mut self);
}

/// What to build for one generated facet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FacetWidgetSpec {
    /// Field reference (`@brand`).
    pub field: String,
    pub title: String,
    /// Facet id, the bare field name.
    pub id: String,
}

impl FacetWidgetSpec {
    pub fn for_field(field: &str, title: String) -> Self {
        Self {
            field: field_reference(field),
            title,
            id: bare_field_name(field).to_string(),
        }
    }
}

pub trait FacetWidgetFactory: Send + Sync {
    fn create(&self, spec: &FacetWidgetSpec) -> Box<dyn FacetWidget>;
}

/// Every facet mounted in the interface, keyed by facet id, in mount order.
#[derive(Default)]
pub struct FacetRegistry {
    widgets: IndexMap<String, Box<dyn FacetWidget>>,
}

impl FacetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `widget` under its id, returning any facet it replaced.
    pub fn register(&mut self, widget: Box<dyn FacetWidget>) -> Option<Box<dyn FacetWidget>> {
        let id = widget.id().to_string();
        self.widgets.insert(id, widget)
    }

    pub fn remove(&mut self, id: &str) -> Option<Box<dyn FacetWidget>> {
        self.widgets.shift_remove(id)
    }

    pub fn get(&self, id: &str) -> Option<&dyn FacetWidget> {
        self.widgets.get(id).map(|widget| widget.as_ref())
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut (dyn FacetWidget + 'static)> {
        self.widgets.get_mut(id).map(|widget| widget.as_mut())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.widgets.contains_key(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn FacetWidget> {
        self.widgets.values().map(|widget| widget.as_ref())
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.widgets.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.widgets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.widgets.is_empty()
    }
}

impl std::fmt::Debug for FacetRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FacetRegistry")
            .field("ids", &self.widgets.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Display title of a generated facet: the dictionary entry for the bare
/// field name, otherwise the field name without `prefix` and with `_`, `-`
/// and `.` turned into spaces.
pub fn facet_title(
    field: &str,
    dictionary: &HashMap<String, String>,
    prefix: Option<&str>,
) -> String {
    let bare = bare_field_name(field);
    if let Some(title) = dictionary.get(bare) {
        return title.clone();
    }
    let stripped = prefix
        .filter(|prefix| !prefix.is_empty())
        .and_then(|prefix| bare.strip_prefix(prefix))
        .filter(|rest| !rest.is_empty())
        .unwrap_or(bare);
    let title = stripped
        .chars()
        .map(|c| if matches!(c, '_' | '-' | '.') { ' ' } else { c })
        .collect::<String>();
    let title = title.split_whitespace().collect::<Vec<_>>().join(" ");
    if title.is_empty() {
        bare.to_string()
    } else {
        title
    }
}
