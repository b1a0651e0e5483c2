use crate::config::GeneratorConfig;
use crate::config::MissingParentPolicy;
use crate::widgets::FacetRegistry;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    Allow,
    Deny,
}

/// Holds generation back until a configured parent facet has a selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParentDependencyGate {
    parent: Option<String>,
    missing: MissingParentPolicy,
}

impl ParentDependencyGate {
    pub fn new(parent: Option<String>, missing: MissingParentPolicy) -> Self {
        Self { parent, missing }
    }

    pub fn from_config(config: &GeneratorConfig) -> Self {
        Self::new(
            config.parent_facet_id().map(str::to_string),
            config.missing_parent,
        )
    }

    pub fn parent(&self) -> Option<&str> {
        self.parent.as_deref()
    }

    pub fn evaluate(&self, registry: &FacetRegistry) -> GateDecision {
        let Some(parent) = self.parent.as_deref() else {
            return GateDecision::Allow;
        };
        match registry.get(parent) {
            Some(facet) if facet.selected_values().is_empty() => GateDecision::Deny,
            Some(_) => GateDecision::Allow,
            None => {
                warn!(depends_on = parent, "DependsOn reference does not exist");
                match self.missing {
                    MissingParentPolicy::Allow => GateDecision::Allow,
                    MissingParentPolicy::Block => GateDecision::Deny,
                }
            }
        }
    }
}
