//! Approval gate pipeline
//!
//! Runs the gates in a fixed order and stops at the first one that fails:
//!
//! ```text
//! Constructability (per element) → Topology (lot network) → Semantic (lot relationships)
//! ```
//!
//! The first failure is returned as a [`GateFailure`]. Store failures while
//! gathering connection data are returned as errors, never as gate failures.

use ilm_model::{
    Connection, Element, ElementId, GateFailure, GateKind, LotId, StoreClient, StoreError,
};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::constructability::validate_element;
use crate::ontology::{Ontology, Relationship};
use crate::semantic::{RelationshipTriple, SemanticValidator};
use crate::topology::TopologyValidator;

/// Gate switches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    /// Run the semantic gate
    pub semantic: bool,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self { semantic: true }
    }
}

impl GateConfig {
    /// With semantic gate switched on or off
    #[inline]
    #[must_use]
    pub fn with_semantic(mut self, enabled: bool) -> Self {
        self.semantic = enabled;
        self
    }
}

/// Result of running the pipeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum GateOutcome {
    /// Every enabled gate passed
    Passed,
    /// A gate refused; later gates did not run
    Failed(GateFailure),
}

impl GateOutcome {
    /// Check if every gate passed
    #[inline]
    #[must_use]
    pub fn is_passed(&self) -> bool {
        matches!(self, Self::Passed)
    }

    /// Convert into a `Result`
    ///
    /// # Errors
    /// Returns the failure when a gate refused
    pub fn into_result(self) -> Result<(), GateFailure> {
        match self {
            Self::Passed => Ok(()),
            Self::Failed(failure) => Err(failure),
        }
    }
}

/// Ordered constructability, topology and semantic gates
#[derive(Debug, Clone)]
pub struct GatePipeline {
    topology: TopologyValidator,
    semantic: SemanticValidator,
    config: GateConfig,
}

impl GatePipeline {
    /// Create pipeline with every gate enabled
    #[must_use]
    pub fn new(store: StoreClient, ontology: Arc<dyn Ontology>) -> Self {
        Self {
            topology: TopologyValidator::new(store),
            semantic: SemanticValidator::new(ontology),
            config: GateConfig::default(),
        }
    }

    /// With gate switches
    #[inline]
    #[must_use]
    pub fn with_config(mut self, config: GateConfig) -> Self {
        self.config = config;
        self
    }

    /// Active gate switches
    #[inline]
    #[must_use]
    pub fn config(&self) -> GateConfig {
        self.config
    }

    /// Topology validator sharing this pipeline's store client
    #[inline]
    #[must_use]
    pub fn topology(&self) -> &TopologyValidator {
        &self.topology
    }

    /// Semantic validator sharing this pipeline's ontology
    #[inline]
    #[must_use]
    pub fn semantic(&self) -> &SemanticValidator {
        &self.semantic
    }

    /// Run the gates over a lot's members
    ///
    /// # Errors
    /// Returns error if fetching connection records fails
    pub async fn run(&self, lot_id: &LotId, members: &[Element]) -> Result<GateOutcome, StoreError> {
        if let Some(failure) = constructability_failure(members) {
            tracing::warn!(lot_id = %lot_id, errors = failure.errors.len(), "constructability gate refused lot");
            return Ok(GateOutcome::Failed(failure));
        }

        let (report, connections) = self.topology.inspect(members).await?;
        if !report.valid {
            tracing::warn!(
                lot_id = %lot_id,
                open_ends = report.open_ends.len(),
                isolated = report.isolated_elements.len(),
                "topology gate refused lot"
            );
            let failure = GateFailure::new(GateKind::Topology, report.errors.clone())
                .with_elements(report.offending_elements());
            return Ok(GateOutcome::Failed(failure));
        }

        if self.config.semantic {
            let triples = connection_triples(members, &connections);
            let semantic = self.semantic.validate_connections(&triples);
            if !semantic.valid {
                tracing::warn!(lot_id = %lot_id, errors = semantic.errors.len(), "semantic gate refused lot");
                let failure = GateFailure::new(GateKind::Semantic, semantic.errors)
                    .with_elements(semantic.element_ids)
                    .with_suggestions(semantic.suggestions);
                return Ok(GateOutcome::Failed(failure));
            }
        }

        tracing::debug!(lot_id = %lot_id, members = members.len(), "all gates passed");
        Ok(GateOutcome::Passed)
    }
}

fn constructability_failure(members: &[Element]) -> Option<GateFailure> {
    let mut errors = Vec::new();
    let mut suggestions = Vec::new();
    let mut offenders = Vec::new();

    for element in members {
        let result = validate_element(element);
        if result.valid {
            continue;
        }
        errors.extend(result.errors);
        suggestions.extend(result.suggestion);
        offenders.push(element.id.clone());
    }

    if errors.is_empty() {
        return None;
    }
    Some(
        GateFailure::new(GateKind::Constructability, errors)
            .with_elements(offenders)
            .with_suggestions(suggestions),
    )
}

/// `connects_to` triples for links between two lot members, one per pair
fn connection_triples(members: &[Element], connections: &[Connection]) -> Vec<RelationshipTriple> {
    let kinds: HashMap<&ElementId, _> = members.iter().map(|e| (&e.id, e.kind)).collect();
    let mut seen: HashSet<(&ElementId, &ElementId)> = HashSet::new();
    let mut triples = Vec::new();

    for c in connections {
        let Some(target) = c.target.as_ref() else {
            continue;
        };
        let (Some(&source_type), Some(&target_type)) = (kinds.get(&c.element_id), kinds.get(target))
        else {
            continue;
        };
        if seen.contains(&(target, &c.element_id)) || !seen.insert((&c.element_id, target)) {
            continue;
        }
        triples.push(RelationshipTriple::new(
            (c.element_id.clone(), source_type),
            Relationship::ConnectsTo,
            (target.clone(), target_type),
        ));
    }

    triples
}

#[cfg(test)]
mod tests {
    use super::*;
    use ilm_model::connection::link_pair;
    use ilm_model::ElementKind;

    #[test]
    fn reciprocal_records_yield_one_triple() {
        let members = vec![
            Element::new("p1", ElementKind::Pipe),
            Element::new("f1", ElementKind::Fitting),
        ];
        let connections = link_pair("p1", 0, "f1", 0);
        let triples = connection_triples(&members, &connections);
        assert_eq!(triples.len(), 1);
        assert_eq!(triples[0].source_id, ElementId::new("p1"));
    }

    #[test]
    fn links_leaving_the_lot_are_skipped() {
        let members = vec![Element::new("p1", ElementKind::Pipe)];
        let connections = link_pair("p1", 0, "outside", 0);
        assert!(connection_triples(&members, &connections).is_empty());
    }

    #[test]
    fn constructability_collects_all_members() {
        let members = vec![
            Element::new("w1", ElementKind::Wall),
            Element::new("c1", ElementKind::Column).with_height(3.0),
        ];
        let failure = constructability_failure(&members).unwrap();
        assert_eq!(failure.gate, GateKind::Constructability);
        assert_eq!(failure.errors.len(), 3);
        assert_eq!(failure.element_ids, vec![ElementId::new("w1"), ElementId::new("c1")]);
    }
}
