//! Semantic gate
//!
//! Checks typed relationships between elements against an [`Ontology`].

use ilm_model::{ElementId, ElementKind};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::ontology::{Ontology, OntologyVerdict, Relationship};

/// One relationship instance to check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationshipTriple {
    /// Source element
    pub source_id: ElementId,
    /// Source kind
    pub source_type: ElementKind,
    /// Target element
    pub target_id: ElementId,
    /// Target kind
    pub target_type: ElementKind,
    /// Relationship from source to target
    pub relationship: Relationship,
}

impl RelationshipTriple {
    /// Create triple
    #[must_use]
    pub fn new(
        source: (impl Into<ElementId>, ElementKind),
        relationship: Relationship,
        target: (impl Into<ElementId>, ElementKind),
    ) -> Self {
        Self {
            source_id: source.0.into(),
            source_type: source.1,
            target_id: target.0.into(),
            target_type: target.1,
            relationship,
        }
    }
}

/// Outcome of a batch relationship check
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SemanticReport {
    /// Conjunction of every triple's validity
    pub valid: bool,
    /// One message per refused triple
    pub errors: Vec<String>,
    /// Alternatives proposed by the ontology
    pub suggestions: Vec<String>,
    /// Source elements of refused triples
    pub element_ids: Vec<ElementId>,
}

/// Ontology-backed relationship checks
#[derive(Clone)]
pub struct SemanticValidator {
    ontology: Arc<dyn Ontology>,
}

impl std::fmt::Debug for SemanticValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SemanticValidator").finish_non_exhaustive()
    }
}

impl SemanticValidator {
    /// Create validator over an ontology
    #[inline]
    #[must_use]
    pub fn new(ontology: Arc<dyn Ontology>) -> Self {
        Self { ontology }
    }

    /// Check one relationship between two kinds
    #[must_use]
    pub fn validate_connection(
        &self,
        source_type: ElementKind,
        target_type: ElementKind,
        relationship: Relationship,
    ) -> OntologyVerdict {
        self.ontology.lookup(source_type, target_type, relationship)
    }

    /// Check every triple; never stops at the first refusal
    #[must_use]
    pub fn validate_connections(&self, triples: &[RelationshipTriple]) -> SemanticReport {
        let mut report = SemanticReport {
            valid: true,
            ..SemanticReport::default()
        };

        for triple in triples {
            let verdict =
                self.validate_connection(triple.source_type, triple.target_type, triple.relationship);
            if verdict.valid {
                continue;
            }

            report.valid = false;
            let mut message = format!(
                "{} ({}) cannot {} {} ({})",
                triple.source_type,
                triple.source_id,
                triple.relationship,
                triple.target_type,
                triple.target_id
            );
            if let Some(error) = verdict.error {
                message.push_str(": ");
                message.push_str(&error);
            }
            report.errors.push(message);
            if let Some(suggestion) = verdict.suggestion {
                report.suggestions.push(suggestion);
            }
            if !report.element_ids.contains(&triple.source_id) {
                report.element_ids.push(triple.source_id.clone());
            }
        }

        report
    }
}
