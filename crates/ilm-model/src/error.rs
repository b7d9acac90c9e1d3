//! Error taxonomy for lot operations
//!
//! Domain outcomes (not found, illegal transition, forbidden, failed gate)
//! are ordinary `Err` values that callers branch on. Store failures are the
//! only unexpected category; they are logged where they happen and carried
//! here opaquely.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::auth::Role;
use crate::ids::{ElementId, LotId};
use crate::lot::LotStatus;
use crate::store::StoreError;

/// Kind of entity a lookup failed for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// Item
    Item,
    /// Inspection lot
    Lot,
    /// Element
    Element,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::Item => f.write_str("item"),
            EntityKind::Lot => f.write_str("lot"),
            EntityKind::Element => f.write_str("element"),
        }
    }
}

/// Validation gate identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateKind {
    /// Angles and 3-D placement completeness
    Constructability,
    /// Open ends and isolated elements
    Topology,
    /// Ontology-checked relationships
    Semantic,
}

impl fmt::Display for GateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GateKind::Constructability => f.write_str("constructability"),
            GateKind::Topology => f.write_str("topology"),
            GateKind::Semantic => f.write_str("semantic"),
        }
    }
}

/// Diagnostic from the first gate that refused an approval
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateFailure {
    /// Failing gate
    pub gate: GateKind,
    /// Ordered error messages
    pub errors: Vec<String>,
    /// Elements the errors refer to
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub element_ids: Vec<ElementId>,
    /// Corrections proposed by the gate
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub suggestions: Vec<String>,
}

impl GateFailure {
    /// Create failure for a gate
    #[inline]
    #[must_use]
    pub fn new(gate: GateKind, errors: Vec<String>) -> Self {
        Self {
            gate,
            errors,
            element_ids: Vec::new(),
            suggestions: Vec::new(),
        }
    }

    /// With offending elements
    #[inline]
    #[must_use]
    pub fn with_elements(mut self, ids: Vec<ElementId>) -> Self {
        self.element_ids = ids;
        self
    }

    /// With suggestions
    #[inline]
    #[must_use]
    pub fn with_suggestions(mut self, suggestions: Vec<String>) -> Self {
        self.suggestions = suggestions;
        self
    }
}

impl fmt::Display for GateFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} gate: {}", self.gate, self.errors.join("; "))
    }
}

/// Main error type for lot operations
#[derive(Debug, thiserror::Error)]
pub enum LotError {
    /// Referenced entity does not exist
    #[error("{kind} not found: {id}")]
    NotFound {
        /// Entity kind
        kind: EntityKind,
        /// Missing id
        id: String,
    },

    /// Requested status change violates the state table
    #[error("invalid status transition: {from} -> {to}")]
    InvalidTransition {
        /// Current status
        from: LotStatus,
        /// Requested status
        to: LotStatus,
    },

    /// Lot membership cannot change in the lot's current status
    #[error("lot {lot_id} is {status}; membership is frozen")]
    LotLocked {
        /// Lot id
        lot_id: LotId,
        /// Current status
        status: LotStatus,
    },

    /// Caller's role may not perform the action
    #[error("forbidden: role {role} may not {action} (permitted: {})", join_roles(.permitted))]
    Forbidden {
        /// Attempted action
        action: String,
        /// Caller's role
        role: Role,
        /// Roles that would be permitted
        permitted: Vec<Role>,
    },

    /// A validation gate refused an approval
    #[error("validation failed: {0}")]
    ValidationFailed(GateFailure),

    /// Graph-store collaborator failed or timed out
    #[error("store failure: {0}")]
    Store(#[from] StoreError),
}

impl LotError {
    /// Create not-found error
    #[inline]
    pub fn not_found(kind: EntityKind, id: impl fmt::Display) -> Self {
        Self::NotFound {
            kind,
            id: id.to_string(),
        }
    }

    /// Expected outcome rather than a system failure
    #[inline]
    #[must_use]
    pub fn is_domain(&self) -> bool {
        !matches!(self, Self::Store(_))
    }

    /// Whether a caller may reasonably retry unchanged
    ///
    /// Only store failures qualify; the engine itself never retries.
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Store(e) if e.is_transient())
    }

    /// Stable machine-readable kind
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "not_found",
            Self::InvalidTransition { .. } => "invalid_transition",
            Self::LotLocked { .. } => "lot_locked",
            Self::Forbidden { .. } => "forbidden",
            Self::ValidationFailed(_) => "validation_failed",
            Self::Store(_) => "store_failure",
        }
    }
}

fn join_roles(roles: &[Role]) -> String {
    roles
        .iter()
        .map(Role::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Result type alias for lot operations
pub type LotResult<T> = Result<T, LotError>;
