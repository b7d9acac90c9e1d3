//! Lifecycle operation payloads

use ilm_model::{ElementId, LotId, LotStatus};
use serde::{Deserialize, Serialize};

/// Outcome for one lot of a batch approval
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchItemResult {
    /// Lot the entry refers to
    pub lot_id: LotId,
    /// Whether the lot was approved
    pub success: bool,
    /// Status after the call, when the lot was found
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<LotStatus>,
    /// Human-readable outcome
    pub message: String,
}

/// Per-lot results of a batch approval, in request order
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BatchApproveReport {
    /// One entry per requested lot id
    pub results: Vec<BatchItemResult>,
}

impl BatchApproveReport {
    /// Number of approved lots
    #[must_use]
    pub fn approved(&self) -> usize {
        self.results.iter().filter(|r| r.success).count()
    }

    /// Number of refused lots
    #[must_use]
    pub fn failed(&self) -> usize {
        self.results.len() - self.approved()
    }
}

/// Result of a membership edit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MembershipChange {
    /// Edited lot
    pub lot_id: LotId,
    /// Elements actually linked or unlinked
    pub element_ids: Vec<ElementId>,
    /// Requested elements that were left unchanged
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skipped: Vec<ElementId>,
}
