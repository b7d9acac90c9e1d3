//! Preview and commit payloads

use ilm_model::LotId;
use serde::{Deserialize, Serialize};

use crate::rule::PartitionRule;

/// One prospective lot in a preview
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviewGroup {
    /// Group key
    pub key: String,
    /// Elements in the group
    pub count: usize,
    /// Lot name a commit would use
    pub label: String,
}

/// Outcome of a partition dry run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionPreview {
    /// Rule the preview was computed for
    pub rule: PartitionRule,
    /// Lots a commit would create right now
    pub estimated_lot_count: usize,
    /// Groups ordered by key
    pub groups: Vec<PreviewGroup>,
}

impl PartitionPreview {
    /// Elements covered by the preview
    #[must_use]
    pub fn element_count(&self) -> usize {
        self.groups.iter().map(|g| g.count).sum()
    }
}

/// Lot created by a commit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedLot {
    /// New lot id
    pub lot_id: LotId,
    /// Lot name
    pub name: String,
    /// Group key the lot was created from
    pub key: String,
    /// Members actually linked
    pub element_count: usize,
}

/// Outcome of a partition commit
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitReport {
    /// Lots created by this call, ordered by key
    pub lots_created: Vec<CreatedLot>,
    /// Elements linked by this call
    pub elements_assigned: usize,
    /// Lots under the item after the commit
    pub total_lots: usize,
}

impl CommitReport {
    /// Whether the commit changed nothing
    #[inline]
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.lots_created.is_empty()
    }
}
