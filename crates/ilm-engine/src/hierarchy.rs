//! Item hierarchy view

use ilm_model::{ElementId, InspectionLot, ItemId, LotId, LotStatus};
use serde::{Deserialize, Serialize};

/// One lot in an [`ItemHierarchy`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LotNode {
    /// Lot id
    pub lot_id: LotId,
    /// Lot name
    pub name: String,
    /// Current status
    pub status: LotStatus,
    /// Partition key, if the lot came from a commit
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_key: Option<String>,
    /// Member ids, ordered
    pub element_ids: Vec<ElementId>,
}

impl LotNode {
    /// Build node from a lot and its members
    #[must_use]
    pub fn new(lot: InspectionLot, element_ids: Vec<ElementId>) -> Self {
        Self {
            lot_id: lot.id,
            name: lot.name,
            status: lot.status,
            group_key: lot.group_key,
            element_ids,
        }
    }
}

/// Item → lots → elements tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemHierarchy {
    /// Item id
    pub item_id: ItemId,
    /// Item name
    pub name: String,
    /// Lots, oldest first
    pub lots: Vec<LotNode>,
}

impl ItemHierarchy {
    /// Elements across every lot
    #[must_use]
    pub fn element_count(&self) -> usize {
        self.lots.iter().map(|lot| lot.element_ids.len()).sum()
    }

    /// Lots currently in `status`
    pub fn lots_in(&self, status: LotStatus) -> impl Iterator<Item = &LotNode> {
        self.lots.iter().filter(move |lot| lot.status == status)
    }
}
