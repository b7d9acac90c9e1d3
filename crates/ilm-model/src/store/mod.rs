//! Graph-store collaborator contract
//!
//! The engine never persists anything itself. Every read and write goes
//! through a [`GraphStore`]; the engine wraps it in a [`StoreClient`] that
//! bounds each call with a timeout and logs failures with context.
//!
//! Two writes carry atomicity requirements the engine relies on:
//! - [`GraphStore::create_lot`] creates the lot and its membership edges in
//!   one unit, skipping members that were assigned concurrently.
//! - [`GraphStore::write_status`] is a compare-and-set on the lot status and
//!   appends the optional audit entry in the same unit.

mod client;
mod memory;

pub use client::StoreClient;
pub use memory::{MemoryGraphStore, Snapshot};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::connection::Connection;
use crate::element::Element;
use crate::ids::{ElementId, ItemId, LotId};
use crate::lot::{ApprovalHistoryEntry, InspectionLot, Item, LotStatus};

/// Element selection for [`GraphStore::elements`]
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "by", content = "id")]
pub enum ElementFilter {
    /// Members of one lot
    Lot(LotId),
    /// Members of any lot owned by an item
    Item(ItemId),
    /// Elements not placed in any lot
    Ungrouped,
}

/// Conditional status update
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusWrite {
    /// Target lot
    pub lot_id: LotId,
    /// Status the lot must currently have
    pub expected: LotStatus,
    /// Status to set
    pub new_status: LotStatus,
    /// New `updated_at`
    pub updated_at: DateTime<Utc>,
    /// Audit entry appended with the update
    pub audit: Option<ApprovalHistoryEntry>,
}

/// Result of a [`StatusWrite`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusWriteOutcome {
    /// Update applied; the lot as stored afterwards
    Applied(InspectionLot),
    /// Lot status did not match `expected`; nothing written
    Conflict {
        /// Status found in the store
        actual: LotStatus,
    },
    /// No such lot; nothing written
    Missing,
}

/// Failures of the graph-store collaborator
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// Call exceeded the caller-level timeout; treated as not applied
    #[error("store call `{operation}` timed out after {timeout_ms}ms")]
    Timeout {
        /// Store operation name
        operation: &'static str,
        /// Applied timeout
        timeout_ms: u64,
    },

    /// Store could not be reached
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// Store rejected or failed the query
    #[error("store query failed: {0}")]
    Query(String),

    /// Stored data could not be decoded
    #[error("store returned malformed data: {0}")]
    Malformed(String),
}

impl StoreError {
    /// Whether a retry by the caller may succeed
    #[inline]
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::Unavailable(_))
    }
}

/// Parameterised read/write access to the element graph
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Fetch an item
    async fn item(&self, id: &ItemId) -> Result<Option<Item>, StoreError>;

    /// Fetch a lot
    async fn lot(&self, id: &LotId) -> Result<Option<InspectionLot>, StoreError>;

    /// Lots owned by an item, oldest first
    async fn lots_for_item(&self, id: &ItemId) -> Result<Vec<InspectionLot>, StoreError>;

    /// Elements matching a filter, ordered by id
    async fn elements(&self, filter: &ElementFilter) -> Result<Vec<Element>, StoreError>;

    /// Connection records touching any of `ids` on either side
    ///
    /// Records whose target is in `ids` are included so reciprocity can be
    /// checked for every endpoint of the requested elements.
    async fn connections(&self, ids: &[ElementId]) -> Result<Vec<Connection>, StoreError>;

    /// Create a lot together with its membership edges
    ///
    /// Members that no longer exist or are already in a lot are skipped.
    /// When no member remains the lot is not created. Returns the members
    /// actually linked.
    async fn create_lot(
        &self,
        lot: InspectionLot,
        members: &[ElementId],
    ) -> Result<Vec<ElementId>, StoreError>;

    /// Compare-and-set the lot status, appending the audit entry if present
    async fn write_status(&self, write: StatusWrite) -> Result<StatusWriteOutcome, StoreError>;

    /// Audit entries of a lot, oldest first
    async fn history(&self, id: &LotId) -> Result<Vec<ApprovalHistoryEntry>, StoreError>;

    /// Link unassigned elements to a lot; returns the ids actually linked
    async fn assign_elements(
        &self,
        lot_id: &LotId,
        ids: &[ElementId],
    ) -> Result<Vec<ElementId>, StoreError>;

    /// Delete the membership edge; `false` when the element was not a member
    async fn remove_element(&self, lot_id: &LotId, id: &ElementId) -> Result<bool, StoreError>;
}
