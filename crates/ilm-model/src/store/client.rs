//! Timeout-bounded store access

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use super::{ElementFilter, GraphStore, StatusWrite, StatusWriteOutcome, StoreError};
use crate::connection::Connection;
use crate::element::Element;
use crate::ids::{ElementId, ItemId, LotId};
use crate::lot::{ApprovalHistoryEntry, InspectionLot, Item};

/// Default caller-level timeout for one store call
pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(5);

/// Shared handle to a [`GraphStore`] with a per-call timeout
///
/// A timed-out call is reported as [`StoreError::Timeout`] and must be
/// treated as not applied. Every failure is logged here, with the operation
/// name and its arguments, before it is handed back to the caller.
#[derive(Clone)]
pub struct StoreClient {
    store: Arc<dyn GraphStore>,
    timeout: Duration,
}

impl std::fmt::Debug for StoreClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreClient")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl StoreClient {
    /// Wrap a store with the default timeout
    #[inline]
    #[must_use]
    pub fn new(store: Arc<dyn GraphStore>) -> Self {
        Self {
            store,
            timeout: DEFAULT_STORE_TIMEOUT,
        }
    }

    /// With per-call timeout
    #[inline]
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Active timeout
    #[inline]
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn bounded<T, Fut>(
        &self,
        operation: &'static str,
        context: &(dyn std::fmt::Debug + Sync),
        fut: Fut,
    ) -> Result<T, StoreError>
    where
        Fut: Future<Output = Result<T, StoreError>>,
    {
        let result = match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(StoreError::Timeout {
                operation,
                timeout_ms: u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX),
            }),
        };

        if let Err(error) = &result {
            tracing::error!(operation, ?context, %error, "graph store call failed");
        }
        result
    }

    /// Fetch an item
    pub async fn item(&self, id: &ItemId) -> Result<Option<Item>, StoreError> {
        self.bounded("item", id, self.store.item(id)).await
    }

    /// Fetch a lot
    pub async fn lot(&self, id: &LotId) -> Result<Option<InspectionLot>, StoreError> {
        self.bounded("lot", id, self.store.lot(id)).await
    }

    /// Lots owned by an item
    pub async fn lots_for_item(&self, id: &ItemId) -> Result<Vec<InspectionLot>, StoreError> {
        self.bounded("lots_for_item", id, self.store.lots_for_item(id))
            .await
    }

    /// Elements matching a filter
    pub async fn elements(&self, filter: &ElementFilter) -> Result<Vec<Element>, StoreError> {
        self.bounded("elements", filter, self.store.elements(filter))
            .await
    }

    /// Connection records touching `ids`
    pub async fn connections(&self, ids: &[ElementId]) -> Result<Vec<Connection>, StoreError> {
        self.bounded("connections", &ids.len(), self.store.connections(ids))
            .await
    }

    /// Create a lot with its members
    pub async fn create_lot(
        &self,
        lot: InspectionLot,
        members: &[ElementId],
    ) -> Result<Vec<ElementId>, StoreError> {
        let context = (lot.id.clone(), members.len());
        self.bounded("create_lot", &context, self.store.create_lot(lot, members))
            .await
    }

    /// Conditional status update
    pub async fn write_status(&self, write: StatusWrite) -> Result<StatusWriteOutcome, StoreError> {
        let context = (write.lot_id.clone(), write.expected, write.new_status);
        self.bounded("write_status", &context, self.store.write_status(write))
            .await
    }

    /// Audit entries of a lot
    pub async fn history(&self, id: &LotId) -> Result<Vec<ApprovalHistoryEntry>, StoreError> {
        self.bounded("history", id, self.store.history(id)).await
    }

    /// Link elements to a lot
    pub async fn assign_elements(
        &self,
        lot_id: &LotId,
        ids: &[ElementId],
    ) -> Result<Vec<ElementId>, StoreError> {
        let context = (lot_id, ids.len());
        self.bounded(
            "assign_elements",
            &context,
            self.store.assign_elements(lot_id, ids),
        )
        .await
    }

    /// Delete a membership edge
    pub async fn remove_element(&self, lot_id: &LotId, id: &ElementId) -> Result<bool, StoreError> {
        let context = (lot_id, id);
        self.bounded("remove_element", &context, self.store.remove_element(lot_id, id))
            .await
    }
}
