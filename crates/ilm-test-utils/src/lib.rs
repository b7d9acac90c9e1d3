//! Testing utilities for the inspection-lot workspace
//!
//! Shared element builders, seeded stores and store wrappers that count or
//! fail calls.

#![allow(missing_docs)]

use async_trait::async_trait;
use chrono::Utc;
use ilm_model::connection::link_pair;
use ilm_model::{
    ApprovalHistoryEntry, Caller, Connection, Element, ElementFilter, ElementId, ElementKind,
    GraphStore, InspectionLot, Item, ItemId, LotId, LotStatus, MemoryGraphStore, Role,
    StatusWrite, StatusWriteOutcome, StoreClient, StoreError,
};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;

pub const TEST_ITEM: &str = "item-1";

pub fn test_item_id() -> ItemId {
    ItemId::new(TEST_ITEM)
}

pub fn caller(role: Role) -> Caller {
    Caller::new(format!("{role}-user"), role)
}

/// Wall with full 3-D placement
pub fn wall(id: &str) -> Element {
    Element::new(id, ElementKind::Wall)
        .with_height(3.0)
        .with_base_offset(0.0)
        .with_geometry([[0.0, 0.0], [5.0, 0.0]])
}

/// Straight pipe run
pub fn pipe(id: &str) -> Element {
    Element::new(id, ElementKind::Pipe).with_geometry([[0.0, 0.0], [10.0, 0.0]])
}

pub fn fitting(id: &str) -> Element {
    Element::new(id, ElementKind::Fitting)
}

pub fn ids(raw: &[&str]) -> Vec<ElementId> {
    raw.iter().map(|s| ElementId::new(*s)).collect()
}

/// Memory store holding [`TEST_ITEM`]
pub fn seeded_store() -> Arc<MemoryGraphStore> {
    let store = MemoryGraphStore::new();
    store.insert_item(Item::new(TEST_ITEM, "Block A"));
    Arc::new(store)
}

pub fn client(store: Arc<dyn GraphStore>) -> StoreClient {
    StoreClient::new(store)
}

/// Insert `members` and a lot owning them under [`TEST_ITEM`]
pub fn insert_lot(store: &MemoryGraphStore, status: LotStatus, members: Vec<Element>) -> LotId {
    let lot = InspectionLot::new("Test lot", test_item_id(), "test", Utc::now()).with_status(status);
    let lot_id = lot.id.clone();
    store.insert_lot(lot);
    for element in members {
        store.insert_element(element.in_lot(lot_id.clone()));
    }
    lot_id
}

/// Submitted lot `p1 - f1 - p2` whose network is closed and well typed
pub fn insert_network_lot(store: &MemoryGraphStore, status: LotStatus) -> LotId {
    let lot_id = insert_lot(store, status, vec![pipe("p1"), fitting("f1"), pipe("p2")]);
    store.insert_connections(link_pair("p1", 0, "f1", 0));
    store.insert_connections(link_pair("f1", 1, "p2", 0));
    lot_id
}

/// Store wrapper recording how often each operation was called
///
/// [`CountingStore::failing_at`] makes one call of one operation fail, for
/// exercising failures part way through a multi-write operation.
pub struct CountingStore {
    inner: Arc<dyn GraphStore>,
    calls: Mutex<BTreeMap<&'static str, usize>>,
    fail_at: Option<(&'static str, usize)>,
}

impl CountingStore {
    pub fn new(inner: Arc<dyn GraphStore>) -> Self {
        Self {
            inner,
            calls: Mutex::new(BTreeMap::new()),
            fail_at: None,
        }
    }

    /// Fail the `nth` call (1-based) of `operation` as unavailable
    #[must_use]
    pub fn failing_at(mut self, operation: &'static str, nth: usize) -> Self {
        self.fail_at = Some((operation, nth));
        self
    }

    pub fn calls(&self, operation: &str) -> usize {
        self.calls.lock().get(operation).copied().unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.calls.lock().values().sum()
    }

    fn record(&self, operation: &'static str) -> Result<(), StoreError> {
        let mut calls = self.calls.lock();
        let count = calls.entry(operation).or_insert(0);
        *count += 1;
        match self.fail_at {
            Some((failing, nth)) if failing == operation && nth == *count => Err(down()),
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl GraphStore for CountingStore {
    async fn item(&self, id: &ItemId) -> Result<Option<Item>, StoreError> {
        self.record("item")?;
        self.inner.item(id).await
    }

    async fn lot(&self, id: &LotId) -> Result<Option<InspectionLot>, StoreError> {
        self.record("lot")?;
        self.inner.lot(id).await
    }

    async fn lots_for_item(&self, id: &ItemId) -> Result<Vec<InspectionLot>, StoreError> {
        self.record("lots_for_item")?;
        self.inner.lots_for_item(id).await
    }

    async fn elements(&self, filter: &ElementFilter) -> Result<Vec<Element>, StoreError> {
        self.record("elements")?;
        self.inner.elements(filter).await
    }

    async fn connections(&self, ids: &[ElementId]) -> Result<Vec<Connection>, StoreError> {
        self.record("connections")?;
        self.inner.connections(ids).await
    }

    async fn create_lot(
        &self,
        lot: InspectionLot,
        members: &[ElementId],
    ) -> Result<Vec<ElementId>, StoreError> {
        self.record("create_lot")?;
        self.inner.create_lot(lot, members).await
    }

    async fn write_status(&self, write: StatusWrite) -> Result<StatusWriteOutcome, StoreError> {
        self.record("write_status")?;
        self.inner.write_status(write).await
    }

    async fn history(&self, id: &LotId) -> Result<Vec<ApprovalHistoryEntry>, StoreError> {
        self.record("history")?;
        self.inner.history(id).await
    }

    async fn assign_elements(
        &self,
        lot_id: &LotId,
        ids: &[ElementId],
    ) -> Result<Vec<ElementId>, StoreError> {
        self.record("assign_elements")?;
        self.inner.assign_elements(lot_id, ids).await
    }

    async fn remove_element(&self, lot_id: &LotId, id: &ElementId) -> Result<bool, StoreError> {
        self.record("remove_element")?;
        self.inner.remove_element(lot_id, id).await
    }
}

/// Store whose every call fails as unavailable
pub struct FailingStore;

fn down() -> StoreError {
    StoreError::Unavailable("test store is down".to_string())
}

#[async_trait]
impl GraphStore for FailingStore {
    async fn item(&self, _id: &ItemId) -> Result<Option<Item>, StoreError> {
        Err(down())
    }

    async fn lot(&self, _id: &LotId) -> Result<Option<InspectionLot>, StoreError> {
        Err(down())
    }

    async fn lots_for_item(&self, _id: &ItemId) -> Result<Vec<InspectionLot>, StoreError> {
        Err(down())
    }

    async fn elements(&self, _filter: &ElementFilter) -> Result<Vec<Element>, StoreError> {
        Err(down())
    }

    async fn connections(&self, _ids: &[ElementId]) -> Result<Vec<Connection>, StoreError> {
        Err(down())
    }

    async fn create_lot(
        &self,
        _lot: InspectionLot,
        _members: &[ElementId],
    ) -> Result<Vec<ElementId>, StoreError> {
        Err(down())
    }

    async fn write_status(&self, _write: StatusWrite) -> Result<StatusWriteOutcome, StoreError> {
        Err(down())
    }

    async fn history(&self, _id: &LotId) -> Result<Vec<ApprovalHistoryEntry>, StoreError> {
        Err(down())
    }

    async fn assign_elements(
        &self,
        _lot_id: &LotId,
        _ids: &[ElementId],
    ) -> Result<Vec<ElementId>, StoreError> {
        Err(down())
    }

    async fn remove_element(&self, _lot_id: &LotId, _id: &ElementId) -> Result<bool, StoreError> {
        Err(down())
    }
}
