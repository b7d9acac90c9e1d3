//! In-process reference graph store
//!
//! Holds items, lots, elements, connections and audit entries behind one
//! `RwLock`. Each trait call takes the lock once, which gives the atomicity
//! the [`GraphStore`] contract asks for. Data lives as long as the process;
//! [`Snapshot`] moves it in and out as JSON.

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use super::{ElementFilter, GraphStore, StatusWrite, StatusWriteOutcome, StoreError};
use crate::connection::Connection;
use crate::element::Element;
use crate::ids::{ElementId, ItemId, LotId};
use crate::lot::{ApprovalHistoryEntry, InspectionLot, Item};

/// Serializable dump of a [`MemoryGraphStore`]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Snapshot {
    /// Items
    pub items: Vec<Item>,
    /// Lots
    pub lots: Vec<InspectionLot>,
    /// Elements (membership via `inspection_lot_id`)
    pub elements: Vec<Element>,
    /// Connection records
    pub connections: Vec<Connection>,
    /// Audit trail
    pub history: Vec<ApprovalHistoryEntry>,
}

impl Snapshot {
    /// Parse snapshot JSON; element entries go through [`Element::decode`]
    ///
    /// # Errors
    /// Returns error if the JSON or any element payload is invalid
    pub fn from_json(json: &str) -> Result<Self, StoreError> {
        #[derive(Default, Deserialize)]
        #[serde(default)]
        struct Raw {
            items: Vec<Item>,
            lots: Vec<InspectionLot>,
            elements: Vec<serde_json::Value>,
            connections: Vec<Connection>,
            history: Vec<ApprovalHistoryEntry>,
        }

        let raw: Raw =
            serde_json::from_str(json).map_err(|e| StoreError::Malformed(e.to_string()))?;
        let elements = raw
            .elements
            .into_iter()
            .map(Element::decode)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| StoreError::Malformed(e.to_string()))?;

        Ok(Self {
            items: raw.items,
            lots: raw.lots,
            elements,
            connections: raw.connections,
            history: raw.history,
        })
    }

    /// Render as pretty JSON
    ///
    /// # Errors
    /// Returns error if serialization fails
    pub fn to_json(&self) -> Result<String, StoreError> {
        serde_json::to_string_pretty(self).map_err(|e| StoreError::Malformed(e.to_string()))
    }

    /// Read snapshot from a file
    ///
    /// # Errors
    /// Returns error if the file cannot be read or parsed
    pub fn load(path: &Path) -> Result<Self, StoreError> {
        let json = std::fs::read_to_string(path)
            .map_err(|e| StoreError::Unavailable(format!("{}: {e}", path.display())))?;
        Self::from_json(&json)
    }

    /// Write snapshot to a file
    ///
    /// # Errors
    /// Returns error if the file cannot be written
    pub fn save(&self, path: &Path) -> Result<(), StoreError> {
        std::fs::write(path, self.to_json()?)
            .map_err(|e| StoreError::Unavailable(format!("{}: {e}", path.display())))
    }
}

#[derive(Debug, Default)]
struct State {
    items: BTreeMap<ItemId, Item>,
    lots: BTreeMap<LotId, InspectionLot>,
    elements: BTreeMap<ElementId, Element>,
    connections: Vec<Connection>,
    history: Vec<ApprovalHistoryEntry>,
}

impl State {
    fn is_free(&self, id: &ElementId) -> bool {
        self.elements.get(id).is_some_and(Element::is_unassigned)
    }

    fn link(&mut self, lot_id: &LotId, ids: &[ElementId]) -> Vec<ElementId> {
        let mut seen = HashSet::new();
        let mut linked = Vec::new();
        for id in ids {
            if !seen.insert(id) || !self.is_free(id) {
                continue;
            }
            if let Some(element) = self.elements.get_mut(id) {
                element.inspection_lot_id = Some(lot_id.clone());
                linked.push(id.clone());
            }
        }
        linked
    }
}

/// Reference [`GraphStore`] kept in memory
#[derive(Debug)]
pub struct MemoryGraphStore {
    state: RwLock<State>,
}

impl MemoryGraphStore {
    /// Create store holding only the Unassigned Item
    #[must_use]
    pub fn new() -> Self {
        let mut state = State::default();
        let unassigned = Item::unassigned();
        state.items.insert(unassigned.id.clone(), unassigned);
        Self {
            state: RwLock::new(state),
        }
    }

    /// Create store from a snapshot (the Unassigned Item is always present)
    #[must_use]
    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        let store = Self::new();
        {
            let mut state = store.state.write();
            for item in snapshot.items {
                state.items.insert(item.id.clone(), item);
            }
            for lot in snapshot.lots {
                state.lots.insert(lot.id.clone(), lot);
            }
            for element in snapshot.elements {
                state.elements.insert(element.id.clone(), element);
            }
            state.connections = snapshot.connections;
            state.history = snapshot.history;
        }
        store
    }

    /// Dump current contents
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        let state = self.state.read();
        Snapshot {
            items: state.items.values().cloned().collect(),
            lots: state.lots.values().cloned().collect(),
            elements: state.elements.values().cloned().collect(),
            connections: state.connections.clone(),
            history: state.history.clone(),
        }
    }

    /// Insert or replace an item
    pub fn insert_item(&self, item: Item) {
        self.state.write().items.insert(item.id.clone(), item);
    }

    /// Insert or replace a lot
    pub fn insert_lot(&self, lot: InspectionLot) {
        self.state.write().lots.insert(lot.id.clone(), lot);
    }

    /// Insert or replace an element
    pub fn insert_element(&self, element: Element) {
        self.state.write().elements.insert(element.id.clone(), element);
    }

    /// Append connection records
    pub fn insert_connections(&self, connections: impl IntoIterator<Item = Connection>) {
        self.state.write().connections.extend(connections);
    }

    /// Current copy of one element
    #[must_use]
    pub fn element(&self, id: &ElementId) -> Option<Element> {
        self.state.read().elements.get(id).cloned()
    }
}

impl Default for MemoryGraphStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GraphStore for MemoryGraphStore {
    async fn item(&self, id: &ItemId) -> Result<Option<Item>, StoreError> {
        Ok(self.state.read().items.get(id).cloned())
    }

    async fn lot(&self, id: &LotId) -> Result<Option<InspectionLot>, StoreError> {
        Ok(self.state.read().lots.get(id).cloned())
    }

    async fn lots_for_item(&self, id: &ItemId) -> Result<Vec<InspectionLot>, StoreError> {
        let state = self.state.read();
        let mut lots: Vec<InspectionLot> = state
            .lots
            .values()
            .filter(|lot| &lot.item_id == id)
            .cloned()
            .collect();
        lots.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(lots)
    }

    async fn elements(&self, filter: &ElementFilter) -> Result<Vec<Element>, StoreError> {
        let state = self.state.read();
        let matches = |element: &Element| match filter {
            ElementFilter::Lot(lot_id) => element.inspection_lot_id.as_ref() == Some(lot_id),
            ElementFilter::Item(item_id) => element
                .inspection_lot_id
                .as_ref()
                .and_then(|lot_id| state.lots.get(lot_id))
                .is_some_and(|lot| &lot.item_id == item_id),
            ElementFilter::Ungrouped => element.is_unassigned(),
        };
        Ok(state
            .elements
            .values()
            .filter(|e| matches(e))
            .cloned()
            .collect())
    }

    async fn connections(&self, ids: &[ElementId]) -> Result<Vec<Connection>, StoreError> {
        let wanted: HashSet<&ElementId> = ids.iter().collect();
        let state = self.state.read();
        Ok(state
            .connections
            .iter()
            .filter(|c| {
                wanted.contains(&c.element_id)
                    || c.target.as_ref().is_some_and(|t| wanted.contains(t))
            })
            .cloned()
            .collect())
    }

    async fn create_lot(
        &self,
        lot: InspectionLot,
        members: &[ElementId],
    ) -> Result<Vec<ElementId>, StoreError> {
        let mut state = self.state.write();
        if !members.iter().any(|id| state.is_free(id)) {
            return Ok(Vec::new());
        }
        let lot_id = lot.id.clone();
        state.lots.insert(lot_id.clone(), lot);
        Ok(state.link(&lot_id, members))
    }

    async fn write_status(&self, write: StatusWrite) -> Result<StatusWriteOutcome, StoreError> {
        let mut state = self.state.write();
        let Some(lot) = state.lots.get_mut(&write.lot_id) else {
            return Ok(StatusWriteOutcome::Missing);
        };
        if lot.status != write.expected {
            return Ok(StatusWriteOutcome::Conflict { actual: lot.status });
        }
        lot.status = write.new_status;
        lot.updated_at = write.updated_at;
        let updated = lot.clone();
        if let Some(entry) = write.audit {
            state.history.push(entry);
        }
        Ok(StatusWriteOutcome::Applied(updated))
    }

    async fn history(&self, id: &LotId) -> Result<Vec<ApprovalHistoryEntry>, StoreError> {
        let state = self.state.read();
        Ok(state
            .history
            .iter()
            .filter(|entry| &entry.lot_id == id)
            .cloned()
            .collect())
    }

    async fn assign_elements(
        &self,
        lot_id: &LotId,
        ids: &[ElementId],
    ) -> Result<Vec<ElementId>, StoreError> {
        let mut state = self.state.write();
        if !state.lots.contains_key(lot_id) {
            return Ok(Vec::new());
        }
        Ok(state.link(lot_id, ids))
    }

    async fn remove_element(&self, lot_id: &LotId, id: &ElementId) -> Result<bool, StoreError> {
        let mut state = self.state.write();
        match state.elements.get_mut(id) {
            Some(element) if element.inspection_lot_id.as_ref() == Some(lot_id) => {
                element.inspection_lot_id = None;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::ElementKind;
    use crate::lot::LotStatus;
    use chrono::Utc;
    use pretty_assertions::assert_eq;

    fn store_with_pipes(n: usize) -> MemoryGraphStore {
        let store = MemoryGraphStore::new();
        for i in 0..n {
            store.insert_element(Element::new(format!("p{i}"), ElementKind::Pipe).with_level("L1"));
        }
        store
    }

    fn ids(raw: &[&str]) -> Vec<ElementId> {
        raw.iter().map(|s| ElementId::new(*s)).collect()
    }

    #[tokio::test]
    async fn create_lot_links_only_free_members() {
        let store = store_with_pipes(3);
        let first = InspectionLot::new("A", ItemId::new("i"), "a", Utc::now());
        let linked = store.create_lot(first, &ids(&["p0", "p1"])).await.unwrap();
        assert_eq!(linked, ids(&["p0", "p1"]));

        let second = InspectionLot::new("B", ItemId::new("i"), "b", Utc::now());
        let linked = store.create_lot(second, &ids(&["p1", "p2", "ghost"])).await.unwrap();
        assert_eq!(linked, ids(&["p2"]));
    }

    #[tokio::test]
    async fn create_lot_without_free_members_creates_nothing() {
        let store = store_with_pipes(1);
        let lot = InspectionLot::new("A", ItemId::new("i"), "a", Utc::now());
        store.create_lot(lot, &ids(&["p0"])).await.unwrap();

        let again = InspectionLot::new("A", ItemId::new("i"), "a", Utc::now());
        let linked = store.create_lot(again, &ids(&["p0"])).await.unwrap();
        assert!(linked.is_empty());
        assert_eq!(store.lots_for_item(&ItemId::new("i")).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn element_filters() {
        let store = store_with_pipes(3);
        let lot = InspectionLot::new("A", ItemId::new("i"), "a", Utc::now());
        let lot_id = lot.id.clone();
        store.create_lot(lot, &ids(&["p0"])).await.unwrap();

        let in_lot = store.elements(&ElementFilter::Lot(lot_id)).await.unwrap();
        let in_item = store.elements(&ElementFilter::Item(ItemId::new("i"))).await.unwrap();
        let ungrouped = store.elements(&ElementFilter::Ungrouped).await.unwrap();

        assert_eq!(in_lot.len(), 1);
        assert_eq!(in_item.len(), 1);
        assert_eq!(ungrouped.len(), 2);
    }

    #[tokio::test]
    async fn write_status_is_compare_and_set() {
        let store = MemoryGraphStore::new();
        let lot = InspectionLot::new("A", ItemId::new("i"), "a", Utc::now());
        let lot_id = lot.id.clone();
        store.insert_lot(lot);

        let write = |expected| StatusWrite {
            lot_id: lot_id.clone(),
            expected,
            new_status: LotStatus::InProgress,
            updated_at: Utc::now(),
            audit: None,
        };

        let applied = store.write_status(write(LotStatus::Planning)).await.unwrap();
        assert!(matches!(applied, StatusWriteOutcome::Applied(ref l) if l.status == LotStatus::InProgress));

        let conflict = store.write_status(write(LotStatus::Planning)).await.unwrap();
        assert_eq!(
            conflict,
            StatusWriteOutcome::Conflict {
                actual: LotStatus::InProgress
            }
        );
    }

    #[tokio::test]
    async fn connections_include_reverse_records() {
        let store = MemoryGraphStore::new();
        store.insert_connections(crate::connection::link_pair("a", 0, "b", 0));
        store.insert_connections([Connection::open("c", 0)]);

        let found = store.connections(&ids(&["a"])).await.unwrap();
        assert_eq!(found.len(), 2);
    }

    #[tokio::test]
    async fn remove_element_only_for_members() {
        let store = store_with_pipes(1);
        let lot = InspectionLot::new("A", ItemId::new("i"), "a", Utc::now());
        let lot_id = lot.id.clone();
        store.create_lot(lot, &ids(&["p0"])).await.unwrap();

        assert!(!store.remove_element(&LotId::new("other"), &ElementId::new("p0")).await.unwrap());
        assert!(store.remove_element(&lot_id, &ElementId::new("p0")).await.unwrap());
        assert!(store.element(&ElementId::new("p0")).unwrap().is_unassigned());
    }

    #[test]
    fn snapshot_roundtrip_through_file() {
        let store = store_with_pipes(2);
        store.insert_item(Item::new("i", "Block A"));
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snapshot.json");

        store.snapshot().save(&path).unwrap();
        let restored = MemoryGraphStore::from_snapshot(Snapshot::load(&path).unwrap());

        assert_eq!(restored.snapshot(), store.snapshot());
    }

    #[test]
    fn snapshot_rejects_unknown_element_type() {
        let json = r#"{"elements": [{"id": "x", "type": "Teleporter"}]}"#;
        let err = Snapshot::from_json(json).unwrap_err();
        assert!(matches!(err, StoreError::Malformed(msg) if msg.contains("Teleporter")));
    }
}
