//! Topology gate
//!
//! Detects breaks in the connection network of a set of elements:
//! - **Open ends**: an element with at least one dangling endpoint, i.e. a
//!   connection with no target or one the target does not reciprocate.
//! - **Isolated elements**: an element with no connection, matched or not,
//!   to any other member of the set.
//!
//! The pure functions work on already-fetched [`Connection`] records;
//! [`TopologyValidator`] fetches them through the store client.

use ilm_model::{Connection, Element, ElementFilter, ElementId, LotId, StoreClient, StoreError};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Outcome of a topology check
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TopologyReport {
    /// True when there are no open ends and no isolated elements
    pub valid: bool,
    /// Elements with a dangling endpoint
    pub open_ends: Vec<ElementId>,
    /// Elements disconnected from the rest of the set
    pub isolated_elements: Vec<ElementId>,
    /// One message per finding
    pub errors: Vec<String>,
}

impl TopologyReport {
    /// Evaluate `ids` against their connection records
    #[must_use]
    pub fn evaluate(ids: &[ElementId], connections: &[Connection]) -> Self {
        let open_ends = open_ends(ids, connections);
        let isolated_elements = isolated_elements(ids, connections);

        let errors = open_ends
            .iter()
            .map(|id| format!("element {id} has an open end"))
            .chain(
                isolated_elements
                    .iter()
                    .map(|id| format!("element {id} is not connected to any other element")),
            )
            .collect::<Vec<_>>();

        Self {
            valid: errors.is_empty(),
            open_ends,
            isolated_elements,
            errors,
        }
    }

    /// Passing report for an empty set
    #[must_use]
    pub fn empty() -> Self {
        Self {
            valid: true,
            ..Self::default()
        }
    }

    /// Every element named by a finding, open ends first
    #[must_use]
    pub fn offending_elements(&self) -> Vec<ElementId> {
        let mut seen = HashSet::new();
        self.open_ends
            .iter()
            .chain(&self.isolated_elements)
            .filter(|id| seen.insert(*id))
            .cloned()
            .collect()
    }
}

fn unique(ids: &[ElementId]) -> impl Iterator<Item = &ElementId> {
    let mut seen = HashSet::new();
    ids.iter().filter(move |id| seen.insert(*id))
}

/// Members of `ids` with at least one dangling endpoint
///
/// Output follows input order without duplicates.
#[must_use]
pub fn open_ends(ids: &[ElementId], connections: &[Connection]) -> Vec<ElementId> {
    let links: HashSet<(&ElementId, &ElementId)> = connections
        .iter()
        .filter_map(|c| c.target.as_ref().map(|t| (&c.element_id, t)))
        .collect();

    let dangling: HashSet<&ElementId> = connections
        .iter()
        .filter(|c| match &c.target {
            None => true,
            Some(target) => !links.contains(&(target, &c.element_id)),
        })
        .map(|c| &c.element_id)
        .collect();

    unique(ids)
        .filter(|id| dangling.contains(*id))
        .cloned()
        .collect()
}

/// Members of `ids` with no connection to another member
///
/// Output follows input order without duplicates.
#[must_use]
pub fn isolated_elements(ids: &[ElementId], connections: &[Connection]) -> Vec<ElementId> {
    let members: HashSet<&ElementId> = ids.iter().collect();

    let mut linked: HashSet<&ElementId> = HashSet::new();
    for c in connections {
        let Some(target) = c.target.as_ref() else {
            continue;
        };
        if target != &c.element_id && members.contains(&c.element_id) && members.contains(target) {
            linked.insert(&c.element_id);
            linked.insert(target);
        }
    }

    unique(ids)
        .filter(|id| !linked.contains(*id))
        .cloned()
        .collect()
}

/// Store-backed topology checks
#[derive(Debug, Clone)]
pub struct TopologyValidator {
    store: StoreClient,
}

impl TopologyValidator {
    /// Create validator over a store client
    #[inline]
    #[must_use]
    pub fn new(store: StoreClient) -> Self {
        Self { store }
    }

    /// Elements among `ids` with a dangling endpoint
    ///
    /// An empty input returns immediately without a store call.
    ///
    /// # Errors
    /// Returns error if the connection lookup fails
    pub async fn find_open_ends(&self, ids: &[ElementId]) -> Result<Vec<ElementId>, StoreError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let connections = self.store.connections(ids).await?;
        Ok(open_ends(ids, &connections))
    }

    /// Elements among `ids` not connected to another member of `ids`
    ///
    /// An empty input returns immediately without a store call.
    ///
    /// # Errors
    /// Returns error if the connection lookup fails
    pub async fn find_isolated_elements(
        &self,
        ids: &[ElementId],
    ) -> Result<Vec<ElementId>, StoreError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let connections = self.store.connections(ids).await?;
        Ok(isolated_elements(ids, &connections))
    }

    /// Check the connection network of a lot's members
    ///
    /// A lot without members, including an unknown lot id, is valid.
    ///
    /// # Errors
    /// Returns error if a store call fails
    pub async fn validate_topology(&self, lot_id: &LotId) -> Result<TopologyReport, StoreError> {
        let members = self.store.elements(&ElementFilter::Lot(lot_id.clone())).await?;
        self.validate_members(&members).await
    }

    /// Check the connection network of already-loaded lot members
    ///
    /// Only connectable kinds take part; walls, slabs and other members
    /// without ports are ignored.
    ///
    /// # Errors
    /// Returns error if the connection lookup fails
    pub async fn validate_members(&self, members: &[Element]) -> Result<TopologyReport, StoreError> {
        let (report, _) = self.inspect(members).await?;
        Ok(report)
    }

    /// Report plus the connection records it was computed from
    pub(crate) async fn inspect(
        &self,
        members: &[Element],
    ) -> Result<(TopologyReport, Vec<Connection>), StoreError> {
        let ids = connectable_ids(members);
        if ids.is_empty() {
            return Ok((TopologyReport::empty(), Vec::new()));
        }
        let connections = self.store.connections(&ids).await?;
        let report = TopologyReport::evaluate(&ids, &connections);
        tracing::debug!(
            members = ids.len(),
            open_ends = report.open_ends.len(),
            isolated = report.isolated_elements.len(),
            "topology evaluated"
        );
        Ok((report, connections))
    }
}

fn connectable_ids(members: &[Element]) -> Vec<ElementId> {
    members
        .iter()
        .filter(|e| e.kind.is_connectable())
        .map(|e| e.id.clone())
        .collect()
}
