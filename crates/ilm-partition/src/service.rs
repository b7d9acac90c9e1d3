//! Partition service
//!
//! `preview` and `commit` read the same candidate set and group it through
//! [`group_elements`], so a commit issued right after a preview creates the
//! groups the preview showed. Commits for one item are serialised by an
//! advisory lock; the store's `create_lot` skips members taken since the
//! read, which keeps re-runs and races from double-assigning elements.

use chrono::Utc;
use ilm_cache::{CacheKey, CacheScope, QueryCache};
use ilm_model::{
    Element, ElementFilter, ElementId, EntityKind, InspectionLot, ItemId, KeyedLocks, LotError,
    LotResult, StoreClient,
};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;

use crate::group::{group_elements, spatial_scope};
use crate::report::{CommitReport, CreatedLot, PartitionPreview, PreviewGroup};
use crate::rule::PartitionRule;

/// Cache namespace of previews under an item scope
pub const PREVIEW_NAMESPACE: &str = "preview";

#[derive(Serialize)]
struct PreviewArgs {
    rule: PartitionRule,
}

/// Groups unassigned elements into inspection lots
#[derive(Debug)]
pub struct PartitionService {
    store: StoreClient,
    cache: Arc<QueryCache>,
    locks: KeyedLocks<ItemId>,
}

impl PartitionService {
    /// Create service
    #[must_use]
    pub fn new(store: StoreClient, cache: Arc<QueryCache>) -> Self {
        Self {
            store,
            cache,
            locks: KeyedLocks::new(),
        }
    }

    /// Group the current candidates without writing anything
    ///
    /// Served from the cache when an earlier preview for the same item and
    /// rule is still fresh.
    ///
    /// # Errors
    /// - `NotFound` for an unknown item
    /// - `Store` when the graph store fails
    #[tracing::instrument(skip_all, fields(item_id = %item_id, rule = %rule))]
    pub async fn preview(&self, item_id: &ItemId, rule: PartitionRule) -> LotResult<PartitionPreview> {
        let compute = move || async move {
            let candidates = self.candidates(item_id).await?;
            let groups: Vec<PreviewGroup> = group_elements(rule, &candidates)
                .into_iter()
                .map(|group| PreviewGroup {
                    key: group.key,
                    count: group.element_ids.len(),
                    label: group.name,
                })
                .collect();
            tracing::debug!(candidates = candidates.len(), groups = groups.len(), "preview computed");
            Ok::<_, LotError>(PartitionPreview {
                rule,
                estimated_lot_count: groups.len(),
                groups,
            })
        };

        match CacheKey::derive(&item_id.cache_scope(), PREVIEW_NAMESPACE, &PreviewArgs { rule }) {
            Ok(key) => self.cache.get_or_try_insert_with(&key, None, compute).await,
            Err(error) => {
                tracing::warn!(%error, "preview key not derivable; computing uncached");
                compute().await
            }
        }
    }

    /// Create one lot per non-empty group and link its members
    ///
    /// Re-running a commit is harmless: elements placed by an earlier run
    /// are no longer candidates, so a second run creates nothing.
    ///
    /// # Errors
    /// - `NotFound` for an unknown item
    /// - `Store` when the graph store fails; lots created before the
    ///   failure remain
    #[tracing::instrument(skip_all, fields(item_id = %item_id, rule = %rule))]
    pub async fn commit(&self, item_id: &ItemId, rule: PartitionRule) -> LotResult<CommitReport> {
        let _guard = self.locks.lock(item_id).await;
        let candidates = self.candidates(item_id).await?;
        let now = Utc::now();

        let mut report = CommitReport::default();
        let outcome = async {
            for group in group_elements(rule, &candidates) {
                let lot = InspectionLot::new(
                    group.name.clone(),
                    item_id.clone(),
                    spatial_scope(rule, &group.key),
                    now,
                )
                .with_group_key(group.key.clone());
                let lot_id = lot.id.clone();

                let linked = self.store.create_lot(lot, &group.element_ids).await?;
                if linked.is_empty() {
                    tracing::debug!(key = %group.key, "group emptied concurrently; no lot created");
                    continue;
                }

                report.elements_assigned += linked.len();
                report.lots_created.push(CreatedLot {
                    lot_id,
                    name: group.name,
                    key: group.key,
                    element_count: linked.len(),
                });
            }
            Ok::<_, LotError>(())
        }
        .await;

        // Lots created before a store failure stay, so invalidate whenever
        // anything was written. Candidates come from the shared ungrouped
        // pool, which makes every item's previews stale.
        if !report.is_noop() {
            self.cache.invalidate(CacheScope::kind("item").prefix());
        }
        if let Err(error) = outcome {
            tracing::warn!(
                lots_created = report.lots_created.len(),
                %error,
                "partition commit stopped early"
            );
            return Err(error);
        }

        report.total_lots = self.store.lots_for_item(item_id).await?.len();

        tracing::info!(
            lots_created = report.lots_created.len(),
            elements_assigned = report.elements_assigned,
            total_lots = report.total_lots,
            "partition committed"
        );
        Ok(report)
    }

    /// Unassigned elements not already held by a lot of `item_id`
    async fn candidates(&self, item_id: &ItemId) -> LotResult<Vec<Element>> {
        if self.store.item(item_id).await?.is_none() {
            return Err(LotError::not_found(EntityKind::Item, item_id));
        }

        let ungrouped = self.store.elements(&ElementFilter::Ungrouped).await?;
        let owned: HashSet<ElementId> = self
            .store
            .elements(&ElementFilter::Item(item_id.clone()))
            .await?
            .into_iter()
            .map(|element| element.id)
            .collect();

        Ok(ungrouped
            .into_iter()
            .filter(|element| element.is_unassigned() && !owned.contains(&element.id))
            .collect())
    }
}
