//! Lifecycle service
//!
//! Every mutating call follows the same sequence while holding the lot's
//! advisory lock:
//!
//! 1. load the lot (`NotFound` if absent)
//! 2. check the requested transition against the state table
//! 3. check the caller's role
//! 4. for approvals, run the validation gates
//! 5. compare-and-set the status in the store, appending the audit entry
//!    in the same call
//! 6. invalidate cached views of the lot and its item
//!
//! The store write is conditional on the status read in step 1, so a
//! concurrent writer outside this process can never be silently
//! overwritten; a lost race surfaces as `InvalidTransition`.

use chrono::{DateTime, Utc};
use ilm_cache::{CacheScope, QueryCache};
use ilm_model::{
    ApprovalAction, ApprovalHistoryEntry, Caller, ElementFilter, ElementId, EntityKind,
    InspectionLot, KeyedLocks, LotError, LotId, LotResult, LotStatus, RejectLevel, StatusWrite,
    StatusWriteOutcome, StoreClient,
};
use ilm_validation::{GateOutcome, GatePipeline};
use std::collections::HashSet;
use std::sync::Arc;

use crate::policy::{LifecycleAction, RolePolicy};
use crate::report::{BatchApproveReport, BatchItemResult, MembershipChange};
use crate::state_machine::{
    validate_admin_transition, validate_approval, validate_publish, validate_rejection,
};

/// Drives lots through their lifecycle
#[derive(Debug)]
pub struct LifecycleService {
    store: StoreClient,
    cache: Arc<QueryCache>,
    gates: GatePipeline,
    policy: RolePolicy,
    locks: KeyedLocks<LotId>,
}

impl LifecycleService {
    /// Create service with the default role policy
    #[must_use]
    pub fn new(store: StoreClient, cache: Arc<QueryCache>, gates: GatePipeline) -> Self {
        Self {
            store,
            cache,
            gates,
            policy: RolePolicy::default(),
            locks: KeyedLocks::new(),
        }
    }

    /// With role policy
    #[inline]
    #[must_use]
    pub fn with_policy(mut self, policy: RolePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Active role policy
    #[inline]
    #[must_use]
    pub fn policy(&self) -> &RolePolicy {
        &self.policy
    }

    /// Gate pipeline used by [`approve`](Self::approve)
    #[inline]
    #[must_use]
    pub fn gates(&self) -> &GatePipeline {
        &self.gates
    }

    /// Administrative status change (`PLANNING → IN_PROGRESS → SUBMITTED`)
    ///
    /// No audit entry is written and no gate runs.
    ///
    /// # Errors
    /// - `NotFound` for an unknown lot
    /// - `InvalidTransition` for any change outside the administrative table
    /// - `Forbidden` when the caller's role may not change status
    #[tracing::instrument(skip_all, fields(lot_id = %lot_id, to = %new_status, user_id = %caller.user_id))]
    pub async fn update_status(
        &self,
        lot_id: &LotId,
        new_status: LotStatus,
        caller: &Caller,
    ) -> LotResult<InspectionLot> {
        let _guard = self.locks.lock(lot_id).await;
        let lot = self.load(lot_id).await?;

        validate_admin_transition(lot.status, new_status)?;
        self.policy.authorize(LifecycleAction::UpdateStatus, caller)?;

        let updated = self.write(&lot, new_status, None, Utc::now()).await?;
        tracing::info!(from = %lot.status, "lot status updated");
        Ok(updated)
    }

    /// Approve a submitted lot after every gate passes
    ///
    /// # Errors
    /// - `NotFound` for an unknown lot
    /// - `InvalidTransition` unless the lot is `SUBMITTED`
    /// - `Forbidden` when the caller may not approve
    /// - `ValidationFailed` with the first failing gate; the lot stays `SUBMITTED`
    #[tracing::instrument(skip_all, fields(lot_id = %lot_id, user_id = %caller.user_id))]
    pub async fn approve(
        &self,
        lot_id: &LotId,
        comment: &str,
        caller: &Caller,
    ) -> LotResult<InspectionLot> {
        let _guard = self.locks.lock(lot_id).await;
        let lot = self.load(lot_id).await?;

        validate_approval(lot.status)?;
        self.policy.authorize(LifecycleAction::Approve, caller)?;

        let members = self
            .store
            .elements(&ElementFilter::Lot(lot_id.clone()))
            .await?;
        if let GateOutcome::Failed(failure) = self.gates.run(lot_id, &members).await? {
            tracing::warn!(gate = %failure.gate, "approval refused by validation gate");
            return Err(LotError::ValidationFailed(failure));
        }

        let now = Utc::now();
        let audit = audit_entry(&lot, ApprovalAction::Approve, LotStatus::Approved, caller, comment, now);
        let updated = self.write(&lot, LotStatus::Approved, Some(audit), now).await?;
        tracing::info!(members = members.len(), "lot approved");
        Ok(updated)
    }

    /// Send a submitted lot back to `IN_PROGRESS` or `PLANNING`
    ///
    /// Gates do not run; a rejection is always accepted from `SUBMITTED`.
    ///
    /// # Errors
    /// - `NotFound` for an unknown lot
    /// - `InvalidTransition` unless the lot is `SUBMITTED`
    /// - `Forbidden` when the caller may not reject
    #[tracing::instrument(skip_all, fields(lot_id = %lot_id, user_id = %caller.user_id, level = ?level))]
    pub async fn reject(
        &self,
        lot_id: &LotId,
        reason: &str,
        level: RejectLevel,
        caller: &Caller,
    ) -> LotResult<InspectionLot> {
        let _guard = self.locks.lock(lot_id).await;
        let lot = self.load(lot_id).await?;

        validate_rejection(lot.status, level)?;
        self.policy.authorize(LifecycleAction::Reject, caller)?;

        let now = Utc::now();
        let target = LotStatus::from(level);
        let audit = audit_entry(&lot, ApprovalAction::Reject, target, caller, reason, now);
        let updated = self.write(&lot, target, Some(audit), now).await?;
        tracing::info!(to = %target, "lot rejected");
        Ok(updated)
    }

    /// Approve several lots independently
    ///
    /// Each lot succeeds or fails on its own; one failure never stops the
    /// rest. Results keep the request order.
    pub async fn batch_approve(
        &self,
        lot_ids: &[LotId],
        comment: &str,
        caller: &Caller,
    ) -> BatchApproveReport {
        let mut report = BatchApproveReport::default();

        for lot_id in lot_ids {
            let entry = match self.approve(lot_id, comment, caller).await {
                Ok(lot) => BatchItemResult {
                    lot_id: lot_id.clone(),
                    success: true,
                    status: Some(lot.status),
                    message: "approved".to_string(),
                },
                Err(error) => BatchItemResult {
                    lot_id: lot_id.clone(),
                    success: false,
                    status: status_hint(&error),
                    message: error.to_string(),
                },
            };
            report.results.push(entry);
        }

        tracing::info!(
            requested = lot_ids.len(),
            approved = report.approved(),
            failed = report.failed(),
            "batch approval finished"
        );
        report
    }

    /// Release an approved lot
    ///
    /// # Errors
    /// - `NotFound` for an unknown lot
    /// - `InvalidTransition` unless the lot is `APPROVED`
    /// - `Forbidden` when the caller may not publish
    #[tracing::instrument(skip_all, fields(lot_id = %lot_id, user_id = %caller.user_id))]
    pub async fn publish(&self, lot_id: &LotId, caller: &Caller) -> LotResult<InspectionLot> {
        let _guard = self.locks.lock(lot_id).await;
        let lot = self.load(lot_id).await?;

        validate_publish(lot.status)?;
        self.policy.authorize(LifecycleAction::Publish, caller)?;

        let updated = self.write(&lot, LotStatus::Published, None, Utc::now()).await?;
        tracing::info!("lot published");
        Ok(updated)
    }

    /// Audit trail of a lot, oldest first
    ///
    /// # Errors
    /// Returns `NotFound` for an unknown lot
    pub async fn history(&self, lot_id: &LotId) -> LotResult<Vec<ApprovalHistoryEntry>> {
        self.load(lot_id).await?;
        Ok(self.store.history(lot_id).await?)
    }

    /// Link unassigned elements to an editable lot
    ///
    /// Elements already owned by a lot, or unknown to the store, are
    /// reported as skipped.
    ///
    /// # Errors
    /// - `NotFound` for an unknown lot
    /// - `LotLocked` unless the lot is `PLANNING` or `IN_PROGRESS`
    /// - `Forbidden` when the caller may not edit membership
    #[tracing::instrument(skip_all, fields(lot_id = %lot_id, requested = element_ids.len()))]
    pub async fn assign_elements(
        &self,
        lot_id: &LotId,
        element_ids: &[ElementId],
        caller: &Caller,
    ) -> LotResult<MembershipChange> {
        let _guard = self.locks.lock(lot_id).await;
        let lot = self.load(lot_id).await?;
        self.check_editable(&lot, caller)?;

        let linked = self.store.assign_elements(lot_id, element_ids).await?;
        self.invalidate_membership(&lot);

        let linked_set: HashSet<&ElementId> = linked.iter().collect();
        let mut seen = HashSet::new();
        let skipped = element_ids
            .iter()
            .filter(|id| !linked_set.contains(id) && seen.insert(*id))
            .cloned()
            .collect();

        tracing::info!(linked = linked.len(), "elements assigned to lot");
        Ok(MembershipChange {
            lot_id: lot_id.clone(),
            element_ids: linked,
            skipped,
        })
    }

    /// Unlink one member from an editable lot
    ///
    /// # Errors
    /// - `NotFound` for an unknown lot, or an element that is not a member
    /// - `LotLocked` unless the lot is `PLANNING` or `IN_PROGRESS`
    /// - `Forbidden` when the caller may not edit membership
    #[tracing::instrument(skip_all, fields(lot_id = %lot_id, element_id = %element_id))]
    pub async fn remove_element(
        &self,
        lot_id: &LotId,
        element_id: &ElementId,
        caller: &Caller,
    ) -> LotResult<MembershipChange> {
        let _guard = self.locks.lock(lot_id).await;
        let lot = self.load(lot_id).await?;
        self.check_editable(&lot, caller)?;

        if !self.store.remove_element(lot_id, element_id).await? {
            return Err(LotError::not_found(EntityKind::Element, element_id));
        }
        self.invalidate_membership(&lot);

        tracing::info!("element removed from lot");
        Ok(MembershipChange {
            lot_id: lot_id.clone(),
            element_ids: vec![element_id.clone()],
            skipped: Vec::new(),
        })
    }

    async fn load(&self, lot_id: &LotId) -> LotResult<InspectionLot> {
        self.store
            .lot(lot_id)
            .await?
            .ok_or_else(|| LotError::not_found(EntityKind::Lot, lot_id))
    }

    fn check_editable(&self, lot: &InspectionLot, caller: &Caller) -> LotResult<()> {
        if !lot.status.is_editable() {
            return Err(LotError::LotLocked {
                lot_id: lot.id.clone(),
                status: lot.status,
            });
        }
        self.policy.authorize(LifecycleAction::EditMembership, caller)
    }

    async fn write(
        &self,
        lot: &InspectionLot,
        new_status: LotStatus,
        audit: Option<ApprovalHistoryEntry>,
        now: DateTime<Utc>,
    ) -> LotResult<InspectionLot> {
        let outcome = self
            .store
            .write_status(StatusWrite {
                lot_id: lot.id.clone(),
                expected: lot.status,
                new_status,
                updated_at: now,
                audit,
            })
            .await?;

        match outcome {
            StatusWriteOutcome::Applied(updated) => {
                self.invalidate_status(&updated);
                Ok(updated)
            }
            StatusWriteOutcome::Conflict { actual } => {
                tracing::warn!(lot_id = %lot.id, expected = %lot.status, %actual, "status changed concurrently");
                Err(LotError::InvalidTransition {
                    from: actual,
                    to: new_status,
                })
            }
            StatusWriteOutcome::Missing => Err(LotError::not_found(EntityKind::Lot, &lot.id)),
        }
    }

    fn invalidate_status(&self, lot: &InspectionLot) {
        self.cache.invalidate(lot.id.cache_scope().prefix());
        self.cache.invalidate(lot.item_id.cache_scope().prefix());
    }

    /// Membership edits change the ungrouped pool every item previews from
    fn invalidate_membership(&self, lot: &InspectionLot) {
        self.cache.invalidate(lot.id.cache_scope().prefix());
        self.cache.invalidate(CacheScope::kind("item").prefix());
    }
}

fn audit_entry(
    lot: &InspectionLot,
    action: ApprovalAction,
    new_status: LotStatus,
    caller: &Caller,
    comment: &str,
    timestamp: DateTime<Utc>,
) -> ApprovalHistoryEntry {
    ApprovalHistoryEntry {
        lot_id: lot.id.clone(),
        action,
        user_id: caller.user_id.clone(),
        comment: comment.to_string(),
        old_status: lot.status,
        new_status,
        timestamp,
    }
}

fn status_hint(error: &LotError) -> Option<LotStatus> {
    match error {
        LotError::InvalidTransition { from, .. } => Some(*from),
        LotError::ValidationFailed(_) | LotError::Forbidden { .. } => Some(LotStatus::Submitted),
        _ => None,
    }
}
