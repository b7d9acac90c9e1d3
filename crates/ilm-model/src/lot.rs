//! Items, inspection lots and approval history

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::ids::{ItemId, LotId};

/// Lifecycle status of an inspection lot
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LotStatus {
    /// Freshly created, scope still being shaped
    Planning,
    /// Work on the lot's elements is under way
    InProgress,
    /// Handed over for inspection
    Submitted,
    /// Inspection passed
    Approved,
    /// Released downstream
    Published,
}

impl LotStatus {
    /// Every status, in lifecycle order
    pub const ALL: [LotStatus; 5] = [
        LotStatus::Planning,
        LotStatus::InProgress,
        LotStatus::Submitted,
        LotStatus::Approved,
        LotStatus::Published,
    ];

    /// Wire name
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            LotStatus::Planning => "PLANNING",
            LotStatus::InProgress => "IN_PROGRESS",
            LotStatus::Submitted => "SUBMITTED",
            LotStatus::Approved => "APPROVED",
            LotStatus::Published => "PUBLISHED",
        }
    }

    /// Whether element membership may still change
    #[inline]
    #[must_use]
    pub const fn is_editable(&self) -> bool {
        matches!(self, LotStatus::Planning | LotStatus::InProgress)
    }
}

impl fmt::Display for LotStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LotStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().replace('-', "_").to_ascii_uppercase();
        LotStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == normalized)
            .ok_or_else(|| format!("unknown lot status: '{s}'"))
    }
}

/// Status a rejected lot falls back to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RejectLevel {
    /// Send back for rework
    InProgress,
    /// Send back to scoping
    Planning,
}

impl From<RejectLevel> for LotStatus {
    fn from(level: RejectLevel) -> Self {
        match level {
            RejectLevel::InProgress => LotStatus::InProgress,
            RejectLevel::Planning => LotStatus::Planning,
        }
    }
}

/// Grouping scope owning zero or more lots
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    /// Item id
    pub id: ItemId,
    /// Display name
    pub name: String,
}

impl Item {
    /// Create item
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<ItemId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }

    /// The distinguished Unassigned Item
    #[must_use]
    pub fn unassigned() -> Self {
        Self::new(ItemId::unassigned(), "Unassigned")
    }
}

/// The unit of inspection approval
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InspectionLot {
    /// Lot id
    pub id: LotId,
    /// Display name derived from the grouping key
    pub name: String,
    /// Current lifecycle status
    pub status: LotStatus,
    /// Owning item
    pub item_id: ItemId,
    /// Human-readable grouping descriptor
    pub spatial_scope: String,
    /// Partition key the lot was created from, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_key: Option<String>,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last status change
    pub updated_at: DateTime<Utc>,
}

impl InspectionLot {
    /// Create lot in `PLANNING`
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        item_id: ItemId,
        spatial_scope: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: LotId::generate(),
            name: name.into(),
            status: LotStatus::Planning,
            item_id,
            spatial_scope: spatial_scope.into(),
            group_key: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// With partition key
    #[inline]
    #[must_use]
    pub fn with_group_key(mut self, key: impl Into<String>) -> Self {
        self.group_key = Some(key.into());
        self
    }

    /// With explicit id
    #[inline]
    #[must_use]
    pub fn with_id(mut self, id: LotId) -> Self {
        self.id = id;
        self
    }

    /// With status
    #[inline]
    #[must_use]
    pub fn with_status(mut self, status: LotStatus) -> Self {
        self.status = status;
        self
    }
}

/// Audited decision kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApprovalAction {
    /// Lot accepted
    Approve,
    /// Lot sent back
    Reject,
}

impl fmt::Display for ApprovalAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApprovalAction::Approve => f.write_str("APPROVE"),
            ApprovalAction::Reject => f.write_str("REJECT"),
        }
    }
}

/// Immutable audit record of one approve/reject call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalHistoryEntry {
    /// Lot the decision applies to
    pub lot_id: LotId,
    /// Decision
    pub action: ApprovalAction,
    /// Deciding user
    pub user_id: String,
    /// Approval comment or rejection reason
    pub comment: String,
    /// Status before the decision
    pub old_status: LotStatus,
    /// Status after the decision
    pub new_status: LotStatus,
    /// Decision time
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_wire_names() {
        assert_eq!(
            serde_json::to_string(&LotStatus::InProgress).unwrap(),
            "\"IN_PROGRESS\""
        );
        assert_eq!(LotStatus::Submitted.to_string(), "SUBMITTED");
    }

    #[test]
    fn status_parses_loosely() {
        assert_eq!("in-progress".parse::<LotStatus>().unwrap(), LotStatus::InProgress);
        assert_eq!("APPROVED".parse::<LotStatus>().unwrap(), LotStatus::Approved);
        assert!("DONE".parse::<LotStatus>().is_err());
    }

    #[test]
    fn reject_levels_map_to_statuses() {
        assert_eq!(LotStatus::from(RejectLevel::Planning), LotStatus::Planning);
        assert_eq!(LotStatus::from(RejectLevel::InProgress), LotStatus::InProgress);
    }

    #[test]
    fn new_lot_starts_in_planning() {
        let now = Utc::now();
        let lot = InspectionLot::new("Level 1", ItemId::new("i"), "BY_LEVEL: 1", now);
        assert_eq!(lot.status, LotStatus::Planning);
        assert_eq!(lot.created_at, lot.updated_at);
    }

    #[test]
    fn only_early_statuses_are_editable() {
        assert!(LotStatus::Planning.is_editable());
        assert!(LotStatus::InProgress.is_editable());
        assert!(!LotStatus::Submitted.is_editable());
        assert!(!LotStatus::Approved.is_editable());
    }
}
