//! ILM Lifecycle
//!
//! Governs inspection-lot status with role-based authorization.
//!
//! # Core Concepts
//!
//! ```text
//! PLANNING ──update_status──▶ IN_PROGRESS ──update_status──▶ SUBMITTED
//!     ▲                            ▲                            │
//!     └────────── reject ──────────┴────────── reject ──────────┤
//!                                                               │ approve (gates)
//!                                                               ▼
//!                                  PUBLISHED ◀──publish──── APPROVED
//! ```
//!
//! - **Administrative channel**: informal progress edits, no audit entry
//! - **Approval channel**: audited approve/reject decisions; approval runs
//!   the validation gates first
//! - [`RolePolicy`]: which roles may take which [`LifecycleAction`]
//!
//! # Example
//!
//! ```rust,ignore
//! use ilm_lifecycle::LifecycleService;
//! use ilm_model::{Caller, LotStatus, Role};
//!
//! # async fn example(service: LifecycleService, lot: ilm_model::LotId) -> ilm_model::LotResult<()> {
//! let editor = Caller::new("ed", Role::Editor);
//! service.update_status(&lot, LotStatus::InProgress, &editor).await?;
//! service.update_status(&lot, LotStatus::Submitted, &editor).await?;
//!
//! let approver = Caller::new("ann", Role::Approver);
//! service.approve(&lot, "looks good", &approver).await?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod policy;
pub mod report;
pub mod service;
pub mod state_machine;

pub use policy::{LifecycleAction, RolePolicy};
pub use report::{BatchApproveReport, BatchItemResult, MembershipChange};
pub use service::LifecycleService;
pub use state_machine::{allowed_admin_transitions, validate_admin_transition};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
