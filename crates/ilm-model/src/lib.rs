//! ILM Model
//!
//! Shared vocabulary for the inspection-lot engine:
//! - Elements, items, lots and approval history
//! - Caller roles
//! - The domain error taxonomy ([`LotError`])
//! - The graph-store collaborator contract ([`GraphStore`]) and a
//!   timeout-bounded client wrapper ([`StoreClient`])
//! - [`MemoryGraphStore`], an in-process reference store
//!
//! This crate performs no I/O of its own; every read or write goes through a
//! [`GraphStore`] implementation supplied by the caller.

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod auth;
pub mod connection;
pub mod element;
pub mod error;
pub mod ids;
pub mod locks;
pub mod lot;
pub mod store;

pub use auth::{Caller, Role};
pub use connection::Connection;
pub use element::{DecodeError, Element, ElementKind, Point2};
pub use error::{EntityKind, GateFailure, GateKind, LotError, LotResult};
pub use ids::{ElementId, ItemId, LotId};
pub use locks::{KeyedLockGuard, KeyedLocks};
pub use lot::{ApprovalAction, ApprovalHistoryEntry, InspectionLot, Item, LotStatus, RejectLevel};
pub use store::{
    ElementFilter, GraphStore, MemoryGraphStore, Snapshot, StatusWrite, StatusWriteOutcome,
    StoreClient, StoreError,
};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
