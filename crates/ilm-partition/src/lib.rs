//! ILM Partition
//!
//! Deterministic spatial partitioning of unassigned elements into
//! inspection lots.
//!
//! # Core Concepts
//!
//! - [`PartitionRule`]: which spatial attribute(s) elements are grouped by
//! - [`group_elements`]: the single grouping function behind both preview
//!   and commit
//! - [`PartitionService`]: cached preview and idempotent commit
//!
//! Elements missing the grouped attribute land in the
//! [`UNASSIGNED_KEY`] group rather than being dropped.
//!
//! # Example
//!
//! ```rust,ignore
//! use ilm_partition::{PartitionRule, PartitionService};
//!
//! # async fn example(service: PartitionService, item: ilm_model::ItemId) -> ilm_model::LotResult<()> {
//! let preview = service.preview(&item, PartitionRule::ByLevel).await?;
//! println!("{} lots would be created", preview.estimated_lot_count);
//!
//! let report = service.commit(&item, PartitionRule::ByLevel).await?;
//! assert_eq!(report.lots_created.len(), preview.estimated_lot_count);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod group;
pub mod report;
pub mod rule;
pub mod service;

pub use group::{group_elements, group_key, group_name, spatial_scope, ElementGroup, UNASSIGNED_KEY};
pub use report::{CommitReport, CreatedLot, PartitionPreview, PreviewGroup};
pub use rule::{PartitionRule, UnknownRule};
pub use service::PartitionService;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
