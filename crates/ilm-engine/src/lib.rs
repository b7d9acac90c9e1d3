//! ILM Engine
//!
//! Facade over the inspection-lot services plus the configuration they are
//! built from.
//!
//! # Core Concepts
//!
//! - [`EngineConfig`]: cache sizing, store timeout, gate switches, role
//!   policy and ontology location, loadable from TOML
//! - [`InspectionEngine`]: owns the query cache and wires the injected
//!   graph store and ontology into the lifecycle and partition services
//! - [`ItemHierarchy`]: cached item → lots → elements view
//!
//! # Example
//!
//! ```rust,ignore
//! use ilm_engine::{EngineConfig, InspectionEngine};
//! use ilm_model::{ItemId, MemoryGraphStore};
//! use ilm_partition::PartitionRule;
//! use std::sync::Arc;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = EngineConfig::load("ilm.toml".as_ref())?;
//! let engine = InspectionEngine::new(config, Arc::new(MemoryGraphStore::new()))?;
//!
//! let item = ItemId::new("block-a");
//! let report = engine.partition().commit(&item, PartitionRule::ByLevel).await?;
//! let tree = engine.item_hierarchy(&item).await?;
//! assert_eq!(tree.lots.len(), report.total_lots);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod config;
pub mod engine;
pub mod hierarchy;

pub use config::{ConfigError, EngineConfig};
pub use engine::InspectionEngine;
pub use hierarchy::{ItemHierarchy, LotNode};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
