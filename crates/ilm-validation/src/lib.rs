//! ILM Validation Gates
//!
//! Engineering-validity checks that a lot must pass before an approval is
//! accepted.
//!
//! # Core Concepts
//!
//! - **Constructability**: routed runs bend only at standard fitting angles;
//!   walls, columns and beams carry `height` and `base_offset`
//! - **Topology**: no open ends and no isolated elements in a lot's network
//! - **Semantic**: every relationship is permitted by the [`Ontology`]
//! - [`GatePipeline`]: runs the three gates in order and reports the first
//!   failure
//!
//! # Example
//!
//! ```rust,ignore
//! use ilm_validation::{GatePipeline, RuleSet};
//! use std::sync::Arc;
//!
//! # async fn example(store: ilm_model::StoreClient, lot: ilm_model::LotId,
//! #     members: Vec<ilm_model::Element>) -> Result<(), Box<dyn std::error::Error>> {
//! let pipeline = GatePipeline::new(store, Arc::new(RuleSet::bundled()?));
//!
//! match pipeline.run(&lot, &members).await? {
//!     ilm_validation::GateOutcome::Passed => println!("ready for approval"),
//!     ilm_validation::GateOutcome::Failed(failure) => println!("{failure}"),
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod constructability;
pub mod error;
pub mod ontology;
pub mod pipeline;
pub mod result;
pub mod semantic;
pub mod topology;

pub use constructability::{
    bend_angles, calculate_path_angle, nearest_standard_angle, snap_angle, validate_angle,
    validate_element, validate_z_axis_completeness, AngleCheck,
};
pub use error::{ConstructabilityError, RuleSetError};
pub use ontology::{Ontology, OntologyVerdict, Relationship, RuleSet};
pub use pipeline::{GateConfig, GateOutcome, GatePipeline};
pub use result::ValidationResult;
pub use semantic::{RelationshipTriple, SemanticReport, SemanticValidator};
pub use topology::{TopologyReport, TopologyValidator};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
