//! Error types for the validation gates

use ilm_model::ElementKind;
use std::path::PathBuf;

/// Geometry errors from constructability helpers
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConstructabilityError {
    /// Path needs at least two points to define a direction
    #[error("path needs at least 2 points, got {points}")]
    PathTooShort {
        /// Points supplied
        points: usize,
    },
}

/// Errors while loading an ontology rule set
#[derive(Debug, thiserror::Error)]
pub enum RuleSetError {
    /// YAML could not be parsed into rules
    #[error("invalid rule set: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// Rule file could not be read
    #[error("io error reading {path}: {source}")]
    Io {
        /// Rule file
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// A rule lists no relationships
    #[error("rule {index} ({source_kind} -> {target_kind}) allows no relationship")]
    EmptyRule {
        /// Rule position in the file
        index: usize,
        /// First source kind of the rule
        source_kind: ElementKind,
        /// First target kind of the rule
        target_kind: ElementKind,
    },

    /// A rule lists no source or no target kinds
    #[error("rule {0} has no source or no target kinds")]
    NoKinds(usize),
}

impl RuleSetError {
    /// Create IO error for path
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
