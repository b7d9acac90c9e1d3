//! Error types for the query cache

/// Errors during cache key derivation and typed access
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// Arguments or payload could not be serialized to JSON
    #[error("cache serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Configuration rejected at construction
    #[error("invalid cache configuration: {0}")]
    InvalidConfig(String),
}
