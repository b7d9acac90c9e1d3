//! ILM Query Cache
//!
//! A bounded, process-local cache for expensive aggregate reads (hierarchy
//! trees, grouping previews).
//!
//! # Core Concepts
//!
//! - [`QueryCache`]: ordered map with per-entry TTL and LRU eviction
//! - [`CacheKey`]: namespaced, order-independent hash of call arguments
//! - [`CacheScope`]: literal key prefix used for targeted invalidation
//!
//! The cache knows nothing about lots or elements. Callers derive keys under
//! a scope and invalidate that scope when the underlying data changes.
//!
//! # Example
//!
//! ```rust,ignore
//! use ilm_cache::{CacheKey, CacheScope, QueryCache};
//!
//! let cache = QueryCache::default();
//! let scope = CacheScope::new("item", "item-7");
//! let key = CacheKey::derive(&scope, "preview", &serde_json::json!({"rule": "BY_LEVEL"}))?;
//!
//! cache.set_default(&key, serde_json::json!({"groups": []}));
//! assert!(cache.get(&key).is_some());
//!
//! cache.invalidate(scope.prefix());
//! assert!(cache.get(&key).is_none());
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

mod cache;
mod error;
mod key;

pub use cache::{CacheConfig, CacheStats, QueryCache};
pub use error::CacheError;
pub use key::{CacheKey, CacheScope};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
