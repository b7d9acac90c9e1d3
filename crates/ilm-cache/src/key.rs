//! Cache key derivation
//!
//! Keys have the shape `"{kind}:{id}/{namespace}/{digest}"`. The leading
//! `"{kind}:{id}/"` part is the [`CacheScope`] prefix; the digest is the
//! SHA-256 of a canonical JSON rendering of the call arguments.

use serde::Serialize;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::fmt::{self, Display, Formatter};

use crate::error::CacheError;

/// Literal prefix that groups every key derived for one entity
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheScope {
    prefix: String,
}

impl CacheScope {
    /// Create scope for an entity kind and id, e.g. `("lot", "01J…")`
    #[inline]
    #[must_use]
    pub fn new(kind: &str, id: impl AsRef<str>) -> Self {
        Self {
            prefix: format!("{kind}:{}/", id.as_ref()),
        }
    }

    /// Scope covering every entity of a kind, e.g. all items
    #[inline]
    #[must_use]
    pub fn kind(kind: &str) -> Self {
        Self {
            prefix: format!("{kind}:"),
        }
    }

    /// Prefix passed to [`QueryCache::invalidate`](crate::QueryCache::invalidate)
    #[inline]
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }
}

impl Display for CacheScope {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.prefix)
    }
}

/// Fully derived cache key
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    /// Derive key from scope, namespace and logical call arguments
    ///
    /// Object keys are sorted before hashing, so two calls whose named
    /// arguments differ only in order produce the same key.
    ///
    /// # Errors
    /// Returns error if `args` cannot be serialized to JSON
    pub fn derive<A>(scope: &CacheScope, namespace: &str, args: &A) -> Result<Self, CacheError>
    where
        A: Serialize + ?Sized,
    {
        let canonical = canonicalize(serde_json::to_value(args)?);
        let bytes = serde_json::to_vec(&canonical)?;
        let digest = Sha256::digest(&bytes);
        Ok(Self(format!(
            "{}{namespace}/{}",
            scope.prefix(),
            hex::encode(digest)
        )))
    }

    /// Raw key string
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Check whether key falls under a literal prefix
    #[inline]
    #[must_use]
    pub fn has_prefix(&self, prefix: &str) -> bool {
        self.0.starts_with(prefix)
    }
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CacheKey {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Recursively rebuild objects with sorted keys
fn canonicalize(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            let mut sorted = Map::new();
            for (k, v) in entries {
                sorted.insert(k, canonicalize(v));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.into_iter().map(canonicalize).collect()),
        other => other,
    }
}
