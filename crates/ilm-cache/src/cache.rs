//! TTL + LRU query cache
//!
//! Entries live in an [`IndexMap`] ordered from least- to most-recently
//! used. A hit moves the entry to the back; an insert at capacity evicts the
//! front. Expired entries are purged lazily on access.

use indexmap::IndexMap;
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::future::Future;
use std::time::{Duration, Instant};

use crate::error::CacheError;
use crate::key::CacheKey;

/// Cache sizing and expiry settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum number of live entries
    pub max_size: usize,
    /// TTL applied by [`QueryCache::set_default`], in seconds
    pub default_ttl_secs: u64,
}

impl CacheConfig {
    /// Default TTL as a [`Duration`]
    #[inline]
    #[must_use]
    pub fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.default_ttl_secs)
    }

    /// With max size
    #[inline]
    #[must_use]
    pub fn with_max_size(mut self, max_size: usize) -> Self {
        self.max_size = max_size;
        self
    }

    /// With default TTL in seconds
    #[inline]
    #[must_use]
    pub fn with_default_ttl_secs(mut self, secs: u64) -> Self {
        self.default_ttl_secs = secs;
        self
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_size: 1000,
            default_ttl_secs: 300,
        }
    }
}

/// Statistics for cache performance monitoring
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Number of live entries
    pub entry_count: usize,
    /// Lookups that returned a value
    pub hits: u64,
    /// Lookups that returned nothing (including expired entries)
    pub misses: u64,
    /// Entries dropped to make room for a new key
    pub evictions: u64,
    /// Entries purged because their TTL elapsed
    pub expirations: u64,
    /// Entries removed by prefix invalidation
    pub invalidations: u64,
}

#[derive(Debug)]
struct Entry {
    value: Value,
    expires_at: Instant,
}

#[derive(Debug, Default)]
struct Inner {
    entries: IndexMap<CacheKey, Entry>,
    stats: CacheStats,
    /// Bumped by every invalidation and clear
    epoch: u64,
}

impl Inner {
    fn insert(&mut self, key: &CacheKey, value: Value, expires_at: Instant, max_size: usize) {
        if let Some(index) = self.entries.get_index_of(key) {
            let last = self.entries.len() - 1;
            self.entries.move_index(index, last);
            self.entries[last] = Entry { value, expires_at };
            return;
        }

        if self.entries.len() >= max_size {
            if let Some((evicted, _)) = self.entries.shift_remove_index(0) {
                self.stats.evictions += 1;
                tracing::trace!(key = %evicted, "cache eviction");
            }
        }

        self.entries.insert(key.clone(), Entry { value, expires_at });
        self.stats.entry_count = self.entries.len();
    }
}

/// Bounded TTL + LRU cache for aggregate query results
///
/// One exclusive lock guards the ordered map. The lock is never held across
/// an `.await`; [`QueryCache::get_or_try_insert_with`] computes outside it.
#[derive(Debug)]
pub struct QueryCache {
    config: CacheConfig,
    inner: Mutex<Inner>,
}

impl QueryCache {
    /// Create cache from configuration
    ///
    /// # Errors
    /// Returns error if `max_size` is zero
    pub fn new(config: CacheConfig) -> Result<Self, CacheError> {
        if config.max_size == 0 {
            return Err(CacheError::InvalidConfig(
                "max_size must be greater than zero".to_string(),
            ));
        }
        Ok(Self {
            config,
            inner: Mutex::new(Inner::default()),
        })
    }

    /// Active configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Look up a live entry and mark it most-recently used
    #[must_use]
    pub fn get(&self, key: &CacheKey) -> Option<Value> {
        let now = Instant::now();
        let mut inner = self.inner.lock();

        let Some(index) = inner.entries.get_index_of(key) else {
            inner.stats.misses += 1;
            tracing::trace!(%key, "cache miss");
            return None;
        };

        if inner.entries[index].expires_at <= now {
            inner.entries.shift_remove_index(index);
            inner.stats.expirations += 1;
            inner.stats.misses += 1;
            inner.stats.entry_count = inner.entries.len();
            tracing::trace!(%key, "cache entry expired");
            return None;
        }

        let last = inner.entries.len() - 1;
        inner.entries.move_index(index, last);
        inner.stats.hits += 1;
        tracing::trace!(%key, "cache hit");
        Some(inner.entries[last].value.clone())
    }

    /// Insert or overwrite an entry with an explicit TTL
    pub fn set(&self, key: &CacheKey, value: Value, ttl: Duration) {
        let expires_at = Instant::now() + ttl;
        self.inner
            .lock()
            .insert(key, value, expires_at, self.config.max_size);
    }

    /// Insert or overwrite an entry with the configured default TTL
    #[inline]
    pub fn set_default(&self, key: &CacheKey, value: Value) {
        self.set(key, value, self.config.default_ttl());
    }

    /// Remove every entry whose key starts with `prefix`
    ///
    /// Returns the number of removed entries.
    pub fn invalidate(&self, prefix: &str) -> usize {
        let mut inner = self.inner.lock();
        let before = inner.entries.len();
        inner.entries.retain(|key, _| !key.has_prefix(prefix));
        inner.epoch += 1;
        let removed = before - inner.entries.len();
        inner.stats.invalidations += removed as u64;
        inner.stats.entry_count = inner.entries.len();
        tracing::debug!(prefix, removed, "cache prefix invalidated");
        removed
    }

    /// Typed lookup; an undecodable payload is dropped and reported as a miss
    #[must_use]
    pub fn get_as<T: DeserializeOwned>(&self, key: &CacheKey) -> Option<T> {
        let value = self.get(key)?;
        match serde_json::from_value(value) {
            Ok(typed) => Some(typed),
            Err(error) => {
                tracing::warn!(%key, %error, "dropping undecodable cache entry");
                self.remove(key);
                None
            }
        }
    }

    /// Typed insert
    ///
    /// # Errors
    /// Returns error if `value` cannot be serialized
    pub fn set_as<T: Serialize>(
        &self,
        key: &CacheKey,
        value: &T,
        ttl: Option<Duration>,
    ) -> Result<(), CacheError> {
        let json = serde_json::to_value(value)?;
        self.set(key, json, ttl.unwrap_or_else(|| self.config.default_ttl()));
        Ok(())
    }

    /// Cache-aside read: return the cached value or compute, store and return
    ///
    /// The computation runs without holding the cache lock. Errors from `f`
    /// are returned unchanged and nothing is stored. A value computed while
    /// an invalidation or clear ran is returned but not stored, since it may
    /// have been read before the write that caused the invalidation.
    pub async fn get_or_try_insert_with<T, E, F, Fut>(
        &self,
        key: &CacheKey,
        ttl: Option<Duration>,
        f: F,
    ) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(cached) = self.get_as::<T>(key) {
            return Ok(cached);
        }

        let epoch = self.inner.lock().epoch;
        let computed = f().await?;

        let json = match serde_json::to_value(&computed) {
            Ok(json) => json,
            Err(error) => {
                tracing::warn!(%key, %error, "computed value not cached");
                return Ok(computed);
            }
        };
        let expires_at = Instant::now() + ttl.unwrap_or_else(|| self.config.default_ttl());

        let mut inner = self.inner.lock();
        if inner.epoch == epoch {
            inner.insert(key, json, expires_at, self.config.max_size);
        } else {
            tracing::debug!(%key, "cache invalidated during computation; value not cached");
        }
        drop(inner);

        Ok(computed)
    }

    /// Remove a single entry
    pub fn remove(&self, key: &CacheKey) -> bool {
        let mut inner = self.inner.lock();
        let removed = inner.entries.shift_remove(key).is_some();
        inner.stats.entry_count = inner.entries.len();
        removed
    }

    /// Drop every entry
    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.entries.clear();
        inner.epoch += 1;
        inner.stats.entry_count = 0;
    }

    /// Number of stored entries (expired ones included until touched)
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    /// Check if cache holds no entries
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of cache statistics
    #[inline]
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        self.inner.lock().stats
    }
}

impl Default for QueryCache {
    /// Create cache with default capacity (1000 entries, 300s TTL)
    fn default() -> Self {
        Self {
            config: CacheConfig::default(),
            inner: Mutex::new(Inner::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::CacheScope;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn key(s: &str) -> CacheKey {
        CacheKey::from(s)
    }

    fn small_cache(max_size: usize) -> QueryCache {
        QueryCache::new(CacheConfig::default().with_max_size(max_size)).unwrap()
    }

    #[test]
    fn set_then_get_returns_value() {
        let cache = QueryCache::default();
        cache.set(&key("a"), json!(1), Duration::from_secs(1));
        assert_eq!(cache.get(&key("a")), Some(json!(1)));
    }

    #[test]
    fn missing_key_is_a_miss() {
        let cache = QueryCache::default();
        assert!(cache.get(&key("nope")).is_none());
        assert_eq!(cache.stats().misses, 1);
    }

    #[test]
    fn expired_entry_is_purged() {
        let cache = QueryCache::default();
        cache.set(&key("a"), json!("v"), Duration::from_millis(20));
        assert_eq!(cache.get(&key("a")), Some(json!("v")));

        std::thread::sleep(Duration::from_millis(40));

        assert!(cache.get(&key("a")).is_none());
        assert_eq!(cache.len(), 0);
        assert_eq!(cache.stats().expirations, 1);
    }

    #[test]
    fn overflow_evicts_least_recently_used() {
        let cache = small_cache(2);
        let ttl = Duration::from_secs(60);
        cache.set(&key("a"), json!(1), ttl);
        cache.set(&key("b"), json!(2), ttl);

        // touch "a" so "b" becomes the LRU entry
        assert!(cache.get(&key("a")).is_some());

        cache.set(&key("c"), json!(3), ttl);

        assert!(cache.get(&key("b")).is_none());
        assert!(cache.get(&key("a")).is_some());
        assert!(cache.get(&key("c")).is_some());
        assert_eq!(cache.stats().evictions, 1);
    }

    #[test]
    fn overflow_without_access_evicts_oldest_insert() {
        let cache = small_cache(2);
        let ttl = Duration::from_secs(60);
        cache.set(&key("a"), json!(1), ttl);
        cache.set(&key("b"), json!(2), ttl);
        cache.set(&key("c"), json!(3), ttl);

        assert!(cache.get(&key("a")).is_none());
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn overwrite_refreshes_position_without_eviction() {
        let cache = small_cache(2);
        let ttl = Duration::from_secs(60);
        cache.set(&key("a"), json!(1), ttl);
        cache.set(&key("b"), json!(2), ttl);
        cache.set(&key("a"), json!(10), ttl);
        assert_eq!(cache.stats().evictions, 0);

        cache.set(&key("c"), json!(3), ttl);
        assert!(cache.get(&key("b")).is_none());
        assert_eq!(cache.get(&key("a")), Some(json!(10)));
    }

    #[test]
    fn invalidate_removes_only_matching_prefix() {
        let cache = QueryCache::default();
        let lot = CacheScope::new("lot", "L1");
        let other = CacheScope::new("lot", "L10");
        let item = CacheScope::new("item", "I1");

        let k1 = CacheKey::derive(&lot, "hierarchy", &json!({})).unwrap();
        let k2 = CacheKey::derive(&other, "hierarchy", &json!({})).unwrap();
        let k3 = CacheKey::derive(&item, "preview", &json!({"rule": "BY_ZONE"})).unwrap();
        for k in [&k1, &k2, &k3] {
            cache.set_default(k, json!(true));
        }

        let removed = cache.invalidate(lot.prefix());

        assert_eq!(removed, 1);
        assert!(cache.get(&k1).is_none());
        assert!(cache.get(&k2).is_some());
        assert!(cache.get(&k3).is_some());
        assert_eq!(cache.stats().invalidations, 1);
    }

    #[test]
    fn zero_capacity_is_rejected() {
        let result = QueryCache::new(CacheConfig::default().with_max_size(0));
        assert!(matches!(result, Err(CacheError::InvalidConfig(_))));
    }

    #[test]
    fn typed_roundtrip_and_decode_failure() {
        let cache = QueryCache::default();
        cache.set_as(&key("n"), &vec![1u32, 2, 3], None).unwrap();
        assert_eq!(cache.get_as::<Vec<u32>>(&key("n")), Some(vec![1, 2, 3]));

        // wrong type is dropped
        assert!(cache.get_as::<String>(&key("n")).is_none());
        assert!(cache.get(&key("n")).is_none());
    }

    #[tokio::test]
    async fn get_or_try_insert_with_computes_once() {
        let cache = QueryCache::default();
        let calls = Arc::new(AtomicUsize::new(0));

        for _ in 0..3 {
            let calls = calls.clone();
            let value: Result<String, String> = cache
                .get_or_try_insert_with(&key("k"), None, || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok("computed".to_string())
                })
                .await;
            assert_eq!(value.unwrap(), "computed");
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn get_or_try_insert_with_does_not_cache_errors() {
        let cache = QueryCache::default();
        let result: Result<u32, &str> = cache
            .get_or_try_insert_with(&key("k"), None, || async { Err("boom") })
            .await;
        assert_eq!(result, Err("boom"));
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn value_computed_across_invalidation_is_not_stored() {
        let cache = QueryCache::default();
        let scope = CacheScope::new("item", "I1");
        let k = CacheKey::derive(&scope, "preview", &json!({})).unwrap();

        let value: Result<u32, String> = cache
            .get_or_try_insert_with(&k, None, || async {
                // a writer commits and invalidates while the read is in flight
                cache.invalidate(CacheScope::kind("item").prefix());
                Ok(3)
            })
            .await;

        assert_eq!(value.unwrap(), 3);
        assert!(cache.is_empty());

        let fresh: Result<u32, String> = cache
            .get_or_try_insert_with(&k, None, || async { Ok(2) })
            .await;
        assert_eq!(fresh.unwrap(), 2);
        assert_eq!(cache.get_as::<u32>(&k), Some(2));
    }

    #[tokio::test]
    async fn value_computed_across_clear_is_not_stored() {
        let cache = QueryCache::default();
        let value: Result<u32, String> = cache
            .get_or_try_insert_with(&key("k"), None, || async {
                cache.clear();
                Ok(1)
            })
            .await;
        assert_eq!(value.unwrap(), 1);
        assert!(cache.get(&key("k")).is_none());
    }

    #[test]
    fn clear_empties_cache() {
        let cache = QueryCache::default();
        cache.set_default(&key("a"), json!(1));
        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.stats().entry_count, 0);
    }
}
