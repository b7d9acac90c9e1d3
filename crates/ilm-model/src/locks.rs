//! Per-key advisory locks
//!
//! Serializes read-check-write sequences that touch the same lot or item
//! while leaving unrelated keys fully concurrent. A key's entry lives only
//! while some task holds or waits for it; the last guard to drop removes it.

use dashmap::DashMap;
use std::hash::Hash;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Map of lazily created async mutexes keyed by `K`
#[derive(Debug)]
pub struct KeyedLocks<K>
where
    K: Eq + Hash,
{
    locks: DashMap<K, Arc<Mutex<()>>>,
}

impl<K> KeyedLocks<K>
where
    K: Eq + Hash + Clone,
{
    /// Create empty lock map
    #[must_use]
    pub fn new() -> Self {
        Self {
            locks: DashMap::new(),
        }
    }

    /// Wait for exclusive access to `key`
    ///
    /// The returned guard releases the key when dropped.
    pub async fn lock(&self, key: &K) -> KeyedLockGuard<'_, K> {
        // Clone the Arc out so no DashMap shard lock is held across await
        let mutex = self
            .locks
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let guard = mutex.lock_owned().await;
        KeyedLockGuard {
            locks: &self.locks,
            key: key.clone(),
            guard: Some(guard),
        }
    }

    /// Number of keys currently held or awaited
    #[must_use]
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    /// Check if no key is held or awaited
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

impl<K> Default for KeyedLocks<K>
where
    K: Eq + Hash + Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

/// Exclusive access to one key of a [`KeyedLocks`]
#[must_use = "the key is released as soon as the guard is dropped"]
pub struct KeyedLockGuard<'a, K>
where
    K: Eq + Hash,
{
    locks: &'a DashMap<K, Arc<Mutex<()>>>,
    key: K,
    guard: Option<OwnedMutexGuard<()>>,
}

impl<K> std::fmt::Debug for KeyedLockGuard<'_, K>
where
    K: Eq + Hash + std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyedLockGuard").field("key", &self.key).finish()
    }
}

impl<K> Drop for KeyedLockGuard<'_, K>
where
    K: Eq + Hash,
{
    fn drop(&mut self) {
        // The owned guard holds its own Arc; release it first so a count of
        // one means only the map still references the mutex. Waiters clone
        // the Arc under the shard lock, so they keep the entry alive.
        drop(self.guard.take());
        self.locks
            .remove_if(&self.key, |_, mutex| Arc::strong_count(mutex) == 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn same_key_is_exclusive() {
        let locks = Arc::new(KeyedLocks::<String>::new());
        let key = "lot-1".to_string();

        let guard = locks.lock(&key).await;
        let contender = {
            let locks = Arc::clone(&locks);
            let key = key.clone();
            tokio::spawn(async move {
                let _guard = locks.lock(&key).await;
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!contender.is_finished());

        drop(guard);
        contender.await.unwrap();
    }

    #[tokio::test]
    async fn different_keys_do_not_block() {
        let locks = KeyedLocks::<String>::new();
        let _a = locks.lock(&"a".to_string()).await;
        let _b = tokio::time::timeout(Duration::from_millis(50), locks.lock(&"b".to_string()))
            .await
            .expect("independent key should lock immediately");
        assert_eq!(locks.len(), 2);
    }

    #[tokio::test]
    async fn released_keys_are_removed() {
        let locks = KeyedLocks::<String>::new();
        for i in 0..100 {
            let _guard = locks.lock(&format!("lot-{i}")).await;
            assert_eq!(locks.len(), 1);
        }
        assert!(locks.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn entry_survives_while_contended() {
        let locks = Arc::new(KeyedLocks::<String>::new());
        let key = "item-1".to_string();
        let counter = Arc::new(std::sync::atomic::AtomicUsize::new(0));

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let locks = Arc::clone(&locks);
                let key = key.clone();
                let counter = Arc::clone(&counter);
                tokio::spawn(async move {
                    let _guard = locks.lock(&key).await;
                    let seen = counter.load(std::sync::atomic::Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(1)).await;
                    counter.store(seen + 1, std::sync::atomic::Ordering::SeqCst);
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(counter.load(std::sync::atomic::Ordering::SeqCst), 16);
        assert!(locks.is_empty());
    }
}
