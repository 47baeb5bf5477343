//! An async get-or-compute cache with optional time-to-live.
//!
//! Values are computed outside the lock, so a slow computation for one key
//! never blocks readers of other keys. When two callers race on the same key
//! the first value to be inserted wins and the other is discarded. A value
//! whose computation started before [`TtlCache::invalidate_all`] is returned to
//! its caller but never stored.

use crate::cache::clock::{Clock, SystemClock};
use log::debug;
use std::collections::{hash_map::Entry, HashMap};
use std::fmt::Debug;
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

struct CacheEntry<V> {
    value: V,
    inserted_at: Instant,
}

struct Entries<K, V> {
    map: HashMap<K, CacheEntry<V>>,
    /// Bumped by every `invalidate_all`.
    generation: u64,
}

pub struct TtlCache<K, V> {
    ttl: Option<Duration>,
    clock: Arc<dyn Clock>,
    entries: Mutex<Entries<K, V>>,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone + Debug,
    V: Clone,
{
    /// Entries expire `ttl` after insertion, measured by `clock`.
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            ttl: Some(ttl),
            clock,
            entries: Mutex::new(Entries {
                map: HashMap::new(),
                generation: 0,
            }),
        }
    }

    /// Entries live until [`TtlCache::invalidate_all`].
    pub fn without_expiry() -> Self {
        Self {
            ttl: None,
            clock: Arc::new(SystemClock),
            entries: Mutex::new(Entries {
                map: HashMap::new(),
                generation: 0,
            }),
        }
    }

    fn is_fresh(&self, entry: &CacheEntry<V>, now: Instant) -> bool {
        self.ttl
            .map_or(true, |ttl| now.saturating_duration_since(entry.inserted_at) < ttl)
    }

    /// Returns the cached value for `key` if present and not expired.
    pub async fn get(&self, key: &K) -> Option<V> {
        let now = self.clock.now();
        let mut entries = self.entries.lock().await;
        match entries.map.get(key) {
            Some(entry) if self.is_fresh(entry, now) => Some(entry.value.clone()),
            Some(_) => {
                debug!("Cache entry for {:?} expired", key);
                entries.map.remove(key);
                None
            }
            None => None,
        }
    }

    /// Returns the cached value for `key`, computing and storing it on a miss.
    ///
    /// Errors from `compute` are returned as-is and nothing is cached.
    pub async fn get_or_try_compute<F, Fut, E>(&self, key: K, compute: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        // Fast path
        if let Some(value) = self.get(&key).await {
            return Ok(value);
        }
        let generation = self.entries.lock().await.generation;

        // Slow path, outside the lock
        let computed = compute().await?;

        let now = self.clock.now();
        let mut entries = self.entries.lock().await;
        if entries.generation != generation {
            debug!("Cache invalidated while computing {:?}, not storing", key);
            return Ok(computed);
        }
        match entries.map.entry(key) {
            Entry::Occupied(entry) if self.is_fresh(entry.get(), now) => {
                // Someone else filled it while we were computing.
                Ok(entry.get().value.clone())
            }
            Entry::Occupied(mut entry) => {
                entry.insert(CacheEntry {
                    value: computed.clone(),
                    inserted_at: now,
                });
                Ok(computed)
            }
            Entry::Vacant(entry) => {
                entry.insert(CacheEntry {
                    value: computed.clone(),
                    inserted_at: now,
                });
                Ok(computed)
            }
        }
    }

    /// Drops every entry. Returns how many were held.
    pub async fn invalidate_all(&self) -> usize {
        let mut entries = self.entries.lock().await;
        let count = entries.map.len();
        entries.map.clear();
        entries.generation += 1;
        count
    }

    /// Number of held entries, including expired ones not yet evicted.
    pub async fn len(&self) -> usize {
        self.entries.lock().await.map.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.map.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::clock::ManualClock;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Notify;

    fn counting_compute(
        calls: &AtomicUsize,
        value: u32,
    ) -> impl Future<Output = Result<u32, String>> + '_ {
        async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(value)
        }
    }

    #[tokio::test]
    async fn test_second_lookup_hits_cache() {
        let cache: TtlCache<String, u32> = TtlCache::without_expiry();
        let calls = AtomicUsize::new(0);

        let a = cache
            .get_or_try_compute("k".to_string(), || counting_compute(&calls, 7))
            .await;
        let b = cache
            .get_or_try_compute("k".to_string(), || counting_compute(&calls, 8))
            .await;

        assert_eq!(a, Ok(7));
        assert_eq!(b, Ok(7));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_entries_expire_after_ttl() {
        let clock = Arc::new(ManualClock::new());
        let cache: TtlCache<&str, u32> = TtlCache::new(Duration::from_secs(3600), clock.clone());
        let calls = AtomicUsize::new(0);

        cache.get_or_try_compute("k", || counting_compute(&calls, 1)).await.unwrap();
        clock.advance(Duration::from_secs(3599));
        assert_eq!(cache.get(&"k").await, Some(1));

        clock.advance(Duration::from_secs(1));
        assert_eq!(cache.get(&"k").await, None);
        let refreshed = cache.get_or_try_compute("k", || counting_compute(&calls, 2)).await;
        assert_eq!(refreshed, Ok(2));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_errors_are_not_cached() {
        let cache: TtlCache<&str, u32> = TtlCache::without_expiry();
        let failed = cache
            .get_or_try_compute("k", || async { Err::<u32, _>("boom".to_string()) })
            .await;
        assert_eq!(failed, Err("boom".to_string()));
        assert!(cache.is_empty().await);

        let ok = cache.get_or_try_compute("k", || async { Ok::<_, String>(3) }).await;
        assert_eq!(ok, Ok(3));
    }

    #[tokio::test]
    async fn test_invalidate_all_forces_recompute() {
        let cache: TtlCache<u8, u32> = TtlCache::without_expiry();
        let calls = AtomicUsize::new(0);
        for key in 0..3 {
            cache.get_or_try_compute(key, || counting_compute(&calls, 0)).await.unwrap();
        }
        assert_eq!(cache.invalidate_all().await, 3);
        assert_eq!(cache.len().await, 0);

        cache.get_or_try_compute(0, || counting_compute(&calls, 0)).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_value_computed_across_invalidation_is_not_stored() {
        let cache: Arc<TtlCache<&str, u32>> = Arc::new(TtlCache::without_expiry());
        let started = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());

        let in_flight = tokio::spawn({
            let cache = Arc::clone(&cache);
            let started = Arc::clone(&started);
            let release = Arc::clone(&release);
            async move {
                cache
                    .get_or_try_compute("k", || async move {
                        started.notify_one();
                        release.notified().await;
                        Ok::<_, String>(1)
                    })
                    .await
            }
        });

        started.notified().await;
        cache.invalidate_all().await;
        release.notify_one();

        assert_eq!(in_flight.await.unwrap(), Ok(1));
        assert_eq!(cache.get(&"k").await, None);
        let fresh = cache.get_or_try_compute("k", || async { Ok::<_, String>(2) }).await;
        assert_eq!(fresh, Ok(2));
    }
}
