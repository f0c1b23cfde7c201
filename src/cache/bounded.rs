//! Bounded Cache Module
//!
//! The production cache: a capacity-bounded, insertion-ordered store with
//! per-key single-flight creation and lazy TTL expiration.

use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use tracing::{debug, trace};

use crate::cache::locks::KeyLockRegistry;
use crate::cache::order::InsertionOrder;
use crate::cache::stats::StatsRecorder;
use crate::cache::{
    AsyncFactory, Cache, CacheEntry, CacheKey, CacheStats, CreateOptions, CreationResult,
    SyncFactory,
};
use crate::config::CacheConfig;
use crate::error::{CacheError, Result};

// == Bounded Cache ==
/// Capacity-bounded concurrent cache with single-flight creation.
///
/// The key-to-entry map and its insertion-order tracker are guarded by one
/// read-write lock held only for short, synchronous sections; factory
/// executions run outside it, under a per-key exclusive region, so insert and
/// evict bookkeeping never serializes unrelated creations.
///
/// When inserting would push the store over capacity, the single
/// oldest-inserted entry is evicted first. Eviction is strictly
/// insertion-ordered, not LRU: reads never reorder keys.
///
/// Expired entries are treated as absent on lookup and replaced on the next
/// miss; there is no background sweeper.
#[derive(Debug)]
pub struct BoundedCache {
    /// Key-entry storage plus insertion order, under one short-lived lock
    inner: RwLock<Inner>,
    /// Per-key creation locks
    locks: KeyLockRegistry,
    /// Performance statistics
    stats: StatsRecorder,
    /// Maximum number of entries allowed
    max_entries: usize,
    /// TTL applied when neither the caller nor the factory chooses a policy
    default_ttl: Option<Duration>,
}

#[derive(Debug, Default)]
struct Inner {
    entries: FxHashMap<CacheKey, CacheEntry>,
    order: InsertionOrder,
}

impl BoundedCache {
    // == Constructors ==
    /// Creates a cache holding at most `max_entries` entries.
    ///
    /// A capacity of zero is clamped to one.
    pub fn new(max_entries: usize) -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
            locks: KeyLockRegistry::new(),
            stats: StatsRecorder::default(),
            max_entries: max_entries.max(1),
            default_ttl: None,
        }
    }

    /// Creates a cache that applies `default_ttl` to entries whose factory
    /// specifies no retention policy.
    pub fn with_default_ttl(max_entries: usize, default_ttl: Duration) -> Self {
        Self {
            default_ttl: Some(default_ttl),
            ..Self::new(max_entries)
        }
    }

    /// Creates a cache from a [`CacheConfig`].
    pub fn from_config(config: &CacheConfig) -> Self {
        Self {
            default_ttl: config.default_ttl,
            ..Self::new(config.max_entries)
        }
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        self.stats.snapshot(self.len())
    }

    /// Looks up a live (present and unexpired) entry without touching stats.
    fn live_entry(&self, key: &CacheKey) -> Option<CacheEntry> {
        let inner = self.inner.read();
        inner
            .entries
            .get(key)
            .filter(|entry| !entry.is_expired())
            .cloned()
    }

    /// Inserts or replaces an entry, evicting the oldest-inserted entry
    /// first when the insert would exceed capacity.
    fn insert_entry(&self, key: &CacheKey, entry: CacheEntry) {
        let mut inner = self.inner.write();

        let replacing = inner.entries.contains_key(key);
        if !replacing && inner.entries.len() >= self.max_entries {
            if let Some(oldest) = inner.order.pop_oldest() {
                inner.entries.remove(&oldest);
                self.stats.record_eviction();
                debug!(key = %oldest, "evicted oldest-inserted entry at capacity");
            }
        }

        inner.entries.insert(key.clone(), entry);
        inner.order.record(key);
    }

    /// Shared tail of both create paths: checks for a winner's entry, then
    /// builds and stores the factory result.
    fn store_creation(
        &self,
        key: &CacheKey,
        options: CreateOptions,
        created: anyhow::Result<CreationResult>,
    ) -> Result<CacheEntry> {
        let created = created.map_err(|source| CacheError::Factory {
            key: key.clone(),
            source,
        })?;

        let entry = CacheEntry::from_creation(created, options.ttl_override, self.default_ttl);
        self.insert_entry(key, entry.clone());
        self.stats.record_creation();
        debug!(%key, "created cache entry");
        Ok(entry)
    }
}

#[async_trait]
impl Cache for BoundedCache {
    // == Find Entry ==
    fn find_entry(&self, key: &CacheKey) -> Option<CacheEntry> {
        match self.live_entry(key) {
            Some(entry) => {
                self.stats.record_hit();
                trace!(%key, "cache hit");
                Some(entry)
            }
            None => {
                self.stats.record_miss();
                trace!(%key, "cache miss");
                None
            }
        }
    }

    // == Find Entry Or Create (blocking) ==
    fn find_entry_or_create(
        &self,
        key: &CacheKey,
        options: CreateOptions,
        factory: SyncFactory<'_>,
    ) -> Result<CacheEntry> {
        // Fast path: live entry, no creation lock
        if !options.force_recreate {
            if let Some(entry) = self.live_entry(key) {
                self.stats.record_hit();
                return Ok(entry);
            }
        }

        // Exclusive region for this key only; released on every exit path
        let _key_guard = self.locks.acquire_blocking(key);

        // Double-checked creation: another caller may have just finished
        if !options.force_recreate {
            if let Some(entry) = self.live_entry(key) {
                self.stats.record_hit();
                return Ok(entry);
            }
        }

        self.stats.record_miss();
        self.store_creation(key, options, factory(key))
    }

    // == Find Entry Or Create (async) ==
    async fn find_entry_or_create_async(
        &self,
        key: &CacheKey,
        options: CreateOptions,
        factory: AsyncFactory<'_>,
    ) -> Result<CacheEntry> {
        if !options.force_recreate {
            if let Some(entry) = self.live_entry(key) {
                self.stats.record_hit();
                return Ok(entry);
            }
        }

        // Only this key stays exclusive while the factory is pending
        let _key_guard = self.locks.acquire(key).await;

        if !options.force_recreate {
            if let Some(entry) = self.live_entry(key) {
                self.stats.record_hit();
                return Ok(entry);
            }
        }

        self.stats.record_miss();
        let created = factory(key.clone()).await;
        self.store_creation(key, options, created)
    }

    // == Remove ==
    fn remove(&self, key: &CacheKey) {
        let mut inner = self.inner.write();
        if inner.entries.remove(key).is_some() {
            inner.order.remove(key);
            debug!(%key, "removed cache entry");
        }
    }

    // == Length ==
    fn len(&self) -> usize {
        self.inner.read().entries.len()
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheExt, CreationResult};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::thread::sleep;

    fn key(text: &str) -> CacheKey {
        CacheKey::from_raw(text)
    }

    #[test]
    fn test_cache_new() {
        let cache = BoundedCache::new(100);
        assert_eq!(cache.len(), 0);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_miss_then_hit() {
        let cache = BoundedCache::new(100);
        let calls = AtomicUsize::new(0);

        let first: Arc<String> = cache
            .find_or_create(&key("k"), |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(CreationResult::of("value".to_string()))
            })
            .unwrap();
        let second: Arc<String> = cache
            .find_or_create(&key("k"), |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(CreationResult::of("other".to_string()))
            })
            .unwrap();

        assert_eq!(*first, "value");
        assert_eq!(*second, "value", "hit must return the cached value");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_find_entry_absent() {
        let cache = BoundedCache::new(100);
        assert!(cache.find_entry(&key("nonexistent")).is_none());
    }

    #[test]
    fn test_remove() {
        let cache = BoundedCache::new(100);

        cache
            .find_or_create::<String, _>(&key("k"), |_| {
                Ok(CreationResult::of("value".to_string()))
            })
            .unwrap();
        assert_eq!(cache.len(), 1);

        cache.remove(&key("k"));

        assert_eq!(cache.len(), 0);
        assert!(cache.find_entry(&key("k")).is_none());
    }

    #[test]
    fn test_remove_nonexistent_is_noop() {
        let cache = BoundedCache::new(100);
        cache.remove(&key("nonexistent"));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_force_recreate_replaces_live_entry() {
        let cache = BoundedCache::new(100);

        cache
            .find_or_create::<u32, _>(&key("k"), |_| Ok(CreationResult::of(1_u32)))
            .unwrap();
        let replaced: Arc<u32> = cache
            .find_or_create_with(&key("k"), CreateOptions::new().force(), |_| {
                Ok(CreationResult::of(2_u32))
            })
            .unwrap();

        assert_eq!(*replaced, 2);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_ttl_expiration() {
        let cache = BoundedCache::new(100);

        cache
            .find_or_create_with::<String, _>(
                &key("k"),
                CreateOptions::new().with_ttl(Duration::from_millis(50)),
                |_| Ok(CreationResult::of("value".to_string())),
            )
            .unwrap();

        assert!(cache.find_entry(&key("k")).is_some());

        sleep(Duration::from_millis(80));

        assert!(
            cache.find_entry(&key("k")).is_none(),
            "expired entry must read as absent"
        );
    }

    #[test]
    fn test_expired_entry_recomputed() {
        let cache = BoundedCache::new(100);
        let calls = AtomicUsize::new(0);

        let factory = |calls: &AtomicUsize| -> anyhow::Result<CreationResult> {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(CreationResult::of("value".to_string()))
        };

        cache
            .find_or_create_with::<String, _>(
                &key("k"),
                CreateOptions::new().with_ttl(Duration::from_millis(30)),
                |_| factory(&calls),
            )
            .unwrap();

        sleep(Duration::from_millis(60));

        cache
            .find_or_create_with::<String, _>(
                &key("k"),
                CreateOptions::new().with_ttl(Duration::from_millis(30)),
                |_| factory(&calls),
            )
            .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2, "expired entry must be recomputed");
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_capacity_eviction_oldest_first() {
        let cache = BoundedCache::new(3);

        for name in ["key1", "key2", "key3", "key4"] {
            cache
                .find_or_create::<String, _>(&key(name), move |_| {
                    Ok(CreationResult::of(name.to_string()))
                })
                .unwrap();
        }

        assert_eq!(cache.len(), 3);
        assert!(cache.find_entry(&key("key1")).is_none(), "oldest must be evicted");
        assert!(cache.find_entry(&key("key2")).is_some());
        assert!(cache.find_entry(&key("key3")).is_some());
        assert!(cache.find_entry(&key("key4")).is_some());
    }

    #[test]
    fn test_reads_do_not_affect_eviction_order() {
        let cache = BoundedCache::new(3);

        for name in ["key1", "key2", "key3"] {
            cache
                .find_or_create::<String, _>(&key(name), move |_| {
                    Ok(CreationResult::of(name.to_string()))
                })
                .unwrap();
        }

        // Reading key1 must not save it: eviction is insertion-ordered
        cache.find_entry(&key("key1")).unwrap();

        cache
            .find_or_create::<String, _>(&key("key4"), |_| {
                Ok(CreationResult::of("key4".to_string()))
            })
            .unwrap();

        assert!(cache.find_entry(&key("key1")).is_none());
        assert!(cache.find_entry(&key("key2")).is_some());
    }

    #[test]
    fn test_replacement_re_records_insertion_order() {
        let cache = BoundedCache::new(3);

        for name in ["key1", "key2", "key3"] {
            cache
                .find_or_create::<String, _>(&key(name), move |_| {
                    Ok(CreationResult::of(name.to_string()))
                })
                .unwrap();
        }

        // Recreating key1 makes it the newest insertion
        cache
            .find_or_create_with::<String, _>(&key("key1"), CreateOptions::new().force(), |_| {
                Ok(CreationResult::of("fresh".to_string()))
            })
            .unwrap();

        cache
            .find_or_create::<String, _>(&key("key4"), |_| {
                Ok(CreationResult::of("key4".to_string()))
            })
            .unwrap();

        assert!(cache.find_entry(&key("key2")).is_none(), "key2 is now oldest");
        assert!(cache.find_entry(&key("key1")).is_some());
    }

    #[test]
    fn test_factory_failure_propagates_and_stores_nothing() {
        let cache = BoundedCache::new(100);

        let result = cache.find_or_create::<String, _>(&key("k"), |_| {
            Err(anyhow::anyhow!("backend unavailable"))
        });

        assert!(matches!(result, Err(CacheError::Factory { .. })));
        assert_eq!(cache.len(), 0);

        // The key is not poisoned: a succeeding factory works immediately
        let value: Arc<String> = cache
            .find_or_create(&key("k"), |_| Ok(CreationResult::of("ok".to_string())))
            .unwrap();
        assert_eq!(*value, "ok");
    }

    #[test]
    fn test_type_mismatch_on_retrieval() {
        let cache = BoundedCache::new(100);

        cache
            .find_or_create::<u64, _>(&key("k"), |_| Ok(CreationResult::of(42_u64)))
            .unwrap();

        let result = cache.find_or_create::<String, _>(&key("k"), |_| {
            Ok(CreationResult::of("unused".to_string()))
        });
        assert!(matches!(result, Err(CacheError::TypeMismatch { .. })));
    }

    #[test]
    fn test_stats() {
        let cache = BoundedCache::new(100);

        cache
            .find_or_create::<u32, _>(&key("k"), |_| Ok(CreationResult::of(1_u32)))
            .unwrap();
        cache.find_entry(&key("k")).unwrap(); // hit
        cache.find_entry(&key("other")); // miss

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 2, "initial create counts one miss");
        assert_eq!(stats.creations, 1);
        assert_eq!(stats.total_entries, 1);
    }

    #[test]
    fn test_from_config() {
        let config = CacheConfig {
            max_entries: 2,
            default_ttl: Some(Duration::from_millis(40)),
        };
        let cache = BoundedCache::from_config(&config);

        cache
            .find_or_create::<u32, _>(&key("k"), |_| Ok(CreationResult::of(1_u32)))
            .unwrap();

        sleep(Duration::from_millis(70));

        assert!(
            cache.find_entry(&key("k")).is_none(),
            "default TTL from config must apply"
        );
    }

    #[tokio::test]
    async fn test_async_miss_then_hit() {
        let cache = BoundedCache::new(100);
        let calls = Arc::new(AtomicUsize::new(0));

        for _ in 0..2 {
            let calls = Arc::clone(&calls);
            let value: Arc<String> = cache
                .find_or_create_async(&key("k"), move |_| async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(CreationResult::of("value".to_string()))
                })
                .await
                .unwrap();
            assert_eq!(*value, "value");
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_async_factory_failure_recovers() {
        let cache = BoundedCache::new(100);

        let failed = cache
            .find_or_create_async::<String, _, _>(&key("k"), |_| async {
                Err(anyhow::anyhow!("boom"))
            })
            .await;
        assert!(matches!(failed, Err(CacheError::Factory { .. })));

        let value: Arc<String> = cache
            .find_or_create_async(&key("k"), |_| async {
                Ok(CreationResult::of("recovered".to_string()))
            })
            .await
            .unwrap();
        assert_eq!(*value, "recovered");
    }
}
