//! Per-Key Lock Registry
//!
//! Provides the per-key exclusive region used on the creation path. Locks are
//! created lazily on first acquisition and reclaimed once the last holder
//! releases, so the registry does not grow without bound as distinct keys
//! churn through the cache.
//!
//! The registry's own map is guarded by a `parking_lot::Mutex` held only for
//! map bookkeeping, never while a factory runs; unrelated keys therefore
//! never serialize each other's creations.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::cache::CacheKey;

type LockHandle = Arc<AsyncMutex<()>>;

// == Key Lock Registry ==
#[derive(Debug, Default)]
pub(crate) struct KeyLockRegistry {
    locks: Mutex<HashMap<CacheKey, LockHandle>>,
}

impl KeyLockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquires the exclusive region for `key`, suspending if another caller
    /// holds it. The returned guard releases on drop, on every exit path.
    pub async fn acquire(&self, key: &CacheKey) -> KeyGuard<'_> {
        let guard = self.handle(key).lock_owned().await;
        KeyGuard {
            registry: self,
            key: key.clone(),
            guard: Some(guard),
        }
    }

    /// Blocking variant of [`acquire`](Self::acquire).
    ///
    /// Must not be called from within an async runtime; use `acquire` there.
    pub fn acquire_blocking(&self, key: &CacheKey) -> KeyGuard<'_> {
        let guard = self.handle(key).blocking_lock_owned();
        KeyGuard {
            registry: self,
            key: key.clone(),
            guard: Some(guard),
        }
    }

    /// Returns the lock handle for `key`, creating it lazily.
    fn handle(&self, key: &CacheKey) -> LockHandle {
        self.locks
            .lock()
            .entry(key.clone())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }

    /// Drops the stored handle if no caller still references it.
    ///
    /// Runs under the registry mutex, so a concurrent `handle()` call either
    /// clones the handle before the check (strong count > 1, kept) or finds
    /// the slot vacated and creates a fresh lock that nobody else holds. A
    /// held guard always pins a strong count above 1, so a lock is never
    /// reclaimed while its exclusive region is occupied.
    fn release(&self, key: &CacheKey) {
        let mut locks = self.locks.lock();
        if let Some(stored) = locks.get(key) {
            if Arc::strong_count(stored) == 1 {
                locks.remove(key);
            }
        }
    }

    /// Number of live lock handles. Exposed for tests.
    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.locks.lock().len()
    }
}

// == Key Guard ==
/// RAII guard over one key's exclusive region.
pub(crate) struct KeyGuard<'a> {
    registry: &'a KeyLockRegistry,
    key: CacheKey,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for KeyGuard<'_> {
    fn drop(&mut self) {
        // Release the mutex (and its Arc) before the reclamation check
        self.guard.take();
        self.registry.release(&self.key);
    }
}
