//! Cache Contract Module
//!
//! The abstract operations every cache implementation must satisfy, in both
//! blocking and suspend-capable forms, plus the typed convenience surface.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::FutureExt;

use crate::cache::{CacheEntry, CacheKey, CreationResult};
use crate::error::Result;

// == Factory Types ==
/// Blocking factory invoked on a cache miss.
pub type SyncFactory<'a> =
    Box<dyn FnOnce(&CacheKey) -> anyhow::Result<CreationResult> + Send + 'a>;

/// Suspend-capable factory invoked on a cache miss.
///
/// The factory may perform I/O; only the key being created stays exclusive
/// while its future is pending.
pub type AsyncFactory<'a> =
    Box<dyn FnOnce(CacheKey) -> BoxFuture<'static, anyhow::Result<CreationResult>> + Send + 'a>;

// == Create Options ==
/// Per-call options for the create-capable operations.
#[derive(Debug, Clone, Copy, Default)]
pub struct CreateOptions {
    /// Overrides whatever retention policy the factory chooses
    pub ttl_override: Option<Duration>,
    /// Unconditionally invoke the factory and replace any existing entry
    pub force_recreate: bool,
}

impl CreateOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Expire the created entry `ttl` after creation, regardless of the
    /// factory's own policy.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl_override = Some(ttl);
        self
    }

    /// Recreate the entry even if a live one exists.
    pub fn force(mut self) -> Self {
        self.force_recreate = true;
        self
    }
}

// == Cache Contract ==
/// Operations all cache implementations support.
///
/// # Concurrency guarantee
///
/// For a fixed key, when multiple callers invoke a create-capable operation
/// concurrently while no live entry exists, the factory executes exactly
/// once; every caller receives the single produced entry. Callers operating
/// on different keys never block each other. A failing factory releases the
/// per-key exclusive region, so a later call can retry cleanly; a failure
/// never poisons a key.
#[async_trait]
pub trait Cache: Send + Sync {
    /// Read-only lookup. Returns None if the key is absent or its entry has
    /// expired; never takes a creation lock.
    fn find_entry(&self, key: &CacheKey) -> Option<CacheEntry>;

    /// Returns the existing live entry, or invokes `factory`, stores its
    /// result, and returns the new entry.
    ///
    /// Must not be called from within an async runtime; use
    /// [`find_entry_or_create_async`](Self::find_entry_or_create_async) there.
    fn find_entry_or_create(
        &self,
        key: &CacheKey,
        options: CreateOptions,
        factory: SyncFactory<'_>,
    ) -> Result<CacheEntry>;

    /// Suspend-capable form of
    /// [`find_entry_or_create`](Self::find_entry_or_create), with identical
    /// semantics.
    async fn find_entry_or_create_async(
        &self,
        key: &CacheKey,
        options: CreateOptions,
        factory: AsyncFactory<'_>,
    ) -> Result<CacheEntry>;

    /// Unconditionally discards any entry for `key`. A no-op if absent.
    fn remove(&self, key: &CacheKey);

    /// Current number of stored entries.
    fn len(&self) -> usize;

    /// Returns true if no entries are stored.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// == Typed Convenience Surface ==
/// Typed `find_or_create` wrappers over the [`Cache`] contract.
///
/// Blanket-implemented for every `Cache`, including trait objects, so callers
/// swap implementations without touching call sites.
#[async_trait]
pub trait CacheExt: Cache {
    /// Returns the cached value for `key`, computing it with `factory` on a
    /// miss.
    fn find_or_create<T, F>(&self, key: &CacheKey, factory: F) -> Result<Arc<T>>
    where
        T: Send + Sync + 'static,
        F: FnOnce(&CacheKey) -> anyhow::Result<CreationResult> + Send,
    {
        self.find_or_create_with(key, CreateOptions::default(), factory)
    }

    /// [`find_or_create`](Self::find_or_create) with explicit
    /// [`CreateOptions`].
    fn find_or_create_with<T, F>(
        &self,
        key: &CacheKey,
        options: CreateOptions,
        factory: F,
    ) -> Result<Arc<T>>
    where
        T: Send + Sync + 'static,
        F: FnOnce(&CacheKey) -> anyhow::Result<CreationResult> + Send,
    {
        let entry = self.find_entry_or_create(key, options, Box::new(factory))?;
        entry.value::<T>()
    }

    /// Suspend-capable [`find_or_create`](Self::find_or_create).
    async fn find_or_create_async<T, F, Fut>(&self, key: &CacheKey, factory: F) -> Result<Arc<T>>
    where
        T: Send + Sync + 'static,
        F: FnOnce(CacheKey) -> Fut + Send,
        Fut: std::future::Future<Output = anyhow::Result<CreationResult>> + Send + 'static,
    {
        self.find_or_create_with_async(key, CreateOptions::default(), factory)
            .await
    }

    /// Suspend-capable [`find_or_create_with`](Self::find_or_create_with).
    async fn find_or_create_with_async<T, F, Fut>(
        &self,
        key: &CacheKey,
        options: CreateOptions,
        factory: F,
    ) -> Result<Arc<T>>
    where
        T: Send + Sync + 'static,
        F: FnOnce(CacheKey) -> Fut + Send,
        Fut: std::future::Future<Output = anyhow::Result<CreationResult>> + Send + 'static,
    {
        let boxed: AsyncFactory<'_> = Box::new(move |key| factory(key).boxed());
        let entry = self.find_entry_or_create_async(key, options, boxed).await?;
        entry.value::<T>()
    }
}

impl<C: Cache + ?Sized> CacheExt for C {}
