//! Passthrough Cache Module
//!
//! A no-op implementation of the cache contract that always recomputes.
//! Exists so callers can disable caching by swapping implementations, with
//! no branching at call sites.

use async_trait::async_trait;
use tracing::trace;

use crate::cache::{
    AsyncFactory, Cache, CacheEntry, CacheKey, CreateOptions, SyncFactory,
};
use crate::error::{CacheError, Result};

// == Passthrough Cache ==
/// Cache that never persists anything.
///
/// Every create-capable call invokes the factory, wraps the result, and
/// returns it without storing it, so repeated calls with an identical key
/// each recompute.
#[derive(Debug, Default)]
pub struct PassthroughCache;

impl PassthroughCache {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Cache for PassthroughCache {
    fn find_entry(&self, _key: &CacheKey) -> Option<CacheEntry> {
        None
    }

    fn find_entry_or_create(
        &self,
        key: &CacheKey,
        options: CreateOptions,
        factory: SyncFactory<'_>,
    ) -> Result<CacheEntry> {
        trace!(%key, "passthrough create");
        let created = factory(key).map_err(|source| CacheError::Factory {
            key: key.clone(),
            source,
        })?;
        Ok(CacheEntry::from_creation(created, options.ttl_override, None))
    }

    async fn find_entry_or_create_async(
        &self,
        key: &CacheKey,
        options: CreateOptions,
        factory: AsyncFactory<'_>,
    ) -> Result<CacheEntry> {
        trace!(%key, "passthrough create");
        let created = factory(key.clone())
            .await
            .map_err(|source| CacheError::Factory {
                key: key.clone(),
                source,
            })?;
        Ok(CacheEntry::from_creation(created, options.ttl_override, None))
    }

    fn remove(&self, _key: &CacheKey) {}

    fn len(&self) -> usize {
        0
    }
}
