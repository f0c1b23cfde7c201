//! memocache - A lightweight in-process memoization cache
//!
//! Provides keyed, type-erased value caching with TTL expiration, a
//! capacity bound with insertion-order eviction, and a single-flight
//! guarantee: under concurrent access, the value for a given key is
//! computed at most once and shared with every concurrent requester.

pub mod cache;
pub mod config;
pub mod error;

pub use cache::{
    AsyncFactory, BoundedCache, Cache, CacheEntry, CacheExt, CacheKey, CacheStats, CreateOptions,
    CreationResult, KeyBuilder, KeySegment, PassthroughCache, RetentionPolicy, SyncFactory,
};
pub use config::CacheConfig;
pub use error::{CacheError, Result};
