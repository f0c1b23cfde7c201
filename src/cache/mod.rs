//! Cache Module
//!
//! Provides in-process caching with TTL expiration, bounded capacity, and
//! single-flight creation.

mod bounded;
mod contract;
mod entry;
mod key;
mod locks;
mod order;
mod passthrough;
mod stats;


// Re-export public types
pub use bounded::BoundedCache;
pub use contract::{AsyncFactory, Cache, CacheExt, CreateOptions, SyncFactory};
pub use entry::{CacheEntry, CreationResult, RetentionPolicy};
pub use key::{CacheKey, KeyBuilder, KeySegment};
pub use passthrough::PassthroughCache;
pub use stats::CacheStats;
