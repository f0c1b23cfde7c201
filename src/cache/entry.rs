//! Cache Entry Module
//!
//! Defines retention policies and the structure for individual cache entries.

use std::any::Any;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::error::{CacheError, Result};

// == Retention Policy ==
/// Describes how long a cached value remains valid.
///
/// A policy either expires the value a fixed duration after creation, or
/// retains it until capacity eviction or explicit removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RetentionPolicy {
    ttl: Option<Duration>,
}

impl RetentionPolicy {
    /// Policy that expires the value `ttl` after creation.
    pub fn expires_after(ttl: Duration) -> Self {
        Self { ttl: Some(ttl) }
    }

    /// Policy with no time-based expiry.
    pub fn keep_forever() -> Self {
        Self { ttl: None }
    }

    /// The TTL, if one is set.
    pub fn ttl(&self) -> Option<Duration> {
        self.ttl
    }
}

// == Creation Result ==
/// What a factory produces on a cache miss.
///
/// Pairs the computed value with an optional [`RetentionPolicy`] chosen at
/// creation time, so different keys may carry different TTLs even though the
/// policy is not known until the value is computed.
pub struct CreationResult {
    value: Arc<dyn Any + Send + Sync>,
    stored_type: &'static str,
    policy: Option<RetentionPolicy>,
}

impl CreationResult {
    /// Wraps a computed value with no retention policy.
    pub fn of<T: Send + Sync + 'static>(value: T) -> Self {
        Self {
            value: Arc::new(value),
            stored_type: std::any::type_name::<T>(),
            policy: None,
        }
    }

    /// Attaches a TTL measured from the entry's creation time.
    pub fn expires_after(mut self, ttl: Duration) -> Self {
        self.policy = Some(RetentionPolicy::expires_after(ttl));
        self
    }

    /// Attaches an explicit retention policy.
    pub fn with_policy(mut self, policy: RetentionPolicy) -> Self {
        self.policy = Some(policy);
        self
    }
}

impl fmt::Debug for CreationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CreationResult")
            .field("stored_type", &self.stored_type)
            .field("policy", &self.policy)
            .finish()
    }
}

// == Cache Entry ==
/// A computed value together with its creation time and retention policy.
///
/// Entries are immutable; a refresh replaces the whole entry. The value is
/// type-erased so entries of arbitrary types can share one store; retrieval
/// goes through the typed [`value`](CacheEntry::value) accessor.
#[derive(Clone)]
pub struct CacheEntry {
    value: Arc<dyn Any + Send + Sync>,
    stored_type: &'static str,
    /// Creation timestamp (Unix milliseconds)
    created_at: u64,
    policy: RetentionPolicy,
}

impl CacheEntry {
    /// Creates an entry holding `value` under the given policy.
    pub fn new<T: Send + Sync + 'static>(value: T, policy: RetentionPolicy) -> Self {
        Self {
            value: Arc::new(value),
            stored_type: std::any::type_name::<T>(),
            created_at: current_timestamp_ms(),
            policy,
        }
    }

    /// Builds an entry from a factory's [`CreationResult`].
    ///
    /// TTL precedence: an explicit `ttl_override` wins over the factory's
    /// policy, which wins over the cache-wide `default_ttl`. With none of the
    /// three, the entry never expires.
    pub(crate) fn from_creation(
        result: CreationResult,
        ttl_override: Option<Duration>,
        default_ttl: Option<Duration>,
    ) -> Self {
        let policy = match ttl_override {
            Some(ttl) => RetentionPolicy::expires_after(ttl),
            None => result
                .policy
                .unwrap_or(RetentionPolicy { ttl: default_ttl }),
        };

        Self {
            value: result.value,
            stored_type: result.stored_type,
            created_at: current_timestamp_ms(),
            policy,
        }
    }

    /// Returns the stored value as a `T`.
    ///
    /// Fails with [`CacheError::TypeMismatch`] if the entry holds a value of
    /// a different type; it never silently returns a default.
    pub fn value<T: Send + Sync + 'static>(&self) -> Result<Arc<T>> {
        Arc::clone(&self.value)
            .downcast::<T>()
            .map_err(|_| CacheError::TypeMismatch {
                expected: std::any::type_name::<T>(),
                actual: self.stored_type,
            })
    }

    // == Is Expired ==
    /// Checks if the entry has expired.
    ///
    /// Evaluated lazily on every access rather than maintained by a timer.
    /// An entry with a TTL is expired once the current time reaches
    /// creation time + TTL; an entry without a TTL never expires.
    pub fn is_expired(&self) -> bool {
        match self.expires_at() {
            Some(expires) => current_timestamp_ms() >= expires,
            None => false,
        }
    }

    /// Creation timestamp in Unix milliseconds.
    pub fn created_at_ms(&self) -> u64 {
        self.created_at
    }

    /// The entry's retention policy.
    pub fn policy(&self) -> RetentionPolicy {
        self.policy
    }

    /// Returns remaining TTL, or None if no expiration is set.
    ///
    /// Returns a zero duration once the entry has expired.
    pub fn ttl_remaining(&self) -> Option<Duration> {
        self.expires_at().map(|expires| {
            let now = current_timestamp_ms();
            Duration::from_millis(expires.saturating_sub(now))
        })
    }

    fn expires_at(&self) -> Option<u64> {
        self.policy
            .ttl()
            .map(|ttl| self.created_at + ttl.as_millis() as u64)
    }
}

impl fmt::Debug for CacheEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheEntry")
            .field("stored_type", &self.stored_type)
            .field("created_at", &self.created_at)
            .field("policy", &self.policy)
            .finish()
    }
}

// == Utility Functions ==
/// Returns current Unix timestamp in milliseconds.
pub(crate) fn current_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("Time went backwards")
        .as_millis() as u64
}
