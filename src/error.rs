//! Error types for the cache
//!
//! Provides unified error handling using thiserror.

use thiserror::Error;

use crate::cache::CacheKey;

// == Cache Error Enum ==
/// Unified error type for the cache.
#[derive(Error, Debug)]
pub enum CacheError {
    /// The stored value could not be converted to the requested type
    #[error("requested type `{expected}` but stored value is `{actual}`")]
    TypeMismatch {
        /// Type the caller asked for
        expected: &'static str,
        /// Type the entry actually holds
        actual: &'static str,
    },

    /// A factory invocation failed while creating an entry
    ///
    /// The original error is carried unchanged as the source, so callers can
    /// downcast it back to their own error type.
    #[error("factory for key {key} failed: {source}")]
    Factory {
        /// Key the factory was invoked for
        key: CacheKey,
        /// The factory's own error
        #[source]
        source: anyhow::Error,
    },
}

// == Result Type Alias ==
/// Convenience Result type for the cache.
pub type Result<T> = std::result::Result<T, CacheError>;
