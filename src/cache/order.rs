//! Insertion Order Module
//!
//! Tracks the order in which keys were inserted, for capacity eviction.
//!
//! Eviction is strictly oldest-inserted-first. Reads never reorder keys;
//! only inserting (or replacing) an entry records a new position.

use std::collections::VecDeque;

use crate::cache::CacheKey;

// == Insertion Order ==
/// Tracks insertion order for oldest-first eviction.
///
/// Keys are stored in a VecDeque where:
/// - Front = Most recently inserted
/// - Back = Oldest insertion
#[derive(Debug, Default)]
pub(crate) struct InsertionOrder {
    /// Keys ordered by insertion time
    order: VecDeque<CacheKey>,
}

impl InsertionOrder {
    /// Creates a new empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    // == Record ==
    /// Records a key as the newest insertion.
    ///
    /// A replaced key is re-recorded at the front; its replacement is a
    /// brand-new entry.
    pub fn record(&mut self, key: &CacheKey) {
        self.remove(key);
        self.order.push_front(key.clone());
    }

    // == Remove ==
    /// Removes a key from the tracker.
    pub fn remove(&mut self, key: &CacheKey) {
        self.order.retain(|k| k != key);
    }

    // == Pop Oldest ==
    /// Returns and removes the oldest-inserted key.
    ///
    /// Returns None if the tracker is empty.
    pub fn pop_oldest(&mut self) -> Option<CacheKey> {
        self.order.pop_back()
    }

    /// Returns the oldest-inserted key without removing it.
    #[cfg(test)]
    pub fn peek_oldest(&self) -> Option<&CacheKey> {
        self.order.back()
    }

    /// Returns the number of tracked keys.
    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.order.len()
    }
}
