//! # Bounded replay history.
//!
//! [`ReplayBuffer`] keeps the most recent resolved values of a channel so late
//! subscribers can be caught up.
//!
//! ## Rules
//! - `len() <= capacity()` at all times; capacity is at least 1.
//! - `record` evicts the **oldest** entry once full.
//! - `resize` keeps the **earliest** `n` entries when shrinking. Callers that
//!   expect "keep most recent" must clear and re-record instead.
//! - `last(n)` returns up to `n` newest entries, oldest first.
//!
//! ## Example
//! ```rust
//! use replaybus::ReplayBuffer;
//!
//! let mut buf = ReplayBuffer::new(2);
//! buf.record(1);
//! buf.record(2);
//! buf.record(3);
//! assert_eq!(buf.last(2), vec![2, 3]);
//! ```

use std::collections::VecDeque;

/// Bounded FIFO history of resolved values.
#[derive(Debug, Clone)]
pub struct ReplayBuffer<T> {
    entries: VecDeque<T>,
    capacity: usize,
}

impl<T> ReplayBuffer<T> {
    /// Creates an empty buffer. A capacity of `0` is clamped to `1`.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Appends a value, evicting the oldest entry when full.
    pub fn record(&mut self, value: T) {
        while self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(value);
    }

    /// Changes the capacity, truncating to the first `capacity` entries when shrinking.
    ///
    /// A capacity of `0` is clamped to `1`.
    pub fn resize(&mut self, capacity: usize) {
        let capacity = capacity.max(1);
        self.entries.truncate(capacity);
        self.capacity = capacity;
    }

    /// Drops every entry; capacity is kept.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Iterates entries oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.entries.iter()
    }
}

impl<T: Clone> ReplayBuffer<T> {
    /// Returns up to `n` newest entries, oldest first.
    pub fn last(&self, n: usize) -> Vec<T> {
        let skip = self.entries.len().saturating_sub(n);
        self.entries.iter().skip(skip).cloned().collect()
    }

    /// Returns a copy of every entry, oldest first.
    pub fn to_vec(&self) -> Vec<T> {
        self.entries.iter().cloned().collect()
    }
}
