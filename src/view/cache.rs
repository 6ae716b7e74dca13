//! Bounded FIFO cache of materialized rows.
//!
//! Eviction is by insertion order only. A hit does not refresh an entry, so
//! a hot row is evicted exactly `capacity` insertions after it was filled.

use std::collections::{HashMap, VecDeque};
use tracing::trace;

use crate::view::record::ViewRecord;

/// Counters describing cache behaviour since the last reset of the stats.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub len: usize,
    pub capacity: usize,
}

#[derive(Debug, Clone)]
pub struct RowCache {
    records: HashMap<u64, ViewRecord>,
    order: VecDeque<u64>,
    capacity: usize,
    hits: u64,
    misses: u64,
    evictions: u64,
}

impl RowCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            records: HashMap::with_capacity(capacity.min(4096)),
            order: VecDeque::with_capacity(capacity.min(4096)),
            capacity,
            hits: 0,
            misses: 0,
            evictions: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn contains(&self, position: u64) -> bool {
        self.records.contains_key(&position)
    }

    /// Cached row at `position` without counting a hit.
    pub fn peek(&self, position: u64) -> Option<&ViewRecord> {
        self.records.get(&position)
    }

    /// Return the cached row or build, insert and return it.
    pub fn get_or_insert_with<F>(&mut self, position: u64, materialize: F) -> ViewRecord
    where
        F: FnOnce() -> ViewRecord,
    {
        if let Some(record) = self.records.get(&position) {
            self.hits += 1;
            return record.clone();
        }
        self.misses += 1;
        let record = materialize();
        self.insert(position, record.clone());
        record
    }

    /// Insert a row, evicting the oldest-inserted entries over capacity.
    pub fn insert(&mut self, position: u64, record: ViewRecord) {
        if self.records.insert(position, record).is_none() {
            self.order.push_back(position);
        }
        while self.order.len() > self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.records.remove(&oldest);
                self.evictions += 1;
                trace!(position = oldest, "Evicted cached row");
            }
        }
    }

    /// Drop every cached row.
    pub fn invalidate_all(&mut self) {
        self.records.clear();
        self.order.clear();
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits,
            misses: self.misses,
            evictions: self.evictions,
            len: self.records.len(),
            capacity: self.capacity,
        }
    }
}

impl Default for RowCache {
    fn default() -> Self {
        Self::new(1000)
    }
}
