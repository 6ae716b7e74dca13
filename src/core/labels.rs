//! Read-only label lookups and the reverse-reference multimap.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Address → label text.
pub trait LabelTable {
    fn label(&self, address: u64) -> Option<&str>;
}

/// Instruction address → addresses that instruction refers to.
pub trait ReverseReferenceIndex {
    /// Referenced addresses in insertion order; empty when there are none.
    fn references_from(&self, address: u64) -> &[u64];
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelMap {
    labels: BTreeMap<u64, String>,
}

impl LabelMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the label for `address`, returning the previous one.
    pub fn insert(&mut self, address: u64, label: impl Into<String>) -> Option<String> {
        self.labels.insert(address, label.into())
    }

    pub fn remove(&mut self, address: u64) -> Option<String> {
        self.labels.remove(&address)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Labels in address order.
    pub fn iter(&self) -> impl Iterator<Item = (u64, &str)> {
        self.labels.iter().map(|(a, l)| (*a, l.as_str()))
    }
}

impl<S: Into<String>> FromIterator<(u64, S)> for LabelMap {
    fn from_iter<T: IntoIterator<Item = (u64, S)>>(iter: T) -> Self {
        Self {
            labels: iter.into_iter().map(|(a, l)| (a, l.into())).collect(),
        }
    }
}

impl LabelTable for LabelMap {
    fn label(&self, address: u64) -> Option<&str> {
        self.labels.get(&address).map(String::as_str)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceMap {
    refs: BTreeMap<u64, Vec<u64>>,
}

impl ReferenceMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that the instruction at `from` references `to`. Duplicates are kept.
    pub fn add(&mut self, from: u64, to: u64) {
        self.refs.entry(from).or_default().push(to);
    }

    /// Total number of recorded references.
    pub fn len(&self) -> usize {
        self.refs.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.refs.is_empty()
    }
}

impl FromIterator<(u64, u64)> for ReferenceMap {
    fn from_iter<T: IntoIterator<Item = (u64, u64)>>(iter: T) -> Self {
        let mut map = Self::new();
        for (from, to) in iter {
            map.add(from, to);
        }
        map
    }
}

impl ReverseReferenceIndex for ReferenceMap {
    fn references_from(&self, address: u64) -> &[u64] {
        self.refs.get(&address).map(Vec::as_slice).unwrap_or(&[])
    }
}
