//! Hash-keyed dedup set.
//!
//! Used to guarantee per-session idempotency: a table is schema-augmented at
//! most once, and its structure is captured to the log at most once. Inserts
//! are idempotent and there is no removal; entries live for the session.

use std::collections::HashSet;

use crate::hash::djb2;

/// A set of string keys stored by their [`djb2`] hash.
///
/// Membership is decided by hash equality alone, which mirrors how the
/// capture side has always deduplicated table names. Two distinct tables
/// colliding on the hash would be treated as the same key; with DJB2 over
/// table identifiers this has never been observed in practice.
#[derive(Debug, Default, Clone)]
pub struct DedupSet {
    hashes: HashSet<i64>,
}

impl DedupSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.hashes.contains(&djb2(key))
    }

    /// Insert a key. Returns `true` if the key was not present before.
    pub fn insert(&mut self, key: &str) -> bool {
        self.hashes.insert(djb2(key))
    }

    pub fn len(&self) -> usize {
        self.hashes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hashes.is_empty()
    }
}
