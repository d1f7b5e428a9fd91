//! Batch collector implementation
//!
//! BTreeSet-based pending set. Not synchronized on its own; the accumulator
//! guards it together with the slot array.

use std::collections::BTreeSet;

use crate::bloc::Bloc;
use crate::digest::Digest;

/// Sorted, duplicate-collapsing set of digests not yet flushed
#[derive(Debug, Clone)]
pub struct BatchCollector {
    /// Pending digests in ascending order
    digests: BTreeSet<Digest>,
    /// Size at which the batch must be flushed
    capacity: usize,
}

impl BatchCollector {
    /// Create an empty collector that fills at `capacity` digests
    pub fn new(capacity: usize) -> Self {
        Self {
            digests: BTreeSet::new(),
            capacity,
        }
    }

    /// Insert a digest.
    ///
    /// Returns `false` when an equal digest is already pending.
    pub fn insert(&mut self, digest: Digest) -> bool {
        self.digests.insert(digest)
    }

    pub fn contains(&self, digest: &Digest) -> bool {
        self.digests.contains(digest)
    }

    /// Number of distinct pending digests
    pub fn len(&self) -> usize {
        self.digests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.digests.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Whether the batch has reached its flush threshold
    pub fn is_full(&self) -> bool {
        self.digests.len() >= self.capacity
    }

    /// Pending digests in ascending order
    pub fn iter(&self) -> impl Iterator<Item = &Digest> {
        self.digests.iter()
    }

    /// Build a bloc from the pending digests without clearing them.
    ///
    /// The batch is only cleared once the flush that consumes this bloc has
    /// succeeded, so a failed flush can be retried with the same content.
    pub fn to_bloc(&self) -> Bloc {
        Bloc::from_digests(self.digests.iter())
    }

    /// Drop all pending digests (after a successful flush)
    pub fn clear(&mut self) {
        self.digests.clear();
    }
}
