//! In-memory content store
//!
//! HashMap-based store for tests, benchmarks and embedding.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;
use parking_lot::RwLock;

use crate::error::{BlocError, Result};

use super::{Address, ContentStore};

/// In-memory, HashMap-based content store.
///
/// ## Concurrency:
/// - `objects`: Protected by RwLock (many concurrent readers, exclusive writer)
/// - `puts` / `gets`: Atomic counters for tests and diagnostics
pub struct MemoryStore {
    objects: RwLock<HashMap<Address, Bytes>>,
    puts: AtomicU64,
    gets: AtomicU64,
}

impl MemoryStore {
    /// Create a new empty store
    pub fn new() -> Self {
        Self {
            objects: RwLock::new(HashMap::new()),
            puts: AtomicU64::new(0),
            gets: AtomicU64::new(0),
        }
    }

    /// Number of distinct objects stored
    pub fn len(&self) -> usize {
        self.objects.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.read().is_empty()
    }

    /// Total bytes across all stored objects
    pub fn total_bytes(&self) -> usize {
        self.objects.read().values().map(Bytes::len).sum()
    }

    /// All addresses, sorted
    pub fn addresses(&self) -> Vec<Address> {
        let mut addresses: Vec<Address> = self.objects.read().keys().copied().collect();
        addresses.sort();
        addresses
    }

    /// Number of `put` calls served (including idempotent repeats)
    pub fn put_count(&self) -> u64 {
        self.puts.load(Ordering::SeqCst)
    }

    /// Number of `get` calls served
    pub fn get_count(&self) -> u64 {
        self.gets.load(Ordering::SeqCst)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ContentStore for MemoryStore {
    fn put(&self, bytes: &[u8]) -> Result<Address> {
        let address = Address::of(bytes);
        self.puts.fetch_add(1, Ordering::SeqCst);
        self.objects
            .write()
            .entry(address)
            .or_insert_with(|| Bytes::copy_from_slice(bytes));
        tracing::trace!(%address, len = bytes.len(), "memory store put");
        Ok(address)
    }

    fn get(&self, address: &Address) -> Result<Bytes> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        self.objects
            .read()
            .get(address)
            .cloned()
            .ok_or(BlocError::NotFound(*address))
    }

    fn contains(&self, address: &Address) -> Result<bool> {
        Ok(self.objects.read().contains_key(address))
    }
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore")
            .field("object_count", &self.len())
            .finish()
    }
}
