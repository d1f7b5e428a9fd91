//! Slot array
//!
//! One optional bloc address per level, plus a version bumped on every
//! committed flush.

use crate::bloc::MAX_LEVELS;
use crate::manifest::Manifest;
use crate::store::Address;

/// Level-indexed references to persisted blocs.
///
/// Indexing by level means a level can never hold two blocs. The carry pass
/// works on a clone and the accumulator swaps it in only once every store
/// call of the flush has succeeded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotArray {
    slots: [Option<Address>; MAX_LEVELS],
    version: u64,
}

impl SlotArray {
    pub fn new() -> Self {
        Self {
            slots: [None; MAX_LEVELS],
            version: 0,
        }
    }

    /// Slots described by a decoded manifest
    pub fn from_manifest(manifest: &Manifest) -> Self {
        let mut slots = Self::new();
        for entry in manifest.entries() {
            // Manifest decoding already rejects levels >= MAX_LEVELS
            slots.set(entry.level as usize, entry.address);
        }
        slots
    }

    /// Address held at `level`; `None` when empty or out of range
    pub fn get(&self, level: usize) -> Option<Address> {
        self.slots.get(level).copied().flatten()
    }

    pub(crate) fn set(&mut self, level: usize, address: Address) {
        self.slots[level] = Some(address);
    }

    pub(crate) fn clear(&mut self, level: usize) -> Option<Address> {
        self.slots[level].take()
    }

    pub(crate) fn bump_version(&mut self) {
        self.version += 1;
    }

    pub(crate) fn set_version(&mut self, version: u64) {
        self.version = version;
    }

    /// Number of committed flushes that produced this state
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Occupied `(level, address)` pairs in ascending level order
    pub fn occupied(&self) -> impl Iterator<Item = (usize, Address)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(level, slot)| slot.map(|address| (level, address)))
    }

    pub fn occupied_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.occupied_count() == 0
    }

    pub fn as_slice(&self) -> &[Option<Address>] {
        &self.slots
    }

    pub fn to_manifest(&self) -> Manifest {
        Manifest::from_slots(&self.slots)
    }
}

impl Default for SlotArray {
    fn default() -> Self {
        Self::new()
    }
}
