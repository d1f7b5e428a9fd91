//! Manifest Module
//!
//! Snapshot of every occupied slot, republished after each flush.
//!
//! ## Encoding
//! ```text
//! ┌───────────────────┬──────────────────────────┐
//! │ Level: u32 BE (4) │ Bloc address (32)        │  one record per occupied level
//! └───────────────────┴──────────────────────────┘
//!   records in strictly ascending level order, total length 36 × n
//! ```

use crate::bloc::MAX_LEVELS;
use crate::error::{BlocError, Result};
use crate::store::{Address, ContentStore};

/// Size of one `(level, address)` record
pub const RECORD_SIZE: usize = 4 + 32;

/// One occupied slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ManifestEntry {
    pub level: u32,
    pub address: Address,
}

/// Ordered `(level, address)` pairs describing the settled state
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    entries: Vec<ManifestEntry>,
}

impl Manifest {
    /// Build from entries, which must be in strictly ascending level order
    pub fn new(entries: Vec<ManifestEntry>) -> Result<Self> {
        Self::check_levels(&entries)?;
        Ok(Self { entries })
    }

    /// Build from a level-indexed slot view
    pub fn from_slots(slots: &[Option<Address>]) -> Self {
        let entries = slots
            .iter()
            .enumerate()
            .filter_map(|(level, slot)| {
                slot.map(|address| ManifestEntry {
                    level: level as u32,
                    address,
                })
            })
            .collect();
        Self { entries }
    }

    /// Fetch and decode a published manifest
    pub fn load<S: ContentStore + ?Sized>(store: &S, address: &Address) -> Result<Self> {
        let bytes = store.get(address)?;
        Self::decode(&bytes)
    }

    pub fn entries(&self) -> &[ManifestEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Address recorded for `level`, if occupied
    pub fn address_at(&self, level: u32) -> Option<Address> {
        self.entries
            .iter()
            .find(|entry| entry.level == level)
            .map(|entry| entry.address)
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(RECORD_SIZE * self.entries.len());
        for entry in &self.entries {
            out.extend_from_slice(&entry.level.to_be_bytes());
            out.extend_from_slice(entry.address.as_bytes());
        }
        out
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() % RECORD_SIZE != 0 {
            return Err(BlocError::Manifest(format!(
                "length {} is not a multiple of {}",
                bytes.len(),
                RECORD_SIZE
            )));
        }

        let mut entries = Vec::with_capacity(bytes.len() / RECORD_SIZE);
        for record in bytes.chunks_exact(RECORD_SIZE) {
            let level = u32::from_be_bytes([record[0], record[1], record[2], record[3]]);
            let address = Address::from_slice(&record[4..])?;
            entries.push(ManifestEntry { level, address });
        }

        Self::new(entries)
    }

    fn check_levels(entries: &[ManifestEntry]) -> Result<()> {
        let mut previous: Option<u32> = None;
        for entry in entries {
            if entry.level as usize >= MAX_LEVELS {
                return Err(BlocError::Manifest(format!(
                    "level {} out of range (max {})",
                    entry.level,
                    MAX_LEVELS - 1
                )));
            }
            if let Some(prev) = previous {
                if entry.level <= prev {
                    return Err(BlocError::Manifest(format!(
                        "levels not strictly ascending: {} after {}",
                        entry.level, prev
                    )));
                }
            }
            previous = Some(entry.level);
        }
        Ok(())
    }
}
