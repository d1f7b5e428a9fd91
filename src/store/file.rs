//! File-backed content store
//!
//! One file per object, named after the hex address.
//!
//! ## File Format
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │ Header (14 bytes)                                       │
//! │   Magic: "BLCS" (4) | Version: u16 (2) | Length: u64 (8)│
//! ├─────────────────────────────────────────────────────────┤
//! │ Payload (Length bytes, the stored object verbatim)      │
//! ├─────────────────────────────────────────────────────────┤
//! │ Footer (4 bytes)                                        │
//! │   PayloadCRC: u32                                       │
//! └─────────────────────────────────────────────────────────┘
//! ```

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;

use crate::config::SyncStrategy;
use crate::error::{BlocError, Result};

use super::{Address, ContentStore};

/// Magic bytes identifying a blocstack object file
pub(crate) const MAGIC: &[u8; 4] = b"BLCS";

/// Current object file format version
pub(crate) const VERSION: u16 = 1;

/// Header size: Magic (4) + Version (2) + Length (8) = 14 bytes
pub(crate) const HEADER_SIZE: usize = 14;

/// Footer size: PayloadCRC (4)
pub(crate) const FOOTER_SIZE: usize = 4;

const OBJECT_EXTENSION: &str = "obj";

/// Content store keeping each object in its own file
#[derive(Debug)]
pub struct FileStore {
    /// Directory holding the object files
    dir: PathBuf,
    sync_strategy: SyncStrategy,
    /// Suffix counter so concurrent writers never share a temp file
    next_temp_id: AtomicU64,
}

impl FileStore {
    /// Open or create a store rooted at `dir`
    pub fn open(dir: &Path, sync_strategy: SyncStrategy) -> Result<Self> {
        fs::create_dir_all(dir)?;
        Ok(Self {
            dir: dir.to_path_buf(),
            sync_strategy,
            next_temp_id: AtomicU64::new(0),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file holding `address`
    pub fn object_path(&self, address: &Address) -> PathBuf {
        self.dir
            .join(format!("{}.{}", address.to_hex(), OBJECT_EXTENSION))
    }

    /// Addresses of every object file present, sorted
    pub fn addresses(&self) -> Result<Vec<Address>> {
        let mut addresses = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if let Some(address) = Self::parse_object_name(&path) {
                addresses.push(address);
            }
        }
        addresses.sort();
        Ok(addresses)
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    /// "<64 hex>.obj" → Some(address)
    fn parse_object_name(path: &Path) -> Option<Address> {
        if path.extension()? != OBJECT_EXTENSION {
            return None;
        }
        let stem = path.file_stem()?.to_str()?;
        let bytes = hex::decode(stem).ok()?;
        Address::from_slice(&bytes).ok()
    }

    fn encode_object(payload: &[u8]) -> Vec<u8> {
        let mut out = Vec::with_capacity(HEADER_SIZE + payload.len() + FOOTER_SIZE);
        out.extend_from_slice(MAGIC);
        out.extend_from_slice(&VERSION.to_le_bytes());
        out.extend_from_slice(&(payload.len() as u64).to_le_bytes());
        out.extend_from_slice(payload);
        out.extend_from_slice(&crc32fast::hash(payload).to_le_bytes());
        out
    }

    fn decode_object(address: &Address, raw: &[u8]) -> Result<Bytes> {
        let corrupt = |reason: String| BlocError::CorruptObject {
            address: *address,
            reason,
        };

        if raw.len() < HEADER_SIZE + FOOTER_SIZE {
            return Err(corrupt(format!("file too short: {} bytes", raw.len())));
        }
        if &raw[0..4] != MAGIC {
            return Err(corrupt(format!("invalid magic {:?}", &raw[0..4])));
        }

        let version = u16::from_le_bytes([raw[4], raw[5]]);
        if version != VERSION {
            return Err(corrupt(format!("unsupported version {}", version)));
        }

        let mut len_bytes = [0u8; 8];
        len_bytes.copy_from_slice(&raw[6..HEADER_SIZE]);
        let payload_len = u64::from_le_bytes(len_bytes);
        let stored_len = raw.len() - HEADER_SIZE - FOOTER_SIZE;
        if payload_len != stored_len as u64 {
            return Err(corrupt(format!(
                "length mismatch: header says {} payload bytes, file holds {}",
                payload_len, stored_len
            )));
        }
        let payload_len = stored_len;

        let payload = &raw[HEADER_SIZE..HEADER_SIZE + payload_len];
        let mut crc_bytes = [0u8; 4];
        crc_bytes.copy_from_slice(&raw[HEADER_SIZE + payload_len..]);
        if crc32fast::hash(payload) != u32::from_le_bytes(crc_bytes) {
            return Err(corrupt("payload checksum mismatch".to_string()));
        }
        if Address::of(payload) != *address {
            return Err(corrupt("payload does not hash to its address".to_string()));
        }

        Ok(Bytes::copy_from_slice(payload))
    }

    fn sync_dir(&self) {
        // Directory fsync is not supported on every platform
        if let Ok(dir) = File::open(&self.dir) {
            let _ = dir.sync_all();
        }
    }
}

impl ContentStore for FileStore {
    fn put(&self, bytes: &[u8]) -> Result<Address> {
        let address = Address::of(bytes);
        let path = self.object_path(&address);

        // Same bytes, same address: nothing to do unless the stored copy is damaged
        if path.exists() {
            match fs::read(&path)
                .map_err(BlocError::from)
                .and_then(|raw| Self::decode_object(&address, &raw))
            {
                Ok(_) => {
                    tracing::trace!(%address, "object already stored");
                    return Ok(address);
                }
                Err(e) => tracing::warn!(%address, error = %e, "rewriting damaged object"),
            }
        }

        let temp_id = self.next_temp_id.fetch_add(1, Ordering::SeqCst);
        let temp_path = self
            .dir
            .join(format!("{}.{}.tmp", address.to_hex(), temp_id));

        {
            let file = OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(&temp_path)?;
            let mut writer = BufWriter::new(file);
            writer.write_all(&Self::encode_object(bytes))?;
            writer.flush()?;

            if self.sync_strategy == SyncStrategy::EveryWrite {
                let file = writer.into_inner().map_err(|e| {
                    BlocError::Store(format!("Failed to flush object {}: {}", address, e))
                })?;
                file.sync_all()?;
            }
        }

        if let Err(e) = fs::rename(&temp_path, &path) {
            let _ = fs::remove_file(&temp_path);
            return Err(e.into());
        }
        if self.sync_strategy == SyncStrategy::EveryWrite {
            self.sync_dir();
        }

        tracing::trace!(%address, len = bytes.len(), "object written");
        Ok(address)
    }

    fn get(&self, address: &Address) -> Result<Bytes> {
        let raw = match fs::read(self.object_path(address)) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(BlocError::NotFound(*address))
            }
            Err(e) => return Err(e.into()),
        };
        Self::decode_object(address, &raw)
    }

    fn contains(&self, address: &Address) -> Result<bool> {
        Ok(self.object_path(address).is_file())
    }
}
