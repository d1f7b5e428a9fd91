//! Engine Module
//!
//! File-backed accumulator with a durable head pointer.
//!
//! ## Responsibilities
//! - Lay out the data directory (objects + HEAD)
//! - Rehydrate the slot array from the last recorded manifest on startup
//! - Record the newest manifest address after every flush
//! - Expose manifest notifications to in-process listeners
//!
//! ## HEAD File Format
//! ```text
//! ┌──────────────┬──────────────┬─────────────────────────────┐
//! │ Len: u32 (4) │ CRC: u32 (4) │ bincode(HeadRecord)         │
//! └──────────────┴──────────────┴─────────────────────────────┘
//! ```
//!
//! Pending (unflushed) digests live only in memory and are lost when the
//! process exits.
//!
//! A flush is committed once the accumulator returns it. A HEAD write that
//! fails afterwards does not fail the call; HEAD is marked stale and is
//! rewritten before the next add or flush.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use crossbeam::channel::Receiver;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::accumulator::{Accumulator, FlushOutcome};
use crate::bloc::Bloc;
use crate::config::{Config, SyncStrategy};
use crate::digest::Digest;
use crate::error::{BlocError, Result};
use crate::manifest::Manifest;
use crate::store::{Address, ChannelPublisher, FileStore, Notification};

/// Durable pointer to the latest manifest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeadRecord {
    /// Address of the newest manifest
    pub manifest: Address,
    /// Slot array version that manifest describes
    pub version: u64,
    /// Digests settled into blocs at that version
    pub settled_digests: u64,
}

/// The file-backed accumulator
pub struct Engine {
    /// Engine configuration
    config: Config,

    /// Directory for content-addressed objects
    objects_dir: PathBuf,

    /// Location of the HEAD record
    head_path: PathBuf,

    accumulator: Accumulator<FileStore, ChannelPublisher>,

    /// Serializes add/flush together with the HEAD rewrite that follows
    write_lock: Mutex<()>,

    /// Set when HEAD lags behind the committed manifest
    head_stale: AtomicBool,
}

impl Engine {
    // =========================================================================
    // Internal Path Constants
    // =========================================================================
    const HEAD_FILENAME: &'static str = "HEAD";
    const OBJECTS_DIR: &'static str = "objects";

    /// Open or create an engine with the given config
    ///
    /// On startup:
    /// 1. Open/create data directory and object store
    /// 2. Read HEAD if present
    /// 3. Rehydrate slots from the recorded manifest
    pub fn open(config: Config) -> Result<Self> {
        config.validate()?;

        // Step 1: Directories and object store
        fs::create_dir_all(&config.data_dir)?;
        let objects_dir = config.data_dir.join(Self::OBJECTS_DIR);
        let head_path = config.data_dir.join(Self::HEAD_FILENAME);
        let store = FileStore::open(&objects_dir, config.sync_strategy)?;
        let publisher = ChannelPublisher::new();

        // Step 2 + 3: Resume from HEAD or start empty
        let accumulator = match Self::read_head(&head_path)? {
            Some(head) => {
                tracing::info!(
                    manifest = %head.manifest,
                    version = head.version,
                    "resuming from HEAD"
                );
                let accumulator =
                    Accumulator::rehydrate(config.clone(), store, publisher, head.manifest)?;
                accumulator.resume_version(head.version);

                if accumulator.settled_digests() != head.settled_digests {
                    tracing::warn!(
                        recorded = head.settled_digests,
                        found = accumulator.settled_digests(),
                        "HEAD digest count disagrees with stored blocs"
                    );
                }
                accumulator
            }
            None => Accumulator::new(config.clone(), store, publisher)?,
        };

        Ok(Self {
            config,
            objects_dir,
            head_path,
            accumulator,
            write_lock: Mutex::new(()),
            head_stale: AtomicBool::new(false),
        })
    }

    /// Open with a path (convenience method)
    ///
    /// Uses default config with the specified data directory
    pub fn open_path(path: &Path) -> Result<Self> {
        let config = Config::builder().data_dir(path).build();
        Self::open(config)
    }

    /// Add a digest, flushing and recording HEAD when the batch fills
    pub fn add(&self, digest: Digest) -> Result<Option<FlushOutcome>> {
        let _write_guard = self.write_lock.lock();
        self.sync_head_if_stale();
        let outcome = self.accumulator.add(digest)?;
        if outcome.is_some() {
            self.record_head();
        }
        Ok(outcome)
    }

    /// Add a digest given as a binary sha2-256 multihash
    pub fn add_multihash(&self, multihash: &[u8]) -> Result<Option<FlushOutcome>> {
        self.add(Digest::from_multihash(multihash)?)
    }

    /// Flush the pending batch regardless of its size
    pub fn flush(&self) -> Result<Option<FlushOutcome>> {
        let _write_guard = self.write_lock.lock();
        self.sync_head_if_stale();
        let outcome = self.accumulator.flush()?;
        if outcome.is_some() {
            self.record_head();
        }
        Ok(outcome)
    }

    /// Rewrite HEAD from the committed state.
    ///
    /// Clears the stale flag on success.
    pub fn sync_head(&self) -> Result<()> {
        let _write_guard = self.write_lock.lock();
        self.write_head()?;
        self.head_stale.store(false, Ordering::SeqCst);
        Ok(())
    }

    /// Whether the last committed flush is missing from HEAD
    pub fn head_is_stale(&self) -> bool {
        self.head_stale.load(Ordering::SeqCst)
    }

    /// Listen for manifest addresses published after each flush
    pub fn subscribe(&self) -> Receiver<Notification> {
        self.accumulator.publisher().subscribe()
    }

    /// Current HEAD record, if any flush has been recorded
    pub fn head(&self) -> Result<Option<HeadRecord>> {
        Self::read_head(&self.head_path)
    }

    pub fn manifest(&self) -> Manifest {
        self.accumulator.manifest()
    }

    pub fn load_bloc(&self, address: &Address) -> Result<Bloc> {
        self.accumulator.load_bloc(address)
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    pub fn accumulator(&self) -> &Accumulator<FileStore, ChannelPublisher> {
        &self.accumulator
    }

    /// Get the data directory path
    pub fn data_dir(&self) -> &Path {
        &self.config.data_dir
    }

    /// Get the object directory path
    pub fn objects_dir(&self) -> &Path {
        &self.objects_dir
    }

    pub fn pending_len(&self) -> usize {
        self.accumulator.pending_len()
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    /// Write HEAD after a committed flush; failure only marks it stale
    fn record_head(&self) {
        match self.write_head() {
            Ok(()) => self.head_stale.store(false, Ordering::SeqCst),
            Err(e) => {
                self.head_stale.store(true, Ordering::SeqCst);
                tracing::warn!(error = %e, "HEAD write failed after commit, will retry");
            }
        }
    }

    fn sync_head_if_stale(&self) {
        if self.head_is_stale() {
            self.record_head();
        }
    }

    fn write_head(&self) -> Result<()> {
        let Some(manifest) = self.accumulator.last_manifest_address() else {
            return Ok(());
        };
        let record = HeadRecord {
            manifest,
            version: self.accumulator.slots().version(),
            settled_digests: self.accumulator.settled_digests(),
        };
        let body = bincode::serialize(&record)?;

        let mut framed = Vec::with_capacity(8 + body.len());
        framed.extend_from_slice(&(body.len() as u32).to_le_bytes());
        framed.extend_from_slice(&crc32fast::hash(&body).to_le_bytes());
        framed.extend_from_slice(&body);

        let temp_path = self.head_path.with_extension("tmp");
        {
            let mut file = OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(&temp_path)?;
            file.write_all(&framed)?;
            if self.config.sync_strategy == SyncStrategy::EveryWrite {
                file.sync_all()?;
            }
        }
        fs::rename(&temp_path, &self.head_path)?;

        tracing::debug!(manifest = %record.manifest, version = record.version, "HEAD updated");
        Ok(())
    }

    fn read_head(path: &Path) -> Result<Option<HeadRecord>> {
        if !path.exists() {
            return Ok(None);
        }
        let raw = fs::read(path)?;
        if raw.len() < 8 {
            return Err(BlocError::Serialization(format!(
                "HEAD too short: {} bytes",
                raw.len()
            )));
        }

        let len = u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]) as usize;
        let crc = u32::from_le_bytes([raw[4], raw[5], raw[6], raw[7]]);
        let body = &raw[8..];
        if body.len() != len {
            return Err(BlocError::Serialization(format!(
                "HEAD length mismatch: expected {}, got {}",
                len,
                body.len()
            )));
        }
        if crc32fast::hash(body) != crc {
            return Err(BlocError::Serialization(
                "HEAD checksum mismatch".to_string(),
            ));
        }

        Ok(Some(bincode::deserialize(body)?))
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("data_dir", &self.config.data_dir)
            .field("accumulator", &self.accumulator)
            .finish()
    }
}
