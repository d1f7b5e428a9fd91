//! Accumulator Module
//!
//! Batches incoming digests and folds each full batch into the per-level
//! slot array, binary-counter style.
//!
//! ## Responsibilities
//! - Collect digests until the batch reaches capacity
//! - Carry each fresh bloc up through occupied levels
//! - Persist the settled bloc and a fresh manifest
//! - Publish the manifest address
//!
//! ## Flush sequence
//! ```text
//!  batch ──► fresh bloc ──► level L ──► slot[L] empty? ──yes──► put bloc, slot[L] = addr
//!                               ▲              │
//!                               │              no
//!                               │              ▼
//!                               └── L+1 ◄── merge with get(slot[L]), clear slot[L]
//!
//!  then: manifest = occupied slots ──► put manifest ──► commit ──► publish(topic, addr)
//! ```
//!
//! The accumulator is a multiset: equal digests arriving in different
//! batches are all kept. Only duplicates within one batch collapse.

mod carry;
mod slots;

use parking_lot::Mutex;

pub use slots::SlotArray;

use crate::batch::BatchCollector;
use crate::bloc::Bloc;
use crate::config::Config;
use crate::digest::Digest;
use crate::error::Result;
use crate::manifest::Manifest;
use crate::store::{Address, ContentStore, Publisher};

/// What a completed flush produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlushOutcome {
    /// Level the bloc settled at
    pub level: usize,
    /// Address of the settled bloc
    pub bloc_address: Address,
    /// Digests in the settled bloc (after carry merges)
    pub bloc_len: usize,
    /// Digests taken from the batch by this flush
    pub flushed: usize,
    /// Occupied levels merged away during the carry
    pub merges: usize,
    /// Address of the manifest written for the new state
    pub manifest_address: Address,
    /// Slot array version after the commit
    pub slots_version: u64,
}

/// Mutable state guarded by the writer lock
struct State {
    batch: BatchCollector,
    slots: SlotArray,
    last_manifest: Option<Address>,
    settled_digests: u64,
}

/// Carry-propagating digest accumulator
///
/// ## Concurrency Model: Single Writer
///
/// - `add` and `flush` take one exclusive lock over {batch, slots}, so
///   flushes are strictly sequential and a batch is never flushed twice
/// - Publishing happens under the same lock, so notifications arrive in
///   flush order
/// - `load_manifest` / `load_bloc` read immutable published objects and
///   take no lock
pub struct Accumulator<S, P> {
    config: Config,
    store: S,
    publisher: P,
    state: Mutex<State>,
}

impl<S: ContentStore, P: Publisher> Accumulator<S, P> {
    /// Create an empty accumulator
    pub fn new(config: Config, store: S, publisher: P) -> Result<Self> {
        config.validate()?;
        let state = State {
            batch: BatchCollector::new(config.batch_capacity),
            slots: SlotArray::new(),
            last_manifest: None,
            settled_digests: 0,
        };
        Ok(Self {
            config,
            store,
            publisher,
            state: Mutex::new(state),
        })
    }

    /// Resume from a published manifest.
    ///
    /// Every referenced bloc is fetched once to check it is present and well
    /// formed; the pending batch starts empty.
    pub fn rehydrate(
        config: Config,
        store: S,
        publisher: P,
        manifest_address: Address,
    ) -> Result<Self> {
        let accumulator = Self::new(config, store, publisher)?;
        let manifest = Manifest::load(&accumulator.store, &manifest_address)?;
        let slots = SlotArray::from_manifest(&manifest);

        let mut settled_digests = 0u64;
        for (_, address) in slots.occupied() {
            settled_digests += accumulator.load_bloc(&address)?.len() as u64;
        }

        tracing::info!(
            manifest = %manifest_address,
            levels = slots.occupied_count(),
            settled_digests,
            "rehydrated accumulator"
        );

        {
            let mut state = accumulator.state.lock();
            state.slots = slots;
            state.last_manifest = Some(manifest_address);
            state.settled_digests = settled_digests;
        }
        Ok(accumulator)
    }

    /// Add one digest.
    ///
    /// Returns the flush outcome when this call filled the batch. If an
    /// earlier flush failed and left the batch full, that flush is retried
    /// before the digest is accepted.
    pub fn add(&self, digest: Digest) -> Result<Option<FlushOutcome>> {
        let mut state = self.state.lock();
        let mut outcome = None;

        if state.batch.is_full() {
            tracing::debug!("retrying flush of a full batch");
            outcome = Some(self.flush_locked(&mut state)?);
        }

        if !state.batch.insert(digest) {
            tracing::trace!(%digest, "duplicate collapsed in batch");
        }

        if state.batch.is_full() {
            outcome = Some(self.flush_locked(&mut state)?);
        }

        Ok(outcome)
    }

    /// Add a digest given as a binary sha2-256 multihash
    pub fn add_multihash(&self, multihash: &[u8]) -> Result<Option<FlushOutcome>> {
        self.add(Digest::from_multihash(multihash)?)
    }

    /// Flush the pending batch even if it is not full.
    ///
    /// Returns `None` when nothing is pending.
    pub fn flush(&self) -> Result<Option<FlushOutcome>> {
        let mut state = self.state.lock();
        if state.batch.is_empty() {
            return Ok(None);
        }
        self.flush_locked(&mut state).map(Some)
    }

    // =========================================================================
    // Read-only views
    // =========================================================================

    /// Manifest of the committed slot array
    pub fn manifest(&self) -> Manifest {
        self.state.lock().slots.to_manifest()
    }

    /// Snapshot of the committed slot array
    pub fn slots(&self) -> SlotArray {
        self.state.lock().slots.clone()
    }

    /// Digests waiting in the batch
    pub fn pending_len(&self) -> usize {
        self.state.lock().batch.len()
    }

    /// Digests held by all settled blocs
    pub fn settled_digests(&self) -> u64 {
        self.state.lock().settled_digests
    }

    /// Address of the most recently written manifest
    pub fn last_manifest_address(&self) -> Option<Address> {
        self.state.lock().last_manifest
    }

    /// Decode a published manifest straight from the store
    pub fn load_manifest(&self, address: &Address) -> Result<Manifest> {
        Manifest::load(&self.store, address)
    }

    /// Fetch a whole persisted bloc
    pub fn load_bloc(&self, address: &Address) -> Result<Bloc> {
        Bloc::from_bytes(self.store.get(address)?)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn publisher(&self) -> &P {
        &self.publisher
    }

    pub(crate) fn resume_version(&self, version: u64) {
        self.state.lock().slots.set_version(version);
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    /// Flush the batch with the writer lock held.
    ///
    /// Nothing in `state` changes until the settled bloc and the manifest
    /// are both stored.
    fn flush_locked(&self, state: &mut State) -> Result<FlushOutcome> {
        let fresh = state.batch.to_bloc();
        let flushed = fresh.len();

        let settled = carry::carry(&self.store, &state.slots, fresh)?;
        let manifest = settled.slots.to_manifest();
        let manifest_address = self.store.put(&manifest.encode())?;

        // Commit
        let mut slots = settled.slots;
        slots.bump_version();
        let slots_version = slots.version();
        state.slots = slots;
        state.batch.clear();
        state.last_manifest = Some(manifest_address);
        state.settled_digests += flushed as u64;

        tracing::info!(
            level = settled.level,
            bloc = %settled.address,
            bloc_len = settled.bloc_len,
            merges = settled.merges,
            manifest = %manifest_address,
            version = slots_version,
            "flush settled"
        );

        self.announce(&manifest_address);

        Ok(FlushOutcome {
            level: settled.level,
            bloc_address: settled.address,
            bloc_len: settled.bloc_len,
            flushed,
            merges: settled.merges,
            manifest_address,
            slots_version,
        })
    }

    /// Publish a manifest address; delivery is best effort
    fn announce(&self, manifest_address: &Address) {
        let payload = manifest_address.to_string();
        if let Err(e) = self
            .publisher
            .publish(&self.config.publish_topic, payload.as_bytes())
        {
            tracing::warn!(
                topic = %self.config.publish_topic,
                manifest = %manifest_address,
                error = %e,
                "manifest publish failed"
            );
        }
    }
}

impl<S, P> std::fmt::Debug for Accumulator<S, P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("Accumulator")
            .field("pending", &state.batch.len())
            .field("levels", &state.slots.occupied_count())
            .field("version", &state.slots.version())
            .finish()
    }
}
