//! # blocstack
//!
//! An append-only digest accumulator over a content-addressed store:
//! - Digests are batched in sorted, duplicate-free order
//! - Full batches become sorted "blocs" at power-of-two capacity levels
//! - Blocs carry upward like a binary counter, at most one per level
//! - A manifest of the occupied levels is stored and published after every flush
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Producers (add)                          │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                    Accumulator                               │
//! │             (single writer lock: batch + slots)              │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┴────────────┐
//!          │                         │
//!          ▼                         ▼
//!   ┌─────────────┐          ┌─────────────┐
//!   │    Batch    │          │ Slot array  │
//!   │ (BTreeSet)  │          │ (128 levels)│
//!   └──────┬──────┘          └──────┬──────┘
//!          │   fresh bloc           │ carry / merge
//!          └────────────┬───────────┘
//!                       ▼
//!          ┌─────────────────────────┐      ┌─────────────┐
//!          │  ContentStore put/get   │─────►│  Publisher  │
//!          │  (blocs, manifests)     │      │ (manifest)  │
//!          └─────────────────────────┘      └─────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod digest;
pub mod batch;
pub mod bloc;
pub mod manifest;
pub mod store;
pub mod accumulator;
pub mod engine;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{BlocError, Result};
pub use config::Config;
pub use digest::Digest;
pub use bloc::Bloc;
pub use manifest::Manifest;
pub use store::{Address, ContentStore, Publisher};
pub use accumulator::{Accumulator, FlushOutcome};
pub use engine::Engine;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of blocstack
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
