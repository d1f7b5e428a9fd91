//! Store Module
//!
//! Content-addressed persistence and manifest notification.
//!
//! ## Responsibilities
//! - `put` opaque bytes and hand back their content address
//! - `get` bytes back by address
//! - broadcast the address of each new manifest
//!
//! The accumulator only ever talks to these two traits, so tests and
//! embedders can swap in the in-memory store or their own backend.

mod address;
mod file;
mod memory;
mod publish;

use std::sync::Arc;

use bytes::Bytes;

pub use address::Address;
pub use file::FileStore;
pub use memory::MemoryStore;
pub use publish::{ChannelPublisher, LogPublisher, Notification, Publisher};

use crate::error::Result;

/// Content-addressed object store.
///
/// - Objects are immutable once written; the address is the SHA2-256 of
///   the bytes, so writing the same bytes twice is a no-op.
/// - `get` of an unknown address fails with `NotFound`.
/// - Errors are propagated, never swallowed.
pub trait ContentStore: Send + Sync {
    /// Persist `bytes` and return their address
    fn put(&self, bytes: &[u8]) -> Result<Address>;

    /// Fetch previously stored bytes
    fn get(&self, address: &Address) -> Result<Bytes>;

    /// Check whether an object exists
    fn contains(&self, address: &Address) -> Result<bool>;
}

impl<T: ContentStore + ?Sized> ContentStore for Arc<T> {
    fn put(&self, bytes: &[u8]) -> Result<Address> {
        (**self).put(bytes)
    }

    fn get(&self, address: &Address) -> Result<Bytes> {
        (**self).get(address)
    }

    fn contains(&self, address: &Address) -> Result<bool> {
        (**self).contains(address)
    }
}
