//! Bloc Module
//!
//! Immutable sorted runs of digests, the unit of persistence and merge.
//!
//! ## Encoding
//! ```text
//! ┌──────────────┬──────────────┬─────┬──────────────┐
//! │ Digest 0 (32)│ Digest 1 (32)│ ... │ Digest n-1   │
//! └──────────────┴──────────────┴─────┴──────────────┘
//!   ascending unsigned byte order, total length 32 × n
//! ```
//!
//! ## Level
//! A bloc of `n` digests sits at level `L`, the smallest `L` with
//! `n <= 2^L`. Merging two blocs of the same level lands in the next one,
//! which is what drives carry propagation in the accumulator.
//!
//! Nothing in this module performs I/O.

mod iterator;
mod merge;

use std::fmt;

use bytes::{BufMut, Bytes, BytesMut};

pub use iterator::BlocIter;

use crate::digest::{Digest, DIGEST_WIDTH};
use crate::error::{BlocError, Result};

/// Number of slot levels an accumulator tracks (levels 0..=127)
pub const MAX_LEVELS: usize = 128;

/// Smallest level `L` such that `size <= 2^L`.
///
/// A single digest is level 0; an empty run has no level.
pub fn level_for_size(size: usize) -> Result<usize> {
    match size {
        0 => Err(BlocError::EmptyBloc),
        1 => Ok(0),
        n => Ok((usize::BITS - (n - 1).leading_zeros()) as usize),
    }
}

/// Immutable sorted sequence of digests backed by a shared byte buffer
#[derive(Clone, PartialEq, Eq)]
pub struct Bloc {
    data: Bytes,
}

impl Bloc {
    /// Wrap raw bloc bytes, typically fetched back from a store.
    ///
    /// The length must be a positive multiple of the digest width.
    pub fn from_bytes(data: impl Into<Bytes>) -> Result<Self> {
        let data = data.into();
        if data.is_empty() || data.len() % DIGEST_WIDTH != 0 {
            return Err(BlocError::InvalidBlocLength(data.len()));
        }
        Ok(Self { data })
    }

    /// Concatenate digests in iteration order.
    ///
    /// Callers pass an already ordered source such as a batch.
    pub fn from_digests<'a, I>(digests: I) -> Self
    where
        I: IntoIterator<Item = &'a Digest>,
    {
        let iter = digests.into_iter();
        let mut data = BytesMut::with_capacity(DIGEST_WIDTH * iter.size_hint().0);
        for digest in iter {
            data.put_slice(digest.as_bytes());
        }
        Self {
            data: data.freeze(),
        }
    }

    /// Concatenate raw digest slices, each of which must be exactly 32 bytes
    pub fn from_slices<'a, I>(digests: I) -> Result<Self>
    where
        I: IntoIterator<Item = &'a [u8]>,
    {
        let mut data = BytesMut::new();
        for digest in digests {
            if digest.len() != DIGEST_WIDTH {
                return Err(BlocError::DigestWidth(digest.len()));
            }
            data.put_slice(digest);
        }
        Ok(Self {
            data: data.freeze(),
        })
    }

    /// Capacity class of this bloc
    pub fn level(&self) -> Result<usize> {
        level_for_size(self.len())
    }

    /// Number of digests
    pub fn len(&self) -> usize {
        self.data.len() / DIGEST_WIDTH
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Digest at `index`, or `None` past the end
    pub fn digest(&self, index: usize) -> Option<Digest> {
        let start = index.checked_mul(DIGEST_WIDTH)?;
        let chunk = self.data.get(start..start + DIGEST_WIDTH)?;
        Digest::from_slice(chunk).ok()
    }

    /// Iterate digests in stored order
    pub fn iter(&self) -> BlocIter<'_> {
        BlocIter::new(&self.data)
    }

    /// True when every digest is >= its predecessor
    pub fn is_sorted(&self) -> bool {
        self.data
            .chunks_exact(DIGEST_WIDTH)
            .zip(self.data.chunks_exact(DIGEST_WIDTH).skip(1))
            .all(|(prev, next)| prev <= next)
    }

    /// Encoded form, as handed to the store
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn into_bytes(self) -> Bytes {
        self.data
    }
}

impl fmt::Debug for Bloc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bloc")
            .field("len", &self.len())
            .field("level", &self.level().ok())
            .finish()
    }
}
