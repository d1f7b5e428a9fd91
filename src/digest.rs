//! Digest Module
//!
//! Fixed-width content digests and their ordering.
//!
//! A digest is the 32-byte output of SHA2-256. Digests are ordered by
//! unsigned lexicographic byte comparison, which is also the equality used to
//! collapse duplicates inside a batch.

use std::cmp::Ordering;
use std::fmt;

use multihash::Multihash;
use sha2::{Digest as _, Sha256};

use crate::error::{BlocError, Result};

/// Width in bytes of every digest handled by the accumulator
pub const DIGEST_WIDTH: usize = 32;

/// Multihash code for SHA2-256
pub const SHA2_256_CODE: u64 = 0x12;

/// Header of a SHA2-256 multihash: code (1) + length (1)
pub const MULTIHASH_HEADER_LEN: usize = 2;

/// Compare two raw digests.
///
/// Both slices must be exactly [`DIGEST_WIDTH`] bytes. Bytes are compared as
/// unsigned values, left to right; the first differing byte decides.
pub fn compare(a: &[u8], b: &[u8]) -> Result<Ordering> {
    if a.len() != DIGEST_WIDTH {
        return Err(BlocError::DigestWidth(a.len()));
    }
    if b.len() != DIGEST_WIDTH {
        return Err(BlocError::DigestWidth(b.len()));
    }
    Ok(a.cmp(b))
}

/// A 32-byte content digest
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Digest([u8; DIGEST_WIDTH]);

impl Digest {
    pub const fn new(bytes: [u8; DIGEST_WIDTH]) -> Self {
        Self(bytes)
    }

    /// Build a digest from a raw slice, rejecting any other width
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let array: [u8; DIGEST_WIDTH] = bytes
            .try_into()
            .map_err(|_| BlocError::DigestWidth(bytes.len()))?;
        Ok(Self(array))
    }

    /// SHA2-256 of `data`
    pub fn sha256(data: &[u8]) -> Self {
        Self(Sha256::digest(data).into())
    }

    /// Extract the digest from a binary multihash.
    ///
    /// Only SHA2-256 is accepted: a 2-byte header followed by exactly
    /// 32 digest bytes. Anything else is a digest-algorithm mismatch.
    pub fn from_multihash(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != MULTIHASH_HEADER_LEN + DIGEST_WIDTH {
            return Err(BlocError::DigestAlgorithm(format!(
                "expected a {}-byte sha2-256 multihash, got {} bytes",
                MULTIHASH_HEADER_LEN + DIGEST_WIDTH,
                bytes.len()
            )));
        }
        let mh = Multihash::<64>::from_bytes(bytes)
            .map_err(|e| BlocError::DigestAlgorithm(format!("invalid multihash: {e}")))?;
        Self::from_parsed_multihash(&mh)
    }

    pub(crate) fn from_parsed_multihash(mh: &Multihash<64>) -> Result<Self> {
        if mh.code() != SHA2_256_CODE {
            return Err(BlocError::DigestAlgorithm(format!(
                "expected sha2-256 (0x12), got 0x{:x}",
                mh.code()
            )));
        }
        if mh.size() as usize != DIGEST_WIDTH {
            return Err(BlocError::DigestAlgorithm(format!(
                "expected a {}-byte sha2-256 digest, got {} bytes",
                DIGEST_WIDTH,
                mh.size()
            )));
        }
        Self::from_slice(mh.digest())
    }

    /// Wrap this digest as a SHA2-256 multihash
    pub fn to_multihash(&self) -> Multihash<64> {
        // 32 bytes always fit in a 64-byte multihash
        Multihash::<64>::wrap(SHA2_256_CODE, &self.0)
            .unwrap_or_else(|_| unreachable!("32-byte digest fits in Multihash<64>"))
    }

    pub fn as_bytes(&self) -> &[u8; DIGEST_WIDTH] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl AsRef<[u8]> for Digest {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; DIGEST_WIDTH]> for Digest {
    fn from(bytes: [u8; DIGEST_WIDTH]) -> Self {
        Self(bytes)
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest({})", &self.to_hex()[..12])
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}
