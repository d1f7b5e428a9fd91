//! Content addresses
//!
//! An address is the SHA2-256 of the stored bytes. Its text form is the
//! CIDv0 string (base58btc sha2-256 multihash), which is what an IPFS node
//! hands back for added content.

use std::fmt;

use cid::Cid;
use multihash::Multihash;
use serde::{Deserialize, Serialize};

use crate::digest::{Digest, DIGEST_WIDTH};
use crate::error::{BlocError, Result};

/// Width of an address inside a manifest record
pub const ADDRESS_WIDTH: usize = DIGEST_WIDTH;

/// Address of an object in a [`ContentStore`](super::ContentStore)
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Address([u8; ADDRESS_WIDTH]);

impl Address {
    /// Address the given bytes would be stored under
    pub fn of(bytes: &[u8]) -> Self {
        Self(*Digest::sha256(bytes).as_bytes())
    }

    pub const fn new(bytes: [u8; ADDRESS_WIDTH]) -> Self {
        Self(bytes)
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        Ok(Self(*Digest::from_slice(bytes)?.as_bytes()))
    }

    /// Parse a CIDv0/CIDv1 string or a 64-char hex digest.
    ///
    /// The CID must carry a sha2-256 multihash.
    pub fn parse(text: &str) -> Result<Self> {
        if text.len() == 2 * ADDRESS_WIDTH && text.chars().all(|c| c.is_ascii_hexdigit()) {
            let bytes = hex::decode(text)
                .map_err(|e| BlocError::DigestAlgorithm(format!("invalid hex address: {e}")))?;
            return Self::from_slice(&bytes);
        }
        let cid = Cid::try_from(text)
            .map_err(|e| BlocError::DigestAlgorithm(format!("invalid CID '{text}': {e}")))?;
        let digest = Digest::from_parsed_multihash(cid.hash())?;
        Ok(Self(*digest.as_bytes()))
    }

    pub fn as_bytes(&self) -> &[u8; ADDRESS_WIDTH] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn to_multihash(&self) -> Multihash<64> {
        Digest::new(self.0).to_multihash()
    }

    /// CIDv0 form of this address
    pub fn to_cid(&self) -> Result<Cid> {
        Cid::new_v0(self.to_multihash())
            .map_err(|e| BlocError::DigestAlgorithm(format!("cannot build CIDv0: {e}")))
    }
}

impl From<Digest> for Address {
    fn from(digest: Digest) -> Self {
        Self(*digest.as_bytes())
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_cid() {
            Ok(cid) => write!(f, "{cid}"),
            Err(_) => f.write_str(&self.to_hex()),
        }
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", &self.to_hex()[..12])
    }
}
