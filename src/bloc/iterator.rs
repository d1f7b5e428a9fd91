//! Bloc Iterator
//!
//! Sequential iteration over the digests of a bloc.

use std::slice::ChunksExact;

use crate::digest::{Digest, DIGEST_WIDTH};

/// Iterator over bloc digests in stored (sorted) order
pub struct BlocIter<'a> {
    chunks: ChunksExact<'a, u8>,
}

impl<'a> BlocIter<'a> {
    pub(super) fn new(data: &'a [u8]) -> Self {
        Self {
            chunks: data.chunks_exact(DIGEST_WIDTH),
        }
    }
}

impl Iterator for BlocIter<'_> {
    type Item = Digest;

    fn next(&mut self) -> Option<Self::Item> {
        // Bloc length is validated on construction, every chunk is full width
        self.chunks.next().and_then(|chunk| Digest::from_slice(chunk).ok())
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.chunks.size_hint()
    }
}

impl ExactSizeIterator for BlocIter<'_> {}
