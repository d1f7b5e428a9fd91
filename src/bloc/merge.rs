//! Bloc merge
//!
//! Linear two-pointer merge of two sorted blocs.

use bytes::{BufMut, BytesMut};

use crate::digest::DIGEST_WIDTH;

use super::Bloc;

impl Bloc {
    /// Merge with `other` into a new sorted bloc.
    ///
    /// Ties go to `self`. Equal digests from the two sides are both kept, so
    /// the result always holds `self.len() + other.len()` digests.
    pub fn merged(&self, other: &Bloc) -> Bloc {
        let left = self.as_bytes();
        let right = other.as_bytes();
        let mut out = BytesMut::with_capacity(left.len() + right.len());

        let (mut l, mut r) = (0, 0);
        while l < left.len() && r < right.len() {
            let a = &left[l..l + DIGEST_WIDTH];
            let b = &right[r..r + DIGEST_WIDTH];
            if a <= b {
                out.put_slice(a);
                l += DIGEST_WIDTH;
            } else {
                out.put_slice(b);
                r += DIGEST_WIDTH;
            }
        }

        // At most one side has a remainder, already sorted
        out.put_slice(&left[l..]);
        out.put_slice(&right[r..]);

        Bloc { data: out.freeze() }
    }
}
