//! Tests for digests, blocs and manifests
//!
//! These tests verify:
//! - Digest ordering is a total order over 32-byte values
//! - Level assignment is the smallest L with size <= 2^L
//! - Merge keeps every element and stays sorted
//! - Manifest encoding round-trips in level order

mod level_tests;
