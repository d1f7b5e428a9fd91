//! Batch Module
//!
//! In-memory collection of recent digests awaiting their flush.
//!
//! ## Responsibilities
//! - Keep pending digests sorted and duplicate-free
//! - Report when the configured capacity is reached
//! - Turn the pending digests into a bloc for the carry pass
//!
//! ## Data Structure Choice
//! Using BTreeSet:
//! - Ordered digests (required for bloc generation)
//! - Duplicate collapsing for free
//! - Capacity is small (hundreds), so a flat sorted vector buys nothing

mod collector;

pub use collector::BatchCollector;
