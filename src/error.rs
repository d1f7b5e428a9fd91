//! Error types for blocstack
//!
//! Provides a unified error type for all operations.

use thiserror::Error;

use crate::store::Address;

/// Result type alias using BlocError
pub type Result<T> = std::result::Result<T, BlocError>;

/// Unified error type for blocstack operations
#[derive(Debug, Error)]
pub enum BlocError {
    // -------------------------------------------------------------------------
    // Validity Errors (caller or data contract violations, never retried)
    // -------------------------------------------------------------------------
    #[error("bloc length must be a positive multiple of 32, got {0}")]
    InvalidBlocLength(usize),

    #[error("digest must be exactly 32 bytes, got {0}")]
    DigestWidth(usize),

    #[error("bloc cannot be empty")]
    EmptyBloc,

    #[error("unsupported digest algorithm: {0}")]
    DigestAlgorithm(String),

    #[error("carry propagated past the last level (reached level {0})")]
    LevelOverflow(usize),

    // -------------------------------------------------------------------------
    // Store Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("object not found: {0}")]
    NotFound(Address),

    #[error("Store error: {0}")]
    Store(String),

    #[error("corrupt object {address}: {reason}")]
    CorruptObject { address: Address, reason: String },

    // -------------------------------------------------------------------------
    // Manifest / Serialization Errors
    // -------------------------------------------------------------------------
    #[error("Manifest error: {0}")]
    Manifest(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    // -------------------------------------------------------------------------
    // Publish Errors
    // -------------------------------------------------------------------------
    #[error("Publish error: {0}")]
    Publish(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl BlocError {
    /// Whether retrying the failed operation can succeed.
    ///
    /// Store and I/O faults are retryable; validity errors mean the inputs or
    /// the stored data are wrong and a retry would fail the same way.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            BlocError::Io(_) | BlocError::Store(_) | BlocError::NotFound(_)
        )
    }
}

impl From<bincode::Error> for BlocError {
    fn from(err: bincode::Error) -> Self {
        BlocError::Serialization(err.to_string())
    }
}
