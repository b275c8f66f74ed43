//! Error types for the record store.

use crate::types::{JobId, JobKind};
use std::io;
use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur in record store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Another job of the same kind is queued or running.
    #[error("a {kind} job is already active")]
    ActiveJobExists {
        /// The contested kind.
        kind: JobKind,
    },

    /// Job not found.
    #[error("job not found: {0}")]
    JobNotFound(JobId),

    /// The store directory is held by another process.
    #[error("store is locked by another process")]
    StoreLocked,

    /// Snapshot could not be encoded or decoded.
    #[error("codec error: {0}")]
    Codec(String),

    /// Input rejected by the store.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Snapshot or directory layout is not what the store expects.
    #[error("invalid format: {0}")]
    InvalidFormat(String),
}

impl StoreError {
    /// Creates a codec error.
    pub fn codec(message: impl Into<String>) -> Self {
        Self::Codec(message.into())
    }

    /// Creates an invalid input error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    /// Creates an invalid format error.
    pub fn invalid_format(message: impl Into<String>) -> Self {
        Self::InvalidFormat(message.into())
    }

    /// Returns true if the error is the per-kind uniqueness violation.
    pub fn is_active_job_conflict(&self) -> bool {
        matches!(self, StoreError::ActiveJobExists { .. })
    }
}
