//! Error types for the sync engine.

use boardsync_core::{AttachmentRefError, JobId, JobKind, JobState, StoreError};
use thiserror::Error;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors that can occur while admitting or running sync jobs.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Another job of the same kind is queued or running.
    #[error("job type {kind} is already pending")]
    AlreadyPending {
        /// The contested kind.
        kind: JobKind,
    },

    /// Record store failure.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Job not found.
    #[error("job not found: {0}")]
    JobNotFound(JobId),

    /// The job is not in a state the run can start from.
    #[error("invalid job state transition from {from} to {to}")]
    InvalidTransition {
        /// Current state.
        from: JobState,
        /// Attempted target state.
        to: JobState,
    },

    /// Fetching entities from the source failed.
    #[error("source error: {0}")]
    Source(String),

    /// Downloading an attachment failed.
    #[error("download of {url} failed: {message}")]
    Download {
        /// Attachment URL.
        url: String,
        /// Error message.
        message: String,
    },

    /// Uploading to the blob store failed.
    #[error("upload failed: {0}")]
    Upload(String),

    /// Webhook notification failed.
    #[error("notification failed: {0}")]
    Notify(String),

    /// Attachment reference could not be parsed.
    #[error("malformed attachment reference: {0}")]
    MalformedAttachment(#[from] AttachmentRefError),

    /// I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The run task died before finishing, usually from a panic in a collaborator.
    #[error("run of job {id} aborted: {reason}")]
    Aborted {
        /// Job whose run died.
        id: JobId,
        /// What the runtime reported.
        reason: String,
    },
}

impl EngineError {
    /// Creates a source error.
    pub fn source_failure(message: impl Into<String>) -> Self {
        Self::Source(message.into())
    }

    /// Creates a download error.
    pub fn download(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Download {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Creates an upload error.
    pub fn upload(message: impl Into<String>) -> Self {
        Self::Upload(message.into())
    }

    /// Creates a notification error.
    pub fn notify(message: impl Into<String>) -> Self {
        Self::Notify(message.into())
    }

    /// Returns true if this is the admission conflict.
    pub fn is_already_pending(&self) -> bool {
        matches!(self, EngineError::AlreadyPending { .. })
    }

    /// Returns true for failures that only affect one entity or attachment.
    pub fn is_per_item(&self) -> bool {
        matches!(
            self,
            EngineError::Download { .. }
                | EngineError::Upload(_)
                | EngineError::MalformedAttachment(_)
        )
    }
}
