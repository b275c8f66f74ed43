//! Error types for the HTTP API.

use axum::http::StatusCode;
use boardsync_core::StoreError;
use boardsync_engine::EngineError;
use thiserror::Error;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

/// Errors returned by request handlers.
#[derive(Error, Debug)]
pub enum ServerError {
    /// Invalid request format or parameters.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Missing, unknown or expired API key.
    #[error("invalid or missing API key")]
    NotAuthorized,

    /// The addressed resource does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// A job of the requested kind is already queued or running.
    #[error("{0}")]
    Conflict(String),

    /// Record store failure.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),

    /// I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ServerError {
    /// Returns true if this is a client error (4xx).
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ServerError::InvalidRequest(_)
                | ServerError::NotAuthorized
                | ServerError::NotFound(_)
                | ServerError::Conflict(_)
        )
    }

    /// Returns true if this is a server error (5xx).
    pub fn is_server_error(&self) -> bool {
        matches!(
            self,
            ServerError::Store(_) | ServerError::Internal(_) | ServerError::Io(_)
        )
    }

    /// HTTP status for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServerError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::NotAuthorized => StatusCode::FORBIDDEN,
            ServerError::NotFound(_) => StatusCode::NOT_FOUND,
            ServerError::Conflict(_) => StatusCode::CONFLICT,
            ServerError::Store(_) | ServerError::Internal(_) | ServerError::Io(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<EngineError> for ServerError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::AlreadyPending { .. } => ServerError::Conflict(err.to_string()),
            EngineError::JobNotFound(id) => ServerError::NotFound(id.to_string()),
            EngineError::Store(store) => ServerError::Store(store),
            other => ServerError::Internal(other.to_string()),
        }
    }
}
