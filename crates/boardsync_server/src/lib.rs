//! # boardsync server
//!
//! HTTP API for the sync engine.
//!
//! This crate provides:
//! - Job submission and polling (`POST /jobs`, `GET /jobs/{id}`)
//! - Paged record listings per board kind
//! - An error intake endpoint for companion tools
//! - API key authentication against the record store
//!
//! # Authentication
//!
//! Every route except `/ping` requires an `api-key` header holding a key
//! that is known to the store and not expired. Keys are registered with
//! [`RecordStore::add_api_key`](boardsync_core::RecordStore::add_api_key).
//! Rejected requests get `403`.
//!
//! # Responses
//!
//! Successful responses are `{"data": ...}`, failures `{"message": ...}`.
//! Submitting a kind that already has a queued or running job yields `409`.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod auth;
mod config;
mod error;
mod handler;
mod server;

pub use auth::{ApiKeyValidator, API_KEY_HEADER};
pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use handler::{
    HandlerContext, ListRecordsQuery, ReportErrorRequest, RequestHandler, SubmitJobRequest,
    VERSION,
};
pub use server::BoardsyncServer;
