//! # boardsync core
//!
//! Data model and record store for the board synchronization service.
//!
//! This crate provides:
//! - Job identity, kinds and the `queued → running → completed | cancelled` lifecycle
//! - Synchronized records keyed by `(board id, card id)` with last-write-wins upsert
//! - Attachment references and the write-once attachment mapping table
//! - The append-only error log and API key registry
//! - [`LocalRecordStore`], an embedded store kept in memory or in a locked
//!   directory with atomic CBOR snapshots
//!
//! ## Key Invariants
//!
//! - At most one queued or running job per kind, enforced by the store
//! - A record is inserted or overwritten entirely, never merged
//! - An attachment mapping, once written, is never updated or removed

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod attachment;
mod audit;
mod credential;
mod dir;
mod error;
mod local;
mod record;
mod state;
mod store;
mod types;

pub use attachment::{
    normalize_label, AttachmentMapping, AttachmentRef, AttachmentRefError, REF_SEPARATOR,
};
pub use audit::ErrorRecord;
pub use credential::{hash_api_key, ApiKey};
pub use error::{StoreError, StoreResult};
pub use local::LocalRecordStore;
pub use record::{
    ConfinementAttributes, PageRequest, PropertyAttributes, RecordAttributes, RecordOrder,
    RecordPage, SortDirection, StoredRecord, SupportiveDocAttributes, SyncedRecord,
    UpsertOutcome,
};
pub use store::RecordStore;
pub use types::{Job, JobId, JobKind, JobState, RecordId, RecordKind, UnknownJobKind};
