//! # boardsync engine
//!
//! Job admission, sync runs and attachment mirroring.
//!
//! This crate provides:
//! - Admission control (at most one queued or running job per kind)
//! - The run state machine (`queued → running → completed | cancelled`)
//! - Record synchronization with last-write-wins upsert
//! - Attachment mirroring, deduplicated by source URL
//! - Webhook notification and the process-wide error channel
//! - Source, blob store and notifier abstractions with test doubles
//!
//! ## Run lifecycle
//!
//! 1. Load the job and persist it as `running`. Failure here aborts the run
//!    and is reported on the error channel.
//! 2. Fetch and process items one at a time, checking cancellation before
//!    each. Fetch and per-item failures are counted, never thrown.
//! 3. Persist the terminal state and counters, exactly once.
//! 4. Notify the kind's webhook, unless the run was cancelled.
//!
//! `completed` means the run finished, not that every item succeeded.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod admission;
mod blob;
mod config;
mod engine;
mod error;
mod mirror;
mod notify;
mod report;
mod run;
mod source;
mod transform;

pub use admission::AdmissionController;
pub use blob::{BlobStore, FsBlobConfig, FsBlobStore, MemoryBlobStore, StoredBlob};
pub use config::{BoardConfig, EngineConfig};
pub use engine::{EngineParts, SyncEngine};
pub use error::{EngineError, EngineResult};
pub use mirror::{attachment_refs, AttachmentMirror, MirrorOutcome};
pub use notify::{Notifier, RecordingNotifier, WebhookNotifier};
pub use report::{ErrorReceiver, ErrorSink, ReportedError, Supervisor};
pub use run::RunTally;
pub use source::{
    DownloadedAttachment, MockSourceClient, RawAttachment, RawComment, RawEntity, RawLabel,
    SourceClient,
};
pub use transform::to_record;
