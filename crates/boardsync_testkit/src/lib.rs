//! # boardsync testkit
//!
//! Test utilities for boardsync.
//!
//! This crate provides:
//! - Builders for source entities
//! - A ready-wired engine over in-memory collaborators and a temporary store
//! - Property-based test generators using proptest
//!
//! ## Usage
//!
//! ```rust,ignore
//! use boardsync_testkit::prelude::*;
//!
//! #[tokio::test]
//! async fn test_with_engine() {
//!     let env = TestEngine::new();
//!     env.source.set_entities(RecordKind::Property, vec![
//!         EntityBuilder::property("c1", "Lot 1").build(),
//!     ]);
//!     let job = env.engine.run_job(JobKind::Properties).await.unwrap();
//!     assert_eq!(job.processed, 1);
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use boardsync_core::{JobKind, JobState, RecordKind, RecordStore};
}

pub use fixtures::*;
pub use generators::*;
