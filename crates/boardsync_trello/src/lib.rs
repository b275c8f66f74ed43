//! # boardsync Trello source
//!
//! [`SourceClient`](boardsync_engine::SourceClient) implementation for
//! Trello boards.
//!
//! This crate provides:
//! - Card listing with custom field, label, attachment and comment lookups
//! - Resolution of custom fields onto typed record attributes by field name
//! - Authenticated attachment downloads into a local staging directory
//!
//! ## Field names
//!
//! | Kind | Fields |
//! |------|--------|
//! | property | `Location AR`, `Location EN`, `Lot`, `Type`, `Status`, `Owner`, `Area`, `Shares`, `Organized`, `Effects` |
//! | inheritance confinement | `Title`, `Generation` |
//! | supportive doc | `Title`, `Category` |
//!
//! Missing numeric fields read as zero and missing checkboxes as false.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod client;
mod config;
mod fields;
mod model;
mod url;

pub use client::TrelloClient;
pub use config::{TrelloConfig, DEFAULT_BASE_URL};
pub use fields::CardFields;
pub use url::{parse_download_url, DownloadTarget};
