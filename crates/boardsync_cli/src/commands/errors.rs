//! Errors command implementation.

use boardsync_core::{LocalRecordStore, RecordStore};
use std::path::Path;

/// Prints the most recent error records, newest first.
pub fn run(store_path: &Path, limit: usize, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let store = LocalRecordStore::open(store_path)?;
    let errors = store.recent_errors(limit)?;

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&errors)?);
        return Ok(());
    }
    if errors.is_empty() {
        println!("no errors recorded");
    }
    for error in errors {
        println!(
            "{}  [{}] {}",
            error.occurred_at.to_rfc3339(),
            error.source,
            error.body
        );
    }
    Ok(())
}
