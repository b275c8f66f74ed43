//! Job command implementation.

use boardsync_core::{JobId, LocalRecordStore, RecordStore};
use std::path::Path;

/// Prints a job as JSON.
pub fn run(store_path: &Path, id: u64) -> Result<(), Box<dyn std::error::Error>> {
    let store = LocalRecordStore::open(store_path)?;
    let id = JobId::new(id);
    let job = store.get_job(id)?.ok_or_else(|| format!("{id} not found"))?;
    println!("{}", serde_json::to_string_pretty(&job)?);
    Ok(())
}
