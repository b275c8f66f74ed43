//! Add-key command implementation.

use boardsync_core::{LocalRecordStore, RecordStore};
use chrono::{Duration, Utc};
use std::path::Path;

/// Registers an API key valid for `days` days.
pub fn run(store_path: &Path, key: &str, days: u32) -> Result<(), Box<dyn std::error::Error>> {
    if days == 0 {
        return Err("key lifetime must be at least one day".into());
    }
    let store = LocalRecordStore::open(store_path)?;
    let expires_at = Utc::now() + Duration::days(i64::from(days));
    store.add_api_key(key, expires_at)?;
    println!("key registered, expires {}", expires_at.to_rfc3339());
    Ok(())
}
