//! Store directory management.
//!
//! ```text
//! <store_path>/
//! ├─ LOCK              # Advisory lock for single-writer
//! └─ store.cbor        # Snapshot of every table
//! ```
//!
//! The snapshot is rewritten after each mutation with write-then-rename.

use crate::error::{StoreError, StoreResult};
use crate::state::StoreState;
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

const LOCK_FILE: &str = "LOCK";
const SNAPSHOT_FILE: &str = "store.cbor";
const SNAPSHOT_TEMP: &str = "store.cbor.tmp";

/// Current snapshot layout version.
const FORMAT_VERSION: u16 = 1;

#[derive(Deserialize)]
struct Snapshot {
    format_version: u16,
    state: StoreState,
}

#[derive(Serialize)]
struct SnapshotRef<'a> {
    format_version: u16,
    state: &'a StoreState,
}

/// An exclusively locked store directory.
#[derive(Debug)]
pub(crate) struct StoreDir {
    path: PathBuf,
    _lock_file: File,
}

impl StoreDir {
    /// Opens or creates a store directory and takes its lock.
    ///
    /// Fails with [`StoreError::StoreLocked`] if another handle holds it.
    pub(crate) fn open(path: &Path) -> StoreResult<Self> {
        if !path.exists() {
            fs::create_dir_all(path)?;
        }
        if !path.is_dir() {
            return Err(StoreError::invalid_format(format!(
                "path is not a directory: {}",
                path.display()
            )));
        }

        let lock_file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path.join(LOCK_FILE))?;
        if lock_file.try_lock_exclusive().is_err() {
            return Err(StoreError::StoreLocked);
        }

        Ok(Self {
            path: path.to_path_buf(),
            _lock_file: lock_file,
        })
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the snapshot, or an empty state for a new store.
    pub(crate) fn load(&self) -> StoreResult<StoreState> {
        let snapshot_path = self.path.join(SNAPSHOT_FILE);
        if !snapshot_path.exists() {
            return Ok(StoreState::default());
        }
        let reader = BufReader::new(File::open(&snapshot_path)?);
        let snapshot: Snapshot =
            ciborium::de::from_reader(reader).map_err(|e| StoreError::codec(e.to_string()))?;
        if snapshot.format_version != FORMAT_VERSION {
            return Err(StoreError::invalid_format(format!(
                "unsupported snapshot version {} (expected {FORMAT_VERSION})",
                snapshot.format_version
            )));
        }
        let mut state = snapshot.state;
        state.reindex();
        Ok(state)
    }

    /// Writes `state` atomically.
    pub(crate) fn save(&self, state: &StoreState) -> StoreResult<()> {
        let temp_path = self.path.join(SNAPSHOT_TEMP);
        let snapshot = SnapshotRef {
            format_version: FORMAT_VERSION,
            state,
        };

        let file = File::create(&temp_path)?;
        let mut writer = BufWriter::new(file);
        ciborium::ser::into_writer(&snapshot, &mut writer)
            .map_err(|e| StoreError::codec(e.to_string()))?;
        writer.flush()?;
        writer
            .into_inner()
            .map_err(|e| StoreError::Io(e.into_error()))?
            .sync_all()?;

        fs::rename(&temp_path, self.path.join(SNAPSHOT_FILE))?;
        self.sync_directory()
    }

    #[cfg(unix)]
    fn sync_directory(&self) -> StoreResult<()> {
        File::open(&self.path)?.sync_all()?;
        Ok(())
    }

    #[cfg(not(unix))]
    fn sync_directory(&self) -> StoreResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn open_creates_directory() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("new_store");
        let dir = StoreDir::open(&path).unwrap();
        assert!(path.is_dir());
        assert_eq!(dir.path(), path.as_path());
    }

    #[test]
    fn lock_prevents_second_open() {
        let temp = tempdir().unwrap();
        let _dir = StoreDir::open(temp.path()).unwrap();
        assert!(matches!(
            StoreDir::open(temp.path()),
            Err(StoreError::StoreLocked)
        ));
    }

    #[test]
    fn lock_released_on_drop() {
        let temp = tempdir().unwrap();
        drop(StoreDir::open(temp.path()).unwrap());
        assert!(StoreDir::open(temp.path()).is_ok());
    }

    #[test]
    fn empty_store_loads_default() {
        let temp = tempdir().unwrap();
        let dir = StoreDir::open(temp.path()).unwrap();
        let state = dir.load().unwrap();
        assert!(state.recent_errors(10).is_empty());
    }

    #[test]
    fn snapshot_round_trip() {
        let temp = tempdir().unwrap();
        let dir = StoreDir::open(temp.path()).unwrap();
        let mut state = StoreState::default();
        state.new_error("main", "boom", chrono::Utc::now());
        dir.save(&state).unwrap();
        assert!(!temp.path().join(SNAPSHOT_TEMP).exists());

        let loaded = dir.load().unwrap();
        assert_eq!(loaded.recent_errors(1)[0].body, "boom");
    }

    #[test]
    fn garbage_snapshot_is_a_codec_error() {
        let temp = tempdir().unwrap();
        let dir = StoreDir::open(temp.path()).unwrap();
        fs::write(temp.path().join(SNAPSHOT_FILE), b"\xff\xff not cbor").unwrap();
        assert!(matches!(dir.load(), Err(StoreError::Codec(_))));
    }
}
