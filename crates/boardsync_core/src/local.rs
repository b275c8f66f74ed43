//! Embedded record store, in memory or backed by a locked directory.
//!
//! The file-backed mode writes the whole snapshot on every mutation, so a
//! run over N cards writes O(N²) bytes in total. That is fine for boards of a
//! few thousand cards; larger boards need an append-only journal compacted
//! into the snapshot on open.

use crate::attachment::AttachmentMapping;
use crate::audit::ErrorRecord;
use crate::dir::StoreDir;
use crate::error::StoreResult;
use crate::record::{PageRequest, RecordPage, StoredRecord, SyncedRecord, UpsertOutcome};
use crate::state::StoreState;
use crate::store::RecordStore;
use crate::types::{Job, JobId, JobKind, RecordKind};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::path::Path;

/// An embedded [`RecordStore`].
///
/// All tables live in memory behind one lock. A file-backed store also
/// rewrites its snapshot before a mutation becomes visible, so a failed
/// write leaves both memory and disk at the previous state.
///
/// # Example
///
/// ```
/// use boardsync_core::{JobKind, LocalRecordStore, RecordStore};
///
/// let store = LocalRecordStore::open_in_memory();
/// let id = store.new_job(JobKind::Properties, chrono::Utc::now()).unwrap();
/// assert!(store.has_pending_job(JobKind::Properties).unwrap());
/// assert_eq!(store.get_job(id).unwrap().unwrap().kind, JobKind::Properties);
/// ```
#[derive(Debug)]
pub struct LocalRecordStore {
    state: RwLock<StoreState>,
    dir: Option<StoreDir>,
}

impl LocalRecordStore {
    /// Creates a volatile store.
    #[must_use]
    pub fn open_in_memory() -> Self {
        Self {
            state: RwLock::new(StoreState::default()),
            dir: None,
        }
    }

    /// Opens or creates a store directory, taking its exclusive lock.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let dir = StoreDir::open(path.as_ref())?;
        let state = dir.load()?;
        tracing::debug!(path = %dir.path().display(), "opened record store");
        Ok(Self {
            state: RwLock::new(state),
            dir: Some(dir),
        })
    }

    /// Returns the directory of a file-backed store.
    pub fn path(&self) -> Option<&Path> {
        self.dir.as_ref().map(StoreDir::path)
    }

    fn read<T>(&self, f: impl FnOnce(&StoreState) -> T) -> T {
        f(&self.state.read())
    }

    // TODO: append mutations to a journal next to store.cbor and compact on
    // open, instead of re-encoding the full snapshot per call.
    fn mutate<T>(&self, f: impl FnOnce(&mut StoreState) -> StoreResult<T>) -> StoreResult<T> {
        let mut guard = self.state.write();
        match &self.dir {
            None => f(&mut guard),
            Some(dir) => {
                let mut next = guard.clone();
                let out = f(&mut next)?;
                dir.save(&next)?;
                *guard = next;
                Ok(out)
            }
        }
    }
}

impl RecordStore for LocalRecordStore {
    fn upsert_record(&self, record: &SyncedRecord) -> StoreResult<UpsertOutcome> {
        self.mutate(|s| s.upsert_record(record))
    }

    fn get_record(
        &self,
        kind: RecordKind,
        board_id: &str,
        card_id: &str,
    ) -> StoreResult<Option<StoredRecord>> {
        Ok(self.read(|s| s.get_record(kind, board_id, card_id)))
    }

    fn list_records(
        &self,
        kind: RecordKind,
        board_id: &str,
        page: &PageRequest,
    ) -> StoreResult<RecordPage> {
        Ok(self.read(|s| s.list_records(kind, board_id, page)))
    }

    fn records_with_attachments(&self, kind: RecordKind) -> StoreResult<Vec<StoredRecord>> {
        Ok(self.read(|s| s.records_with_attachments(kind)))
    }

    fn attachment_mapping(&self, source_url: &str) -> StoreResult<Option<AttachmentMapping>> {
        Ok(self.read(|s| s.attachment_mapping(source_url)))
    }

    fn map_attachment(
        &self,
        source_url: &str,
        destination_url: &str,
    ) -> StoreResult<AttachmentMapping> {
        let now = Utc::now();
        self.mutate(|s| s.map_attachment(source_url, destination_url, now))
    }

    fn new_job(&self, kind: JobKind, started_at: DateTime<Utc>) -> StoreResult<JobId> {
        self.mutate(|s| s.new_job(kind, started_at))
    }

    fn update_job(&self, job: &Job) -> StoreResult<()> {
        self.mutate(|s| s.update_job(job))
    }

    fn get_job(&self, id: JobId) -> StoreResult<Option<Job>> {
        Ok(self.read(|s| s.get_job(id)))
    }

    fn active_job(&self, kind: JobKind) -> StoreResult<Option<Job>> {
        Ok(self.read(|s| s.active_job(kind)))
    }

    fn new_error(&self, source: &str, body: &str) -> StoreResult<ErrorRecord> {
        let now = Utc::now();
        self.mutate(|s| Ok(s.new_error(source, body, now)))
    }

    fn recent_errors(&self, limit: usize) -> StoreResult<Vec<ErrorRecord>> {
        Ok(self.read(|s| s.recent_errors(limit)))
    }

    fn add_api_key(&self, raw_key: &str, expires_at: DateTime<Utc>) -> StoreResult<()> {
        self.mutate(|s| s.add_api_key(raw_key, expires_at))
    }

    fn is_api_key_valid(&self, raw_key: &str, now: DateTime<Utc>) -> StoreResult<bool> {
        Ok(self.read(|s| s.is_api_key_valid(raw_key, now)))
    }
}
