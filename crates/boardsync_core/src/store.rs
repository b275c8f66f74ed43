//! The record store contract.

use crate::attachment::AttachmentMapping;
use crate::audit::ErrorRecord;
use crate::error::StoreResult;
use crate::record::{PageRequest, RecordPage, StoredRecord, SyncedRecord, UpsertOutcome};
use crate::types::{Job, JobId, JobKind, RecordKind};
use chrono::{DateTime, Utc};

/// Durable keyed storage for records, jobs, attachment mappings, error
/// reports and API keys.
///
/// Implementations must be safe to share between concurrent runs. Every
/// method is a single atomic statement; callers never hold a lock across
/// calls.
pub trait RecordStore: Send + Sync {
    /// Inserts `record`, or overwrites every field of the row with the same
    /// kind, board and card id. The row id is preserved on overwrite.
    fn upsert_record(&self, record: &SyncedRecord) -> StoreResult<UpsertOutcome>;

    /// Looks up a record by its natural key.
    fn get_record(
        &self,
        kind: RecordKind,
        board_id: &str,
        card_id: &str,
    ) -> StoreResult<Option<StoredRecord>>;

    /// Lists the records of one board.
    fn list_records(
        &self,
        kind: RecordKind,
        board_id: &str,
        page: &PageRequest,
    ) -> StoreResult<RecordPage>;

    /// Records of `kind` with at least one attachment, in row id order.
    fn records_with_attachments(&self, kind: RecordKind) -> StoreResult<Vec<StoredRecord>>;

    /// Returns the mapping recorded for `source_url`.
    fn attachment_mapping(&self, source_url: &str) -> StoreResult<Option<AttachmentMapping>>;

    /// Returns true if `source_url` has already been mirrored.
    fn is_attachment_mapped(&self, source_url: &str) -> StoreResult<bool> {
        Ok(self.attachment_mapping(source_url)?.is_some())
    }

    /// Records that `source_url` was copied to `destination_url`.
    ///
    /// If a mapping already exists it is returned unchanged.
    fn map_attachment(
        &self,
        source_url: &str,
        destination_url: &str,
    ) -> StoreResult<AttachmentMapping>;

    /// Inserts a queued job.
    ///
    /// Fails with [`StoreError::ActiveJobExists`](crate::StoreError::ActiveJobExists)
    /// if a queued or running job of `kind` exists. The check and the insert
    /// are one atomic step.
    fn new_job(&self, kind: JobKind, started_at: DateTime<Utc>) -> StoreResult<JobId>;

    /// Replaces a job row.
    fn update_job(&self, job: &Job) -> StoreResult<()>;

    /// Loads a job.
    fn get_job(&self, id: JobId) -> StoreResult<Option<Job>>;

    /// The queued or running job of `kind`, if any.
    fn active_job(&self, kind: JobKind) -> StoreResult<Option<Job>>;

    /// Returns true if a queued or running job of `kind` exists.
    fn has_pending_job(&self, kind: JobKind) -> StoreResult<bool> {
        Ok(self.active_job(kind)?.is_some())
    }

    /// Appends an error report.
    fn new_error(&self, source: &str, body: &str) -> StoreResult<ErrorRecord>;

    /// The newest `limit` error reports, newest first.
    fn recent_errors(&self, limit: usize) -> StoreResult<Vec<ErrorRecord>>;

    /// Registers an API key, replacing the expiry of an existing one.
    fn add_api_key(&self, raw_key: &str, expires_at: DateTime<Utc>) -> StoreResult<()>;

    /// Returns true if `raw_key` is registered and unexpired at `now`.
    fn is_api_key_valid(&self, raw_key: &str, now: DateTime<Utc>) -> StoreResult<bool>;
}
