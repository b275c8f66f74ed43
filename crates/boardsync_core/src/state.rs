//! In-memory tables shared by every store flavour.

use crate::attachment::AttachmentMapping;
use crate::audit::ErrorRecord;
use crate::credential::{hash_api_key, ApiKey};
use crate::error::{StoreError, StoreResult};
use crate::record::{PageRequest, RecordPage, StoredRecord, SyncedRecord, UpsertOutcome};
use crate::types::{Job, JobId, JobKind, RecordId, RecordKind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

type NaturalKey = (RecordKind, String, String);

/// All tables of a store.
///
/// The natural-key index is derived data and rebuilt after decoding.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct StoreState {
    next_record_id: u64,
    next_job_id: u64,
    next_error_id: u64,
    records: BTreeMap<RecordId, StoredRecord>,
    jobs: BTreeMap<JobId, Job>,
    mappings: BTreeMap<String, AttachmentMapping>,
    errors: Vec<ErrorRecord>,
    api_keys: BTreeMap<String, ApiKey>,
    #[serde(skip)]
    by_natural_key: HashMap<NaturalKey, RecordId>,
}

fn natural_key(kind: RecordKind, board_id: &str, card_id: &str) -> NaturalKey {
    (kind, board_id.to_string(), card_id.to_string())
}

impl StoreState {
    /// Rebuilds derived indexes after decoding.
    pub(crate) fn reindex(&mut self) {
        self.by_natural_key = self
            .records
            .values()
            .map(|r| {
                let key = natural_key(r.record.kind(), &r.record.board_id, &r.record.card_id);
                (key, r.id)
            })
            .collect();
    }

    pub(crate) fn upsert_record(&mut self, record: &SyncedRecord) -> StoreResult<UpsertOutcome> {
        if record.card_id.is_empty() {
            return Err(StoreError::invalid_input("record has an empty card id"));
        }
        let key = natural_key(record.kind(), &record.board_id, &record.card_id);
        if let Some(&id) = self.by_natural_key.get(&key) {
            self.records.insert(
                id,
                StoredRecord {
                    id,
                    record: record.clone(),
                },
            );
            return Ok(UpsertOutcome {
                inserted: false,
                id,
            });
        }

        self.next_record_id += 1;
        let id = RecordId::new(self.next_record_id);
        self.records.insert(
            id,
            StoredRecord {
                id,
                record: record.clone(),
            },
        );
        self.by_natural_key.insert(key, id);
        Ok(UpsertOutcome { inserted: true, id })
    }

    pub(crate) fn get_record(
        &self,
        kind: RecordKind,
        board_id: &str,
        card_id: &str,
    ) -> Option<StoredRecord> {
        self.by_natural_key
            .get(&natural_key(kind, board_id, card_id))
            .and_then(|id| self.records.get(id))
            .cloned()
    }

    pub(crate) fn list_records(
        &self,
        kind: RecordKind,
        board_id: &str,
        page: &PageRequest,
    ) -> RecordPage {
        let matching = self
            .records
            .values()
            .filter(|r| r.record.kind() == kind && r.record.board_id == board_id)
            .cloned()
            .collect();
        page.apply(matching)
    }

    pub(crate) fn records_with_attachments(&self, kind: RecordKind) -> Vec<StoredRecord> {
        self.records
            .values()
            .filter(|r| r.record.kind() == kind && !r.record.attachments.is_empty())
            .cloned()
            .collect()
    }

    pub(crate) fn attachment_mapping(&self, source_url: &str) -> Option<AttachmentMapping> {
        self.mappings.get(source_url).cloned()
    }

    pub(crate) fn map_attachment(
        &mut self,
        source_url: &str,
        destination_url: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<AttachmentMapping> {
        if source_url.is_empty() {
            return Err(StoreError::invalid_input("attachment source url is empty"));
        }
        let mapping = self
            .mappings
            .entry(source_url.to_string())
            .or_insert_with(|| AttachmentMapping {
                source_url: source_url.to_string(),
                destination_url: destination_url.to_string(),
                mapped_at: now,
            });
        Ok(mapping.clone())
    }

    pub(crate) fn new_job(&mut self, kind: JobKind, started_at: DateTime<Utc>) -> StoreResult<JobId> {
        if self.active_job(kind).is_some() {
            return Err(StoreError::ActiveJobExists { kind });
        }
        self.next_job_id += 1;
        let id = JobId::new(self.next_job_id);
        self.jobs.insert(id, Job::queued(id, kind, started_at));
        Ok(id)
    }

    pub(crate) fn update_job(&mut self, job: &Job) -> StoreResult<()> {
        if job.is_active() {
            if let Some(other) = self.active_job(job.kind) {
                if other.id != job.id {
                    return Err(StoreError::ActiveJobExists { kind: job.kind });
                }
            }
        }
        match self.jobs.get_mut(&job.id) {
            Some(slot) => {
                *slot = job.clone();
                Ok(())
            }
            None => Err(StoreError::JobNotFound(job.id)),
        }
    }

    pub(crate) fn get_job(&self, id: JobId) -> Option<Job> {
        self.jobs.get(&id).cloned()
    }

    pub(crate) fn active_job(&self, kind: JobKind) -> Option<Job> {
        self.jobs
            .values()
            .find(|j| j.kind == kind && j.is_active())
            .cloned()
    }

    pub(crate) fn new_error(&mut self, source: &str, body: &str, now: DateTime<Utc>) -> ErrorRecord {
        self.next_error_id += 1;
        let record = ErrorRecord {
            id: self.next_error_id,
            source: source.to_string(),
            body: body.to_string(),
            occurred_at: now,
        };
        self.errors.push(record.clone());
        record
    }

    pub(crate) fn recent_errors(&self, limit: usize) -> Vec<ErrorRecord> {
        self.errors.iter().rev().take(limit).cloned().collect()
    }

    pub(crate) fn add_api_key(&mut self, raw_key: &str, expires_at: DateTime<Utc>) -> StoreResult<()> {
        if raw_key.is_empty() {
            return Err(StoreError::invalid_input("api key is empty"));
        }
        let key = ApiKey::new(raw_key, expires_at);
        self.api_keys.insert(key.key_hash.clone(), key);
        Ok(())
    }

    pub(crate) fn is_api_key_valid(&self, raw_key: &str, now: DateTime<Utc>) -> bool {
        self.api_keys
            .get(&hash_api_key(raw_key))
            .is_some_and(|key| key.is_valid_at(now))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{RecordAttributes, SupportiveDocAttributes};
    use crate::types::JobState;

    fn doc(card: &str, title: &str) -> SyncedRecord {
        SyncedRecord {
            board_id: "board".into(),
            card_id: card.into(),
            name: title.into(),
            attributes: RecordAttributes::SupportiveDoc(SupportiveDocAttributes {
                title: title.into(),
                category: "deeds".into(),
            }),
            labels: vec![],
            attachments: vec![],
            comments: vec![],
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn upsert_overwrites_in_place() {
        let mut state = StoreState::default();
        let first = state.upsert_record(&doc("c1", "one")).unwrap();
        let second = state.upsert_record(&doc("c1", "two")).unwrap();
        assert!(first.inserted);
        assert!(!second.inserted);
        assert_eq!(first.id, second.id);
        let stored = state
            .get_record(RecordKind::SupportiveDoc, "board", "c1")
            .unwrap();
        assert_eq!(stored.record.name, "two");
    }

    #[test]
    fn natural_key_is_scoped_by_kind() {
        let mut state = StoreState::default();
        let mut other = doc("c1", "x");
        other.attributes = RecordAttributes::InheritanceConfinement(Default::default());
        assert!(state.upsert_record(&doc("c1", "x")).unwrap().inserted);
        assert!(state.upsert_record(&other).unwrap().inserted);
    }

    #[test]
    fn empty_card_id_is_rejected() {
        let mut state = StoreState::default();
        assert!(state.upsert_record(&doc("", "x")).is_err());
    }

    #[test]
    fn reindex_restores_lookup() {
        let mut state = StoreState::default();
        state.upsert_record(&doc("c1", "x")).unwrap();
        state.by_natural_key.clear();
        state.reindex();
        assert!(!state.upsert_record(&doc("c1", "y")).unwrap().inserted);
    }

    #[test]
    fn second_active_job_is_rejected() {
        let mut state = StoreState::default();
        let now = Utc::now();
        let id = state.new_job(JobKind::Properties, now).unwrap();
        assert!(matches!(
            state.new_job(JobKind::Properties, now),
            Err(StoreError::ActiveJobExists { .. })
        ));
        assert!(state.new_job(JobKind::Attachments, now).is_ok());

        let mut job = state.get_job(id).unwrap();
        job.transition(JobState::Running);
        job.finish(JobState::Completed, 0, 0, now);
        state.update_job(&job).unwrap();
        assert!(state.new_job(JobKind::Properties, now).is_ok());
    }

    #[test]
    fn update_unknown_job_fails() {
        let mut state = StoreState::default();
        let job = Job::queued(JobId::new(42), JobKind::Properties, Utc::now());
        assert!(matches!(
            state.update_job(&job),
            Err(StoreError::JobNotFound(_))
        ));
    }

    #[test]
    fn mapping_is_never_overwritten() {
        let mut state = StoreState::default();
        let now = Utc::now();
        let first = state.map_attachment("src", "dst-1", now).unwrap();
        let second = state.map_attachment("src", "dst-2", now).unwrap();
        assert_eq!(first, second);
        assert_eq!(state.attachment_mapping("src").unwrap().destination_url, "dst-1");
    }

    #[test]
    fn recent_errors_newest_first() {
        let mut state = StoreState::default();
        let now = Utc::now();
        state.new_error("main", "a", now);
        state.new_error("main", "b", now);
        state.new_error("main", "c", now);
        let bodies: Vec<String> = state.recent_errors(2).into_iter().map(|e| e.body).collect();
        assert_eq!(bodies, vec!["c", "b"]);
    }
}
