//! One sync run: the job state machine and its per-kind bodies.
//!
//! ```text
//! load job ──► running ──► body ──► finalize ──► notify
//!    │                                 ▲
//!    └─ setup error: no finalization   └─ exactly once, on every body exit
//! ```
//!
//! The engine drives each run in its own task. If that task dies (a panicking
//! collaborator), [`RunContext::abandon`] finalizes the job as cancelled with
//! one counted error instead.

use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::mirror::{attachment_refs, AttachmentMirror};
use crate::notify::Notifier;
use crate::report::ErrorSink;
use crate::source::SourceClient;
use crate::transform::to_record;
use boardsync_core::{Job, JobId, JobKind, JobState, RecordKind, RecordStore};
use chrono::Utc;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Counters accumulated by a run body.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunTally {
    /// Items handled successfully.
    pub processed: u64,
    /// Counted failures.
    pub errors: u64,
    /// True if the body stopped because cancellation was observed.
    pub cancelled: bool,
}

impl RunTally {
    /// Terminal state the job is finalized with.
    pub fn final_state(&self) -> JobState {
        if self.cancelled {
            JobState::Cancelled
        } else {
            JobState::Completed
        }
    }
}

/// Everything a run needs, shared by all runs of an engine.
pub(crate) struct RunContext {
    pub(crate) config: EngineConfig,
    pub(crate) store: Arc<dyn RecordStore>,
    pub(crate) source: Arc<dyn SourceClient>,
    pub(crate) mirror: AttachmentMirror,
    pub(crate) notifier: Arc<dyn Notifier>,
    pub(crate) errors: ErrorSink,
}

impl RunContext {
    /// Runs an admitted job to a terminal state.
    ///
    /// Errors are setup or finalization failures; everything else is counted
    /// on the job.
    pub(crate) async fn execute(&self, id: JobId, cancel: CancellationToken) -> EngineResult<Job> {
        let kind = self.start(id)?;
        tracing::info!("run started");

        let tally = match kind.record_kind() {
            Some(record_kind) => self.sync_records(record_kind, &cancel).await,
            None => self.mirror_attachments(&cancel).await,
        };

        let job = self.finalize(id, tally)?;
        tracing::info!(
            state = %job.state,
            processed = job.processed,
            errors = job.errors,
            "run finished"
        );

        if job.state == JobState::Completed {
            self.notify(kind).await;
        }
        Ok(job)
    }

    fn start(&self, id: JobId) -> EngineResult<JobKind> {
        let mut job = self.store.get_job(id)?.ok_or(EngineError::JobNotFound(id))?;
        if !job.transition(JobState::Running) {
            return Err(EngineError::InvalidTransition {
                from: job.state,
                to: JobState::Running,
            });
        }
        self.store.update_job(&job)?;
        Ok(job.kind)
    }

    /// Persists the final state. A job reconciled while this run was in
    /// flight keeps its reconciled state.
    /// Finalizes a job whose run task died without reaching finalization.
    ///
    /// A job the run never moved to running is left for stale reconciliation.
    pub(crate) fn abandon(&self, id: JobId, reason: &str) {
        tracing::error!(reason, "run task died");
        self.errors
            .report("engine", format!("run of job {id} aborted: {reason}"));

        let result = self.store.get_job(id).map_err(EngineError::from).and_then(|job| {
            let Some(mut job) = job else {
                return Ok(());
            };
            if job.state != JobState::Running {
                return Ok(());
            }
            let (processed, errors) = (job.processed, job.errors + 1);
            if job.finish(JobState::Cancelled, processed, errors, Utc::now()) {
                self.store.update_job(&job)?;
            }
            Ok(())
        });
        if let Err(err) = result {
            tracing::error!(error = %err, "failed to finalize aborted job");
            self.errors
                .report("engine", format!("failed to finalize job {id}: {err}"));
        }
    }

    fn finalize(&self, id: JobId, tally: RunTally) -> EngineResult<Job> {
        let result = self.store.get_job(id).map_err(EngineError::from).and_then(|job| {
            let mut job = job.ok_or(EngineError::JobNotFound(id))?;
            if job.state.is_terminal() {
                tracing::warn!(state = %job.state, "job was finalized elsewhere during the run");
                return Ok(job);
            }
            let state = tally.final_state();
            if !job.finish(state, tally.processed, tally.errors, Utc::now()) {
                return Err(EngineError::InvalidTransition {
                    from: job.state,
                    to: state,
                });
            }
            self.store.update_job(&job)?;
            Ok(job)
        });

        if let Err(err) = &result {
            tracing::error!(error = %err, "failed to finalize job");
            self.errors
                .report("engine", format!("failed to finalize job {id}: {err}"));
        }
        result
    }

    async fn notify(&self, kind: JobKind) {
        let Some(url) = self.config.webhook(kind) else {
            tracing::debug!("no webhook configured");
            return;
        };
        match self.notifier.notify(url).await {
            Ok(()) => tracing::debug!(url, "webhook notified"),
            Err(err) => {
                tracing::warn!(url, error = %err, "webhook notification failed");
                self.errors.report("notifier", format!("{kind}: {err}"));
            }
        }
    }

    async fn sync_records(&self, kind: RecordKind, cancel: &CancellationToken) -> RunTally {
        let mut tally = RunTally::default();

        let Some(board) = self.config.board(kind) else {
            tracing::warn!(%kind, "no board configured");
            tally.errors += 1;
            return tally;
        };

        let entities = match self.source.fetch_entities(kind, &board.board_id).await {
            Ok(entities) => entities,
            Err(err) => {
                tracing::warn!(board_id = %board.board_id, error = %err, "fetch failed");
                tally.errors += 1;
                return tally;
            }
        };
        tracing::debug!(count = entities.len(), "entities fetched");

        for raw in entities {
            if cancel.is_cancelled() {
                tracing::info!(processed = tally.processed, "run cancelled");
                tally.cancelled = true;
                break;
            }

            let card_id = raw.id.clone();
            let record = to_record(&board.board_id, raw, Utc::now());
            match self.store.upsert_record(&record) {
                Ok(outcome) => {
                    tally.processed += 1;
                    tracing::trace!(card_id = %card_id, inserted = outcome.inserted, "record upserted");
                }
                Err(err) => {
                    tally.errors += 1;
                    tracing::warn!(card_id = %card_id, error = %err, "upsert failed");
                }
            }
        }
        tally
    }

    async fn mirror_attachments(&self, cancel: &CancellationToken) -> RunTally {
        let mut tally = RunTally::default();

        let mut refs = Vec::new();
        for kind in RecordKind::ALL {
            let records = match self.store.records_with_attachments(kind) {
                Ok(records) => records,
                Err(err) => {
                    tracing::warn!(%kind, error = %err, "failed to read attachment references");
                    tally.errors += 1;
                    return tally;
                }
            };
            let folder = self.config.attachment_folder(kind);
            for stored in &records {
                refs.extend(attachment_refs(&stored.record, folder));
            }
        }
        tracing::debug!(count = refs.len(), "attachment references collected");

        for reference in refs {
            if cancel.is_cancelled() {
                tracing::info!(processed = tally.processed, "run cancelled");
                tally.cancelled = true;
                break;
            }

            let reference = match reference {
                Ok(reference) => reference,
                Err(err) => {
                    tally.errors += 1;
                    tracing::warn!(error = %err, "skipping malformed attachment reference");
                    continue;
                }
            };
            if reference.is_blank() {
                continue;
            }

            match self.mirror.mirror(&reference).await {
                Ok(_) => tally.processed += 1,
                Err(err) => {
                    tally.errors += 1;
                    tracing::warn!(url = %reference.source_url, error = %err, "mirror failed");
                }
            }
        }
        tally
    }
}
