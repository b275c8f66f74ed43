//! Job admission: at most one queued or running job per kind.

use crate::error::{EngineError, EngineResult};
use crate::report::ErrorSink;
use boardsync_core::{JobId, JobKind, JobState, RecordStore};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;

/// Admits jobs, reconciling abandoned ones first.
///
/// The pending check is advisory; the store's own per-kind constraint
/// closes the window between check and insert, and its conflict is reported
/// as [`EngineError::AlreadyPending`] like the check itself.
pub struct AdmissionController {
    store: Arc<dyn RecordStore>,
    stale_after: Option<Duration>,
    errors: ErrorSink,
}

impl AdmissionController {
    /// Creates a controller.
    pub fn new(
        store: Arc<dyn RecordStore>,
        stale_after: Option<Duration>,
        errors: ErrorSink,
    ) -> Self {
        Self {
            store,
            stale_after,
            errors,
        }
    }

    /// Admits a job of `kind`, returning its id in state `queued`.
    pub fn try_start(&self, kind: JobKind) -> EngineResult<JobId> {
        self.reconcile_stale(kind)?;

        if self.store.has_pending_job(kind)? {
            return Err(EngineError::AlreadyPending { kind });
        }

        match self.store.new_job(kind, Utc::now()) {
            Ok(id) => {
                tracing::info!(job_id = id.as_u64(), %kind, "job admitted");
                Ok(id)
            }
            Err(err) if err.is_active_job_conflict() => Err(EngineError::AlreadyPending { kind }),
            Err(err) => Err(err.into()),
        }
    }

    /// Cancels the active job of `kind` if it is older than the stale age.
    ///
    /// Returns the id of the reconciled job.
    pub fn reconcile_stale(&self, kind: JobKind) -> EngineResult<Option<JobId>> {
        let Some(stale_after) = self.stale_after else {
            return Ok(None);
        };
        let Some(mut job) = self.store.active_job(kind)? else {
            return Ok(None);
        };

        let now = Utc::now();
        let is_stale = (now - job.started_at)
            .to_std()
            .is_ok_and(|age| age > stale_after);
        if !is_stale {
            return Ok(None);
        }

        let previous = job.state;
        if !job.transition(JobState::Cancelled) {
            return Ok(None);
        }
        job.completed_at = Some(now);
        self.store.update_job(&job)?;

        tracing::warn!(job_id = job.id.as_u64(), %kind, state = %previous, "reconciled abandoned job");
        self.errors.report(
            "admission",
            format!(
                "{kind} job {} was {previous} since {} and has been cancelled",
                job.id, job.started_at
            ),
        );
        Ok(Some(job.id))
    }
}
