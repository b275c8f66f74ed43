//! The sync engine: admission plus run dispatch.

use crate::admission::AdmissionController;
use crate::blob::BlobStore;
use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::mirror::AttachmentMirror;
use crate::notify::Notifier;
use crate::report::ErrorSink;
use crate::run::RunContext;
use crate::source::SourceClient;
use boardsync_core::{Job, JobId, JobKind, RecordStore};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::Instrument;

/// External collaborators of the engine.
#[derive(Clone)]
pub struct EngineParts {
    /// Record store shared by every run.
    pub store: Arc<dyn RecordStore>,
    /// Board client.
    pub source: Arc<dyn SourceClient>,
    /// Attachment destination.
    pub blobs: Arc<dyn BlobStore>,
    /// Completion notifier.
    pub notifier: Arc<dyn Notifier>,
}

/// Admits sync jobs and runs them.
///
/// Runs of different kinds proceed concurrently; within a run, entities and
/// attachments are processed one at a time. Cancellation is cooperative: it
/// is observed before the next item, never in the middle of one.
///
/// # Example
///
/// ```rust,ignore
/// let (errors, rx) = ErrorSink::channel();
/// let engine = SyncEngine::new(config, parts, errors);
///
/// let id = engine.submit_job(JobKind::Properties)?;
/// // ... poll until terminal
/// let job = engine.get_job(id)?;
/// ```
pub struct SyncEngine {
    context: Arc<RunContext>,
    admission: AdmissionController,
    tracker: TaskTracker,
    root: CancellationToken,
}

impl SyncEngine {
    /// Creates an engine.
    pub fn new(config: EngineConfig, parts: EngineParts, errors: ErrorSink) -> Self {
        let admission =
            AdmissionController::new(parts.store.clone(), config.stale_job_after, errors.clone());
        let mirror = AttachmentMirror::new(
            parts.store.clone(),
            parts.source.clone(),
            parts.blobs.clone(),
        );
        let context = Arc::new(RunContext {
            config,
            store: parts.store,
            source: parts.source,
            mirror,
            notifier: parts.notifier,
            errors,
        });
        Self {
            context,
            admission,
            tracker: TaskTracker::new(),
            root: CancellationToken::new(),
        }
    }

    /// Admits a job and runs it in the background. Returns its id at once.
    pub fn submit_job(&self, kind: JobKind) -> EngineResult<JobId> {
        let id = self.admission.try_start(kind)?;
        let context = Arc::clone(&self.context);
        let cancel = self.root.child_token();
        self.tracker.spawn(async move {
            match drive(Arc::clone(&context), id, kind, cancel).await {
                Ok(_) | Err(EngineError::Aborted { .. }) => {}
                Err(err) => {
                    tracing::error!(job_id = id.as_u64(), error = %err, "run aborted");
                    context
                        .errors
                        .report("engine", format!("{kind} job {id}: {err}"));
                }
            }
        });
        Ok(id)
    }

    /// Admits a job and runs it to completion.
    pub async fn run_job(&self, kind: JobKind) -> EngineResult<Job> {
        let id = self.admission.try_start(kind)?;
        let cancel = self.root.child_token();
        drive(Arc::clone(&self.context), id, kind, cancel).await
    }

    /// Loads a job.
    pub fn get_job(&self, id: JobId) -> EngineResult<Job> {
        self.context
            .store
            .get_job(id)?
            .ok_or(EngineError::JobNotFound(id))
    }

    /// Engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.context.config
    }

    /// Record store shared with the runs.
    pub fn store(&self) -> &Arc<dyn RecordStore> {
        &self.context.store
    }

    /// Cancels every in-flight run. Runs started afterwards are cancelled
    /// before their first item.
    pub fn cancel(&self) {
        self.root.cancel();
    }

    /// Token cancelled by [`SyncEngine::cancel`].
    pub fn cancellation_token(&self) -> CancellationToken {
        self.root.clone()
    }

    /// Number of background runs still in flight.
    pub fn in_flight(&self) -> usize {
        self.tracker.len()
    }

    /// Cancels runs and waits up to `grace` for them to finalize.
    ///
    /// Returns true if every run finished in time.
    pub async fn shutdown(&self, grace: Duration) -> bool {
        self.cancel();
        self.tracker.close();
        let finished = tokio::time::timeout(grace, self.tracker.wait())
            .await
            .is_ok();
        if !finished {
            tracing::warn!(in_flight = self.tracker.len(), "runs still in flight after grace period");
        }
        finished
    }
}

/// Runs `id` in its own task so a panic inside a collaborator still ends
/// with a finalized job.
async fn drive(
    context: Arc<RunContext>,
    id: JobId,
    kind: JobKind,
    cancel: CancellationToken,
) -> EngineResult<Job> {
    let span = run_span(id, kind);
    let run = tokio::spawn({
        let context = Arc::clone(&context);
        async move { context.execute(id, cancel).await }.instrument(span.clone())
    });
    match run.await {
        Ok(result) => result,
        Err(err) => {
            let reason = err.to_string();
            span.in_scope(|| context.abandon(id, &reason));
            Err(EngineError::Aborted { id, reason })
        }
    }
}

fn run_span(id: JobId, kind: JobKind) -> tracing::Span {
    tracing::info_span!("sync_run", job_id = id.as_u64(), kind = %kind)
}
