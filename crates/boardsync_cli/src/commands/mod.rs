//! CLI command implementations.

pub mod errors;
pub mod job;
pub mod keys;
pub mod run;
pub mod serve;

use boardsync_core::RecordStore;
use boardsync_engine::{ErrorReceiver, Supervisor};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// How long in-flight runs get to finalize after a shutdown request.
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(4);

/// A supervisor draining the error channel in the background.
pub struct SupervisorHandle {
    cancel: CancellationToken,
    task: JoinHandle<usize>,
}

impl SupervisorHandle {
    /// Spawns a supervisor persisting reports into `store`.
    pub fn spawn(store: Arc<dyn RecordStore>, rx: ErrorReceiver) -> Self {
        let cancel = CancellationToken::new();
        let task = tokio::spawn(Supervisor::new(store, rx).run(cancel.clone()));
        Self { cancel, task }
    }

    /// Stops the supervisor after it has persisted queued reports.
    pub async fn stop(self) {
        self.cancel.cancel();
        match self.task.await {
            Ok(persisted) => tracing::debug!(persisted, "supervisor stopped"),
            Err(err) => tracing::error!(error = %err, "supervisor task failed"),
        }
    }
}
