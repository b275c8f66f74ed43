//! Process-wide error channel and the supervisor that persists it.
//!
//! Failures that have no job to be counted against (setup errors, failed
//! notifications, finalization failures) are sent here and appended to the
//! store's error log.

use boardsync_core::RecordStore;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// A failure reported outside a job's counters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportedError {
    /// Component that raised it.
    pub source: String,
    /// Error text.
    pub body: String,
}

/// Sending half of the error channel. Cheap to clone.
#[derive(Debug, Clone)]
pub struct ErrorSink {
    tx: mpsc::UnboundedSender<ReportedError>,
}

/// Receiving half of the error channel.
pub type ErrorReceiver = mpsc::UnboundedReceiver<ReportedError>;

impl ErrorSink {
    /// Creates a connected sink and receiver.
    pub fn channel() -> (Self, ErrorReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Reports an error. Falls back to the log if the supervisor is gone.
    pub fn report(&self, source: &str, body: impl std::fmt::Display) {
        let report = ReportedError {
            source: source.to_string(),
            body: body.to_string(),
        };
        if let Err(mpsc::error::SendError(lost)) = self.tx.send(report) {
            tracing::error!(source = %lost.source, body = %lost.body, "error channel closed");
        }
    }
}

/// Drains the error channel into the store's error log.
pub struct Supervisor {
    store: Arc<dyn RecordStore>,
    rx: ErrorReceiver,
}

impl Supervisor {
    /// Creates a supervisor.
    pub fn new(store: Arc<dyn RecordStore>, rx: ErrorReceiver) -> Self {
        Self { store, rx }
    }

    /// Runs until cancelled or until every sink is dropped.
    ///
    /// Reports already queued when cancellation is observed are still persisted.
    /// Returns the number of reports persisted.
    pub async fn run(mut self, cancel: CancellationToken) -> usize {
        let mut persisted = 0;
        loop {
            tokio::select! {
                biased;
                report = self.rx.recv() => match report {
                    Some(report) => persisted += self.persist(&report),
                    None => break,
                },
                () = cancel.cancelled() => {
                    self.rx.close();
                    while let Some(report) = self.rx.recv().await {
                        persisted += self.persist(&report);
                    }
                    break;
                }
            }
        }
        tracing::debug!(persisted, "error supervisor stopped");
        persisted
    }

    fn persist(&self, report: &ReportedError) -> usize {
        tracing::error!(source = %report.source, body = %report.body, "reported error");
        match self.store.new_error(&report.source, &report.body) {
            Ok(_) => 1,
            Err(err) => {
                tracing::error!(error = %err, "failed to persist reported error");
                0
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use boardsync_core::LocalRecordStore;

    #[tokio::test]
    async fn persists_until_senders_drop() {
        let store = Arc::new(LocalRecordStore::open_in_memory());
        let (sink, rx) = ErrorSink::channel();
        let supervisor = Supervisor::new(store.clone(), rx);

        sink.report("engine", "setup failed");
        sink.clone().report("notifier", "HTTP 500");
        drop(sink);

        let persisted = supervisor.run(CancellationToken::new()).await;
        assert_eq!(persisted, 2);

        let errors = store.recent_errors(10).unwrap();
        assert_eq!(errors[0].source, "notifier");
        assert_eq!(errors[1].body, "setup failed");
    }

    #[tokio::test]
    async fn cancellation_drains_queued_reports() {
        let store = Arc::new(LocalRecordStore::open_in_memory());
        let (sink, rx) = ErrorSink::channel();
        let cancel = CancellationToken::new();

        sink.report("main", "one");
        cancel.cancel();
        let persisted = Supervisor::new(store.clone(), rx).run(cancel).await;

        assert_eq!(persisted, 1);
        sink.report("main", "after shutdown");
        assert_eq!(store.recent_errors(10).unwrap().len(), 1);
    }
}
