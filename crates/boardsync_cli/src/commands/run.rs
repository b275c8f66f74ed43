//! Run command implementation.

use super::SupervisorHandle;
use crate::settings::SyncSettings;
use boardsync_core::{JobKind, LocalRecordStore, RecordStore};
use boardsync_engine::ErrorSink;
use std::path::Path;
use std::sync::Arc;

/// Runs one job of `kind` in the foreground and prints it as JSON.
///
/// Ctrl-C cancels the run cooperatively; the cancelled job is still printed.
pub async fn run(
    store_path: &Path,
    settings: &SyncSettings,
    kind: JobKind,
) -> Result<(), Box<dyn std::error::Error>> {
    let store: Arc<dyn RecordStore> = Arc::new(LocalRecordStore::open(store_path)?);
    let (sink, rx) = ErrorSink::channel();
    let supervisor = SupervisorHandle::spawn(Arc::clone(&store), rx);
    let engine = settings.build_engine(Arc::clone(&store), sink)?;

    let run = engine.run_job(kind);
    tokio::pin!(run);
    let finished = tokio::select! {
        job = &mut run => Some(job),
        _ = tokio::signal::ctrl_c() => None,
    };
    let result = match finished {
        Some(job) => job,
        None => {
            tracing::info!(%kind, "cancelling run");
            engine.cancel();
            run.await
        }
    };
    supervisor.stop().await;

    let job = result?;
    println!("{}", serde_json::to_string_pretty(&job)?);
    Ok(())
}
