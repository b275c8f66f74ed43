//! Serve command implementation.

use super::{SupervisorHandle, SHUTDOWN_GRACE};
use crate::settings::SyncSettings;
use boardsync_core::{LocalRecordStore, RecordStore};
use boardsync_engine::ErrorSink;
use boardsync_server::{BoardsyncServer, ServerConfig};
use std::net::{IpAddr, SocketAddr};
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Options of the serve command.
#[derive(Debug, Clone)]
pub struct ServeOptions {
    /// Address to listen on.
    pub host: IpAddr,
    /// Port to listen on.
    pub port: u16,
    /// Runtime environment reported by `/ping`.
    pub environment: String,
    /// Default page size of record listings.
    pub page_size: u32,
}

/// Runs the HTTP API until interrupted.
pub async fn run(
    store_path: &Path,
    settings: &SyncSettings,
    options: ServeOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    let store: Arc<dyn RecordStore> = Arc::new(LocalRecordStore::open(store_path)?);
    let (sink, rx) = ErrorSink::channel();
    let supervisor = SupervisorHandle::spawn(Arc::clone(&store), rx);
    let engine = Arc::new(settings.build_engine(Arc::clone(&store), sink)?);

    let config = ServerConfig::new(SocketAddr::new(options.host, options.port))
        .with_environment(options.environment)
        .with_default_page_size(options.page_size);
    let shutdown = CancellationToken::new();
    let server = BoardsyncServer::new(config, Arc::clone(&engine));
    let mut server = tokio::spawn(server.run(shutdown.clone()));

    let finished = tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            if let Err(err) = signal {
                tracing::error!(error = %err, "failed to listen for ctrl-c");
            }
            None
        }
        finished = &mut server => Some(finished),
    };
    let finished = match finished {
        Some(finished) => finished,
        None => {
            tracing::info!("shutdown requested");
            shutdown.cancel();
            server.await
        }
    };
    let result: Result<(), Box<dyn std::error::Error>> = match finished {
        Ok(served) => served.map_err(Into::into),
        Err(err) => Err(err.into()),
    };

    if !engine.shutdown(SHUTDOWN_GRACE).await {
        tracing::warn!(in_flight = engine.in_flight(), "exiting with runs still in flight");
    }
    supervisor.stop().await;
    result
}
