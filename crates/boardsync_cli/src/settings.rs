//! Process settings read from flags and the environment.

use boardsync_core::{RecordKind, RecordStore};
use boardsync_engine::{
    BoardConfig, EngineConfig, EngineParts, ErrorSink, FsBlobConfig, FsBlobStore, SyncEngine,
    WebhookNotifier,
};
use boardsync_trello::{TrelloClient, TrelloConfig, DEFAULT_BASE_URL};
use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Settings needed to run sync jobs.
#[derive(Args, Debug, Clone)]
pub struct SyncSettings {
    /// Trello application key
    #[arg(long, env = "TRELLO_API_KEY", default_value = "")]
    pub trello_api_key: String,

    /// Trello member token
    #[arg(long, env = "TRELLO_TOKEN", default_value = "")]
    pub trello_token: String,

    /// Token used for attachment downloads (defaults to the member token)
    #[arg(long, env = "TRELLO_READ_TOKEN")]
    pub trello_read_token: Option<String>,

    /// Trello REST endpoint
    #[arg(long, env = "TRELLO_BASE_URL", default_value = DEFAULT_BASE_URL)]
    pub trello_base_url: String,

    /// Board holding property cards
    #[arg(long, env = "TRELLO_PROPERTIES_BOARD_ID")]
    pub properties_board: Option<String>,

    /// Board holding inheritance confinement cards
    #[arg(long, env = "TRELLO_INHERITANCE_CONFINEMENTS_BOARD_ID")]
    pub confinements_board: Option<String>,

    /// Board holding supportive document cards
    #[arg(long, env = "TRELLO_SUPPORTIVE_DOCS_BOARD_ID")]
    pub supportive_docs_board: Option<String>,

    /// Webhook notified after a properties run completes
    #[arg(long, env = "PROPERTIES_WEBHOOK")]
    pub properties_webhook: Option<String>,

    /// Webhook notified after an inheritance confinements run completes
    #[arg(long, env = "INHERITANCE_CONFINEMENTS_WEBHOOK")]
    pub confinements_webhook: Option<String>,

    /// Webhook notified after a supportive docs run completes
    #[arg(long, env = "SUPPORTIVE_DOCS_WEBHOOK")]
    pub supportive_docs_webhook: Option<String>,

    /// Webhook notified after an attachments run completes
    #[arg(long, env = "ATTACHMENTS_WEBHOOK")]
    pub attachments_webhook: Option<String>,

    /// Directory attachments are downloaded into before upload
    #[arg(long, env = "DOWNLOAD_DIR", default_value = "downloads")]
    pub download_dir: PathBuf,

    /// Root directory of the blob store
    #[arg(long, env = "BLOB_ROOT", default_value = "blobs")]
    pub blob_root: PathBuf,

    /// Public URL prefix of the blob store
    #[arg(long, env = "BLOB_BASE_URL", default_value = "http://localhost:8080/blobs")]
    pub blob_base_url: String,

    /// Minutes after which an active job is considered abandoned (0 disables)
    #[arg(long, env = "STALE_JOB_MINUTES", default_value_t = 360)]
    pub stale_job_minutes: u64,
}

impl SyncSettings {
    /// Engine configuration for the configured boards.
    pub fn engine_config(&self) -> EngineConfig {
        let boards = [
            (
                RecordKind::Property,
                &self.properties_board,
                &self.properties_webhook,
            ),
            (
                RecordKind::InheritanceConfinement,
                &self.confinements_board,
                &self.confinements_webhook,
            ),
            (
                RecordKind::SupportiveDoc,
                &self.supportive_docs_board,
                &self.supportive_docs_webhook,
            ),
        ];

        let mut config = EngineConfig::new();
        for (kind, board, webhook) in boards {
            let Some(board) = board.as_deref().filter(|b| !b.is_empty()) else {
                continue;
            };
            let mut board = BoardConfig::new(board);
            if let Some(webhook) = webhook {
                board = board.with_webhook(webhook.as_str());
            }
            config = config.with_board(kind, board);
        }
        if let Some(webhook) = &self.attachments_webhook {
            config = config.with_attachments_webhook(webhook.as_str());
        }
        if self.stale_job_minutes == 0 {
            config.without_stale_job_reconciliation()
        } else {
            config.with_stale_job_after(Duration::from_secs(self.stale_job_minutes * 60))
        }
    }

    /// Trello client configuration.
    pub fn trello_config(&self) -> TrelloConfig {
        let config = TrelloConfig::new(
            self.trello_api_key.as_str(),
            self.trello_token.as_str(),
            self.download_dir.clone(),
        )
        .with_base_url(self.trello_base_url.as_str());
        match &self.trello_read_token {
            Some(token) => config.with_download_token(token.as_str()),
            None => config,
        }
    }

    /// Builds an engine over `store` with the production collaborators.
    pub fn build_engine(
        &self,
        store: Arc<dyn RecordStore>,
        errors: ErrorSink,
    ) -> Result<SyncEngine, Box<dyn std::error::Error>> {
        if self.trello_api_key.is_empty() || self.trello_token.is_empty() {
            tracing::warn!("TRELLO_API_KEY or TRELLO_TOKEN is not set; board fetches will fail");
        }
        let parts = EngineParts {
            store,
            source: Arc::new(TrelloClient::new(self.trello_config())?),
            blobs: Arc::new(FsBlobStore::new(FsBlobConfig::new(
                self.blob_root.clone(),
                self.blob_base_url.as_str(),
            ))),
            notifier: Arc::new(WebhookNotifier::new()?),
        };
        Ok(SyncEngine::new(self.engine_config(), parts, errors))
    }
}
