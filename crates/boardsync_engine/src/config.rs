//! Configuration for the sync engine.

use boardsync_core::{JobKind, RecordKind};
use std::collections::BTreeMap;
use std::time::Duration;

/// Where a record kind is pulled from and who hears about it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardConfig {
    /// Source board identifier.
    pub board_id: String,
    /// Webhook called after a completed run.
    pub webhook_url: Option<String>,
    /// Blob store folder for this kind's attachments.
    pub attachment_folder: Option<String>,
}

impl BoardConfig {
    /// Creates a board configuration without webhook or folder override.
    pub fn new(board_id: impl Into<String>) -> Self {
        Self {
            board_id: board_id.into(),
            webhook_url: None,
            attachment_folder: None,
        }
    }

    /// Sets the webhook URL. An empty URL disables notification.
    pub fn with_webhook(mut self, url: impl Into<String>) -> Self {
        let url = url.into();
        self.webhook_url = (!url.is_empty()).then_some(url);
        self
    }

    /// Sets the attachment folder.
    pub fn with_attachment_folder(mut self, folder: impl Into<String>) -> Self {
        self.attachment_folder = Some(folder.into());
        self
    }
}

/// Configuration for sync runs.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Boards per record kind.
    pub boards: BTreeMap<RecordKind, BoardConfig>,
    /// Webhook called after a completed attachment run.
    pub attachments_webhook: Option<String>,
    /// Active jobs older than this are treated as abandoned on admission.
    pub stale_job_after: Option<Duration>,
}

impl EngineConfig {
    /// Default age after which an active job is considered abandoned.
    pub const DEFAULT_STALE_JOB_AFTER: Duration = Duration::from_secs(6 * 60 * 60);

    /// Creates a configuration with no boards.
    pub fn new() -> Self {
        Self {
            boards: BTreeMap::new(),
            attachments_webhook: None,
            stale_job_after: Some(Self::DEFAULT_STALE_JOB_AFTER),
        }
    }

    /// Configures the board of a record kind.
    pub fn with_board(mut self, kind: RecordKind, board: BoardConfig) -> Self {
        self.boards.insert(kind, board);
        self
    }

    /// Sets the attachment run webhook. An empty URL disables notification.
    pub fn with_attachments_webhook(mut self, url: impl Into<String>) -> Self {
        let url = url.into();
        self.attachments_webhook = (!url.is_empty()).then_some(url);
        self
    }

    /// Sets the stale job age.
    pub fn with_stale_job_after(mut self, age: Duration) -> Self {
        self.stale_job_after = Some(age);
        self
    }

    /// Leaves abandoned jobs blocking their kind until cleared by hand.
    pub fn without_stale_job_reconciliation(mut self) -> Self {
        self.stale_job_after = None;
        self
    }

    /// The board of a record kind.
    pub fn board(&self, kind: RecordKind) -> Option<&BoardConfig> {
        self.boards.get(&kind)
    }

    /// Attachment folder of a record kind, defaulting to the kind's name.
    pub fn attachment_folder(&self, kind: RecordKind) -> &str {
        self.board(kind)
            .and_then(|b| b.attachment_folder.as_deref())
            .unwrap_or(kind.as_str())
    }

    /// Webhook for a job kind, if any.
    pub fn webhook(&self, kind: JobKind) -> Option<&str> {
        match kind.record_kind() {
            Some(record_kind) => self
                .board(record_kind)
                .and_then(|b| b.webhook_url.as_deref()),
            None => self.attachments_webhook.as_deref(),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new()
    }
}
