//! Source client abstraction for the external board.

use crate::error::{EngineError, EngineResult};
use async_trait::async_trait;
use boardsync_core::{RecordAttributes, RecordKind};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

/// A label attached to a card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawLabel {
    /// Label identifier.
    pub id: String,
    /// Display name.
    pub name: String,
}

/// An attachment listed on a card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawAttachment {
    /// Attachment identifier.
    pub id: String,
    /// Download URL.
    pub url: String,
    /// File name.
    pub name: String,
}

/// A comment on a card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawComment {
    /// Comment text.
    pub text: String,
}

/// A card as fetched from the board, with its typed fields already resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct RawEntity {
    /// Card identifier (natural key).
    pub id: String,
    /// Card name.
    pub name: String,
    /// Last activity, if the source reported one.
    pub last_activity: Option<DateTime<Utc>>,
    /// Typed fields.
    pub fields: RecordAttributes,
    /// Labels.
    pub labels: Vec<RawLabel>,
    /// Attachments.
    pub attachments: Vec<RawAttachment>,
    /// Comments.
    pub comments: Vec<RawComment>,
}

/// A downloaded attachment staged on local disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadedAttachment {
    /// Staged file.
    pub local_path: PathBuf,
    /// Stable identifier derived from the source URL.
    pub identifier: String,
    /// File extension including the leading dot, or empty.
    pub extension: String,
}

/// Fetches entities and attachment payloads from the board.
///
/// Clients make a single attempt per call. Retrying is the caller's decision.
#[async_trait]
pub trait SourceClient: Send + Sync {
    /// Fetches every entity of `kind` on `board_id`, in source order.
    async fn fetch_entities(&self, kind: RecordKind, board_id: &str)
        -> EngineResult<Vec<RawEntity>>;

    /// Downloads one attachment into local staging.
    async fn download_attachment(&self, url: &str) -> EngineResult<DownloadedAttachment>;
}

/// A scripted source client for tests.
///
/// Downloads are written into `staging_dir` with the payload registered for
/// the URL. The identifier is the last path segment without its extension.
#[derive(Debug)]
pub struct MockSourceClient {
    staging_dir: PathBuf,
    entities: Mutex<HashMap<RecordKind, Vec<RawEntity>>>,
    failing_fetches: Mutex<HashSet<RecordKind>>,
    payloads: Mutex<HashMap<String, Vec<u8>>>,
    downloads: AtomicUsize,
    fetches: AtomicUsize,
}

impl MockSourceClient {
    /// Creates a client staging downloads into `staging_dir`.
    pub fn new(staging_dir: impl Into<PathBuf>) -> Self {
        Self {
            staging_dir: staging_dir.into(),
            entities: Mutex::new(HashMap::new()),
            failing_fetches: Mutex::new(HashSet::new()),
            payloads: Mutex::new(HashMap::new()),
            downloads: AtomicUsize::new(0),
            fetches: AtomicUsize::new(0),
        }
    }

    /// Sets the entities returned for `kind`.
    pub fn set_entities(&self, kind: RecordKind, entities: Vec<RawEntity>) {
        self.entities.lock().insert(kind, entities);
    }

    /// Makes fetches of `kind` fail.
    pub fn fail_fetch(&self, kind: RecordKind) {
        self.failing_fetches.lock().insert(kind);
    }

    /// Registers the payload served for `url`. Unregistered URLs fail to download.
    pub fn add_payload(&self, url: impl Into<String>, bytes: impl Into<Vec<u8>>) {
        self.payloads.lock().insert(url.into(), bytes.into());
    }

    /// Number of downloads served.
    pub fn download_count(&self) -> usize {
        self.downloads.load(Ordering::SeqCst)
    }

    /// Number of fetch calls.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    /// Directory downloads are staged in.
    pub fn staging_dir(&self) -> &Path {
        &self.staging_dir
    }
}

#[async_trait]
impl SourceClient for MockSourceClient {
    async fn fetch_entities(
        &self,
        kind: RecordKind,
        _board_id: &str,
    ) -> EngineResult<Vec<RawEntity>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if self.failing_fetches.lock().contains(&kind) {
            return Err(EngineError::source_failure(format!(
                "scripted fetch failure for {kind}"
            )));
        }
        Ok(self.entities.lock().get(&kind).cloned().unwrap_or_default())
    }

    async fn download_attachment(&self, url: &str) -> EngineResult<DownloadedAttachment> {
        let payload = self
            .payloads
            .lock()
            .get(url)
            .cloned()
            .ok_or_else(|| EngineError::download(url, "no payload registered"))?;

        let file_name = url.rsplit('/').next().unwrap_or(url);
        let (identifier, extension) = match file_name.rfind('.') {
            Some(dot) if dot > 0 => (&file_name[..dot], &file_name[dot..]),
            _ => (file_name, ""),
        };

        let index = self.downloads.fetch_add(1, Ordering::SeqCst);
        let local_path = self.staging_dir.join(format!("{index}-{file_name}"));
        tokio::fs::write(&local_path, payload).await?;

        Ok(DownloadedAttachment {
            local_path,
            identifier: identifier.to_string(),
            extension: extension.to_string(),
        })
    }
}
