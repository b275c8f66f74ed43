//! Blob store abstraction and the filesystem implementation.

use crate::error::{EngineError, EngineResult};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::path::{Component, Path, PathBuf};

/// Durable storage for mirrored attachments.
///
/// `upload` always removes the staged input file, whether it succeeds or not.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Stores `local_path` as `folder/name` and returns its reachable URL.
    async fn upload(&self, local_path: &Path, folder: &str, name: &str) -> EngineResult<String>;
}

/// Configuration for [`FsBlobStore`].
#[derive(Debug, Clone)]
pub struct FsBlobConfig {
    /// Directory objects are written under.
    pub root: PathBuf,
    /// URL prefix that serves `root`.
    pub base_url: String,
}

impl FsBlobConfig {
    /// Creates a configuration.
    pub fn new(root: impl Into<PathBuf>, base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            base_url: base_url.into(),
        }
    }
}

/// Stores objects as files under a root directory.
#[derive(Debug, Clone)]
pub struct FsBlobStore {
    config: FsBlobConfig,
}

impl FsBlobStore {
    /// Creates a store.
    pub fn new(config: FsBlobConfig) -> Self {
        Self { config }
    }

    /// URL of `folder/name`.
    pub fn url_for(&self, folder: &str, name: &str) -> String {
        format!(
            "{}/{}/{}",
            self.config.base_url.trim_end_matches('/'),
            folder,
            name
        )
    }

    async fn store(&self, local_path: &Path, folder: &str, name: &str) -> EngineResult<String> {
        validate_segment(folder, true)?;
        validate_segment(name, false)?;

        let dir = self.config.root.join(folder);
        tokio::fs::create_dir_all(&dir).await?;
        tokio::fs::copy(local_path, dir.join(name)).await?;
        Ok(self.url_for(folder, name))
    }
}

/// Rejects empty, absolute or parent-escaping object paths.
fn validate_segment(path: &str, allow_nested: bool) -> EngineResult<()> {
    let candidate = Path::new(path);
    let mut parts = 0;
    for component in candidate.components() {
        match component {
            Component::Normal(_) => parts += 1,
            _ => {
                return Err(EngineError::upload(format!(
                    "invalid object path segment: {path:?}"
                )))
            }
        }
    }
    if parts == 0 || (!allow_nested && parts > 1) {
        return Err(EngineError::upload(format!(
            "invalid object path segment: {path:?}"
        )));
    }
    Ok(())
}

async fn remove_staged(local_path: &Path) {
    if let Err(err) = tokio::fs::remove_file(local_path).await {
        if err.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!(path = %local_path.display(), error = %err, "failed to remove staged file");
        }
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn upload(&self, local_path: &Path, folder: &str, name: &str) -> EngineResult<String> {
        let result = self.store(local_path, folder, name).await;
        remove_staged(local_path).await;
        result.map_err(|err| match err {
            EngineError::Io(io) => EngineError::upload(io.to_string()),
            other => other,
        })
    }
}

/// An uploaded object held by [`MemoryBlobStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredBlob {
    /// Folder.
    pub folder: String,
    /// Object name.
    pub name: String,
    /// Contents.
    pub bytes: Vec<u8>,
}

/// An in-memory blob store for tests.
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    objects: Mutex<Vec<StoredBlob>>,
    fail_uploads: Mutex<bool>,
}

impl MemoryBlobStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes subsequent uploads fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        *self.fail_uploads.lock() = failing;
    }

    /// Objects uploaded so far, in upload order.
    pub fn objects(&self) -> Vec<StoredBlob> {
        self.objects.lock().clone()
    }

    /// Number of successful uploads.
    pub fn upload_count(&self) -> usize {
        self.objects.lock().len()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn upload(&self, local_path: &Path, folder: &str, name: &str) -> EngineResult<String> {
        let read = tokio::fs::read(local_path).await;
        remove_staged(local_path).await;

        if *self.fail_uploads.lock() {
            return Err(EngineError::upload("scripted upload failure"));
        }
        let bytes = read.map_err(|e| EngineError::upload(e.to_string()))?;
        self.objects.lock().push(StoredBlob {
            folder: folder.to_string(),
            name: name.to_string(),
            bytes,
        });
        Ok(format!("memory://{folder}/{name}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn upload_copies_and_removes_staging() {
        let staging = tempdir().unwrap();
        let root = tempdir().unwrap();
        let staged = staging.path().join("a.png");
        std::fs::write(&staged, b"png").unwrap();

        let store = FsBlobStore::new(FsBlobConfig::new(root.path(), "https://cdn.example.com/"));
        let url = store.upload(&staged, "docs", "a-label.png").await.unwrap();

        assert_eq!(url, "https://cdn.example.com/docs/a-label.png");
        assert_eq!(std::fs::read(root.path().join("docs/a-label.png")).unwrap(), b"png");
        assert!(!staged.exists());
    }

    #[tokio::test]
    async fn failed_upload_still_removes_staging() {
        let staging = tempdir().unwrap();
        let root = tempdir().unwrap();
        let staged = staging.path().join("a.png");
        std::fs::write(&staged, b"png").unwrap();

        let store = FsBlobStore::new(FsBlobConfig::new(root.path(), "https://cdn"));
        let err = store.upload(&staged, "../escape", "a.png").await.unwrap_err();

        assert!(matches!(err, EngineError::Upload(_)));
        assert!(!staged.exists());
    }

    #[tokio::test]
    async fn missing_staged_file_is_an_upload_error() {
        let root = tempdir().unwrap();
        let store = FsBlobStore::new(FsBlobConfig::new(root.path(), "https://cdn"));
        let err = store
            .upload(&root.path().join("gone.png"), "docs", "gone.png")
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Upload(_)));
    }

    #[test]
    fn segment_validation() {
        assert!(validate_segment("docs", true).is_ok());
        assert!(validate_segment("docs/2024", true).is_ok());
        assert!(validate_segment("docs/2024", false).is_err());
        assert!(validate_segment("", true).is_err());
        assert!(validate_segment("/abs", true).is_err());
        assert!(validate_segment("a/../b", true).is_err());
    }

    #[tokio::test]
    async fn memory_store_records_objects() {
        let staging = tempdir().unwrap();
        let staged = staging.path().join("f.pdf");
        std::fs::write(&staged, b"pdf").unwrap();

        let store = MemoryBlobStore::new();
        let url = store.upload(&staged, "docs", "f.pdf").await.unwrap();
        assert_eq!(url, "memory://docs/f.pdf");
        assert_eq!(store.upload_count(), 1);
        assert_eq!(store.objects()[0].bytes, b"pdf");
        assert!(!staged.exists());
    }
}
