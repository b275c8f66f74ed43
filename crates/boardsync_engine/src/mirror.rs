//! Attachment mirroring with dedup by source URL.

use crate::blob::BlobStore;
use crate::error::EngineResult;
use crate::source::SourceClient;
use boardsync_core::{
    AttachmentRef, AttachmentRefError, RecordStore, SyncedRecord, REF_SEPARATOR,
};
use std::sync::Arc;

/// References to mirror for each attachment of `record`, in list order.
///
/// Entries already in `url|folder|label` form carry their own context;
/// plain URLs go to `folder` with a label built from the record.
pub fn attachment_refs(
    record: &SyncedRecord,
    folder: &str,
) -> Vec<Result<AttachmentRef, AttachmentRefError>> {
    record
        .attachments
        .iter()
        .map(|entry| {
            if entry.contains(REF_SEPARATOR) {
                entry.parse()
            } else {
                let reference = AttachmentRef::for_record(entry.as_str(), folder, record);
                if reference.folder.trim().is_empty() {
                    Err(AttachmentRefError::EmptyFolder)
                } else {
                    Ok(reference)
                }
            }
        })
        .collect()
}

/// Result of mirroring one attachment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirrorOutcome {
    /// Where the copy lives.
    pub destination_url: String,
    /// True if an earlier mapping was reused and nothing was transferred.
    pub reused: bool,
}

/// Copies attachments into the blob store at most once per source URL.
#[derive(Clone)]
pub struct AttachmentMirror {
    store: Arc<dyn RecordStore>,
    source: Arc<dyn SourceClient>,
    blobs: Arc<dyn BlobStore>,
}

impl AttachmentMirror {
    /// Creates a mirror.
    pub fn new(
        store: Arc<dyn RecordStore>,
        source: Arc<dyn SourceClient>,
        blobs: Arc<dyn BlobStore>,
    ) -> Self {
        Self {
            store,
            source,
            blobs,
        }
    }

    /// Returns the destination of `reference`, transferring it first if it was
    /// never mirrored.
    ///
    /// The mapping is written only after a successful upload. An existing
    /// mapping is never replaced, even if the source content changed.
    pub async fn mirror(&self, reference: &AttachmentRef) -> EngineResult<MirrorOutcome> {
        let url = reference.source_url.as_str();
        if let Some(mapping) = self.store.attachment_mapping(url)? {
            tracing::debug!(url, "attachment already mirrored");
            return Ok(MirrorOutcome {
                destination_url: mapping.destination_url,
                reused: true,
            });
        }

        let download = self.source.download_attachment(url).await?;
        let name = reference.object_name(&download.identifier, &download.extension);
        let destination = self
            .blobs
            .upload(&download.local_path, &reference.folder, &name)
            .await?;

        let mapping = self.store.map_attachment(url, &destination)?;
        tracing::info!(url, destination = %mapping.destination_url, "attachment mirrored");
        Ok(MirrorOutcome {
            destination_url: mapping.destination_url,
            reused: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blob::MemoryBlobStore;
    use crate::source::MockSourceClient;
    use boardsync_core::LocalRecordStore;
    use tempfile::tempdir;

    struct Fixture {
        _staging: tempfile::TempDir,
        store: Arc<LocalRecordStore>,
        source: Arc<MockSourceClient>,
        blobs: Arc<MemoryBlobStore>,
        mirror: AttachmentMirror,
    }

    fn fixture() -> Fixture {
        let staging = tempdir().unwrap();
        let store = Arc::new(LocalRecordStore::open_in_memory());
        let source = Arc::new(MockSourceClient::new(staging.path()));
        let blobs = Arc::new(MemoryBlobStore::new());
        let mirror = AttachmentMirror::new(store.clone(), source.clone(), blobs.clone());
        Fixture {
            _staging: staging,
            store,
            source,
            blobs,
            mirror,
        }
    }

    fn record_with(attachments: Vec<&str>) -> SyncedRecord {
        SyncedRecord {
            board_id: "b".into(),
            card_id: "c".into(),
            name: "Deed".into(),
            attributes: boardsync_core::RecordAttributes::SupportiveDoc(
                boardsync_core::SupportiveDocAttributes {
                    title: "Title Deed".into(),
                    category: "legal".into(),
                },
            ),
            labels: vec![],
            attachments: attachments.into_iter().map(String::from).collect(),
            comments: vec![],
            updated_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn refs_follow_list_order_and_context() {
        let record = record_with(vec![
            "http://src/1.pdf",
            "http://src/2.png|docs|label",
            "http://src/3.png|",
        ]);
        let refs = attachment_refs(&record, "supportive_docs");

        let first = refs[0].as_ref().unwrap();
        assert_eq!(first.folder, "supportive_docs");
        assert_eq!(first.label.as_deref(), Some("title_deed_deed"));

        let second = refs[1].as_ref().unwrap();
        assert_eq!(second.folder, "docs");
        assert_eq!(second.label.as_deref(), Some("label"));

        assert_eq!(refs[2], Err(AttachmentRefError::EmptyFolder));
    }

    #[test]
    fn empty_folder_config_is_malformed() {
        let record = record_with(vec!["http://src/1.pdf"]);
        assert_eq!(
            attachment_refs(&record, " ")[0],
            Err(AttachmentRefError::EmptyFolder)
        );
    }

    #[tokio::test]
    async fn mirrors_once_per_source_url() {
        let f = fixture();
        f.source.add_payload("http://src/a.png", b"png".to_vec());
        let reference = AttachmentRef::new("http://src/a.png", "docs").with_label("label");

        let first = f.mirror.mirror(&reference).await.unwrap();
        let second = f.mirror.mirror(&reference).await.unwrap();

        assert!(!first.reused);
        assert!(second.reused);
        assert_eq!(first.destination_url, second.destination_url);
        assert_eq!(f.source.download_count(), 1);
        assert_eq!(f.blobs.upload_count(), 1);
        assert_eq!(f.blobs.objects()[0].folder, "docs");
        assert_eq!(f.blobs.objects()[0].name, "a-label.png");
        assert!(f.store.is_attachment_mapped("http://src/a.png").unwrap());
    }

    #[tokio::test]
    async fn failed_download_leaves_no_mapping() {
        let f = fixture();
        let reference = AttachmentRef::new("http://src/missing.png", "docs");

        assert!(f.mirror.mirror(&reference).await.is_err());
        assert!(!f.store.is_attachment_mapped("http://src/missing.png").unwrap());
        assert_eq!(f.blobs.upload_count(), 0);
    }

    #[tokio::test]
    async fn failed_upload_leaves_no_mapping_and_can_be_retried() {
        let f = fixture();
        f.source.add_payload("http://src/b.pdf", b"pdf".to_vec());
        let reference = AttachmentRef::new("http://src/b.pdf", "docs");

        f.blobs.set_failing(true);
        assert!(f.mirror.mirror(&reference).await.is_err());
        assert!(!f.store.is_attachment_mapped("http://src/b.pdf").unwrap());

        f.blobs.set_failing(false);
        let outcome = f.mirror.mirror(&reference).await.unwrap();
        assert_eq!(outcome.destination_url, "memory://docs/b.pdf");
        assert_eq!(f.source.download_count(), 2);
    }
}
