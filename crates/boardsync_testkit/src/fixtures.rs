//! Test fixtures and engine helpers.
//!
//! Provides builders for source entities and a fully wired engine whose
//! collaborators are in-memory doubles.

use boardsync_core::{
    ConfinementAttributes, Job, JobId, LocalRecordStore, PropertyAttributes, RecordAttributes,
    RecordKind, RecordStore, SupportiveDocAttributes,
};
use boardsync_engine::{
    BoardConfig, EngineConfig, EngineParts, ErrorReceiver, ErrorSink, MemoryBlobStore,
    MockSourceClient, RawAttachment, RawComment, RawEntity, RawLabel, RecordingNotifier,
    SyncEngine,
};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

/// Board id used for properties by [`TestEngine`].
pub const PROPERTIES_BOARD: &str = "props-board";
/// Board id used for inheritance confinements by [`TestEngine`].
pub const CONFINEMENTS_BOARD: &str = "conf-board";
/// Board id used for supportive docs by [`TestEngine`].
pub const SUPPORTIVE_DOCS_BOARD: &str = "docs-board";
/// Webhook configured for properties by [`TestEngine`].
pub const PROPERTIES_WEBHOOK: &str = "https://hooks.example.com/properties";

/// Builder for [`RawEntity`] values.
#[derive(Debug, Clone)]
pub struct EntityBuilder {
    entity: RawEntity,
}

impl EntityBuilder {
    fn with_fields(id: &str, name: &str, fields: RecordAttributes) -> Self {
        Self {
            entity: RawEntity {
                id: id.to_string(),
                name: name.to_string(),
                last_activity: None,
                fields,
                labels: Vec::new(),
                attachments: Vec::new(),
                comments: Vec::new(),
            },
        }
    }

    /// A property card located at `location`.
    pub fn property(id: &str, location: &str) -> Self {
        Self::with_fields(
            id,
            location,
            RecordAttributes::Property(PropertyAttributes {
                location_en: location.to_string(),
                ..PropertyAttributes::default()
            }),
        )
    }

    /// An inheritance confinement card.
    pub fn confinement(id: &str, title: &str, generation: i64) -> Self {
        Self::with_fields(
            id,
            title,
            RecordAttributes::InheritanceConfinement(ConfinementAttributes {
                title: title.to_string(),
                generation,
            }),
        )
    }

    /// A supportive document card.
    pub fn supportive_doc(id: &str, title: &str, category: &str) -> Self {
        Self::with_fields(
            id,
            title,
            RecordAttributes::SupportiveDoc(SupportiveDocAttributes {
                title: title.to_string(),
                category: category.to_string(),
            }),
        )
    }

    /// Sets the card name.
    pub fn name(mut self, name: &str) -> Self {
        self.entity.name = name.to_string();
        self
    }

    /// Sets the last activity timestamp.
    pub fn last_activity(mut self, at: DateTime<Utc>) -> Self {
        self.entity.last_activity = Some(at);
        self
    }

    /// Adds an attachment served at `url`.
    pub fn attachment(mut self, url: &str) -> Self {
        let index = self.entity.attachments.len();
        let name = url.rsplit('/').next().unwrap_or(url).to_string();
        self.entity.attachments.push(RawAttachment {
            id: format!("{}-a{index}", self.entity.id),
            url: url.to_string(),
            name,
        });
        self
    }

    /// Adds a comment.
    pub fn comment(mut self, text: &str) -> Self {
        self.entity.comments.push(RawComment {
            text: text.to_string(),
        });
        self
    }

    /// Adds a label.
    pub fn label(mut self, name: &str) -> Self {
        let index = self.entity.labels.len();
        self.entity.labels.push(RawLabel {
            id: format!("{}-l{index}", self.entity.id),
            name: name.to_string(),
        });
        self
    }

    /// Modifies the typed fields in place.
    pub fn fields(mut self, f: impl FnOnce(&mut RecordAttributes)) -> Self {
        f(&mut self.entity.fields);
        self
    }

    /// Finishes the entity.
    pub fn build(self) -> RawEntity {
        self.entity
    }
}

/// Engine configuration with the three boards [`TestEngine`] uses.
pub fn test_engine_config() -> EngineConfig {
    EngineConfig::new()
        .with_board(
            RecordKind::Property,
            BoardConfig::new(PROPERTIES_BOARD).with_webhook(PROPERTIES_WEBHOOK),
        )
        .with_board(
            RecordKind::InheritanceConfinement,
            BoardConfig::new(CONFINEMENTS_BOARD),
        )
        .with_board(RecordKind::SupportiveDoc, BoardConfig::new(SUPPORTIVE_DOCS_BOARD))
}

/// A sync engine wired to in-memory doubles and a file store in a
/// temporary directory.
pub struct TestEngine {
    /// The engine.
    pub engine: Arc<SyncEngine>,
    /// The store, shared with the engine.
    pub store: Arc<LocalRecordStore>,
    /// Scripted source client.
    pub source: Arc<MockSourceClient>,
    /// In-memory blob store.
    pub blobs: Arc<MemoryBlobStore>,
    /// Recording notifier.
    pub notifier: Arc<RecordingNotifier>,
    /// Receiving half of the engine's error channel.
    pub errors: ErrorReceiver,
    temp_dir: TempDir,
}

impl TestEngine {
    /// Creates an engine with [`test_engine_config`].
    pub fn new() -> Self {
        Self::with_config(test_engine_config())
    }

    /// Creates an engine with `config`.
    pub fn with_config(config: EngineConfig) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let store = Arc::new(
            LocalRecordStore::open(temp_dir.path().join("store"))
                .expect("Failed to open record store"),
        );
        let staging = temp_dir.path().join("staging");
        std::fs::create_dir_all(&staging).expect("Failed to create staging directory");
        let source = Arc::new(MockSourceClient::new(staging));
        let blobs = Arc::new(MemoryBlobStore::new());
        let notifier = Arc::new(RecordingNotifier::new());
        let (sink, errors) = ErrorSink::channel();

        let parts = EngineParts {
            store: store.clone(),
            source: source.clone(),
            blobs: blobs.clone(),
            notifier: notifier.clone(),
        };
        let engine = Arc::new(SyncEngine::new(config, parts, sink));

        Self {
            engine,
            store,
            source,
            blobs,
            notifier,
            errors,
            temp_dir,
        }
    }

    /// Temporary directory holding the store and staging files.
    pub fn dir(&self) -> &std::path::Path {
        self.temp_dir.path()
    }

    /// Drains reports currently queued on the error channel.
    pub fn drain_errors(&mut self) -> Vec<(String, String)> {
        let mut drained = Vec::new();
        while let Ok(report) = self.errors.try_recv() {
            drained.push((report.source, report.body));
        }
        drained
    }

    /// Polls a job until it reaches a terminal state.
    ///
    /// # Panics
    ///
    /// Panics if the job is not terminal within `timeout`.
    pub async fn wait_for_terminal(&self, id: JobId, timeout: Duration) -> Job {
        wait_for_terminal(self.store.as_ref(), id, timeout).await
    }
}

impl Default for TestEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Polls `store` until job `id` is terminal.
///
/// # Panics
///
/// Panics if the job is missing or not terminal within `timeout`.
pub async fn wait_for_terminal(store: &dyn RecordStore, id: JobId, timeout: Duration) -> Job {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        let job = store
            .get_job(id)
            .expect("Failed to read job")
            .expect("Job should exist");
        if job.state.is_terminal() {
            return job;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "{id} still {} after {timeout:?}",
            job.state
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
