//! Request handlers for the HTTP API.
//!
//! Handlers are transport independent: they take parsed requests and return
//! domain values or a [`ServerError`]. The axum layer in `server.rs` only
//! extracts, authenticates and wraps.

use crate::auth::ApiKeyValidator;
use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use boardsync_core::{
    ErrorRecord, Job, JobId, JobKind, PageRequest, RecordKind, RecordOrder, RecordPage,
    SortDirection,
};
use boardsync_engine::SyncEngine;
use serde::Deserialize;
use std::sync::Arc;

/// Server version reported by `/ping`.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Body of `POST /jobs`.
#[derive(Debug, Clone, Deserialize)]
pub struct SubmitJobRequest {
    /// Job kind name.
    #[serde(rename = "type", default)]
    pub kind: String,
}

/// Body of `POST /errors`.
#[derive(Debug, Clone, Deserialize)]
pub struct ReportErrorRequest {
    /// Component that produced the error.
    #[serde(default)]
    pub source: String,
    /// Error text.
    #[serde(default)]
    pub body: String,
}

/// Query of `GET /records/{kind}`.
///
/// Values are kept as text: unparsable page numbers fall back to defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListRecordsQuery {
    /// Page number.
    pub p: Option<String>,
    /// Page size.
    pub s: Option<String>,
    /// Order column.
    pub o: Option<String>,
    /// Sort direction.
    pub d: Option<String>,
}

/// Shared state of the request handlers.
pub struct HandlerContext {
    /// Server configuration.
    pub config: ServerConfig,
    /// Engine that admits and runs jobs.
    pub engine: Arc<SyncEngine>,
    auth: ApiKeyValidator,
}

impl HandlerContext {
    /// Creates a handler context.
    pub fn new(config: ServerConfig, engine: Arc<SyncEngine>) -> Self {
        let auth = ApiKeyValidator::new(Arc::clone(engine.store()));
        Self {
            config,
            engine,
            auth,
        }
    }
}

/// Handler for API requests.
pub struct RequestHandler {
    context: Arc<HandlerContext>,
}

impl RequestHandler {
    /// Creates a new request handler.
    pub fn new(context: Arc<HandlerContext>) -> Self {
        Self { context }
    }

    /// Checks the API key of a request.
    pub fn authorize(&self, key: Option<&str>) -> ServerResult<()> {
        self.context.auth.validate(key)
    }

    /// Liveness text with version and environment.
    pub fn ping(&self) -> String {
        format!(
            "version: {VERSION} - env: {}",
            self.context.config.environment
        )
    }

    /// Admits a job and starts it in the background.
    pub fn submit_job(&self, request: &SubmitJobRequest) -> ServerResult<JobId> {
        let kind = request.kind.trim();
        if kind.is_empty() {
            return Err(ServerError::InvalidRequest("job type is required".into()));
        }
        let kind: JobKind = kind
            .parse()
            .map_err(|err: boardsync_core::UnknownJobKind| {
                ServerError::InvalidRequest(err.to_string())
            })?;
        let id = self.context.engine.submit_job(kind)?;
        tracing::info!(job_id = id.as_u64(), kind = %kind, "job submitted");
        Ok(id)
    }

    /// Loads a job.
    pub fn get_job(&self, id: u64) -> ServerResult<Job> {
        Ok(self.context.engine.get_job(JobId::new(id))?)
    }

    /// Appends an externally reported error.
    pub fn record_error(&self, request: &ReportErrorRequest) -> ServerResult<ErrorRecord> {
        if request.source.trim().is_empty() {
            return Err(ServerError::InvalidRequest("error source is required".into()));
        }
        Ok(self
            .context
            .engine
            .store()
            .new_error(&request.source, &request.body)?)
    }

    /// Lists records of the kind's configured board.
    pub fn list_records(&self, kind: &str, query: &ListRecordsQuery) -> ServerResult<RecordPage> {
        let kind = record_kind(kind)?;
        let board = self
            .context
            .engine
            .config()
            .board(kind)
            .ok_or_else(|| ServerError::NotFound(format!("no board configured for {kind}")))?;
        let page = self.page_request(query)?;
        Ok(self
            .context
            .engine
            .store()
            .list_records(kind, &board.board_id, &page)?)
    }

    fn page_request(&self, query: &ListRecordsQuery) -> ServerResult<PageRequest> {
        let config = &self.context.config;
        let page = parse_or(query.p.as_deref(), 1);
        let size = parse_or(query.s.as_deref(), config.default_page_size).min(config.max_page_size);
        let order = match non_empty(query.o.as_deref()) {
            Some(o) => o.parse::<RecordOrder>().map_err(ServerError::InvalidRequest)?,
            None => RecordOrder::default(),
        };
        let direction = match non_empty(query.d.as_deref()) {
            Some(d) => d
                .to_ascii_lowercase()
                .parse::<SortDirection>()
                .map_err(ServerError::InvalidRequest)?,
            None => SortDirection::default(),
        };
        Ok(PageRequest::new(page)
            .with_page_size(size)
            .with_order(order, direction))
    }
}

fn record_kind(name: &str) -> ServerResult<RecordKind> {
    let kind: JobKind = name
        .parse()
        .map_err(|err: boardsync_core::UnknownJobKind| ServerError::NotFound(err.to_string()))?;
    kind.record_kind()
        .ok_or_else(|| ServerError::NotFound(format!("{kind} has no records")))
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn parse_or(value: Option<&str>, default: u32) -> u32 {
    non_empty(value)
        .and_then(|v| v.parse::<u32>().ok())
        .filter(|v| *v > 0)
        .unwrap_or(default)
}
