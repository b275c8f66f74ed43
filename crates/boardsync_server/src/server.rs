//! HTTP routes and the server loop.
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/ping` | Version and environment, no key required |
//! | `POST` | `/jobs` | Submit a job `{"type": "<kind>"}` |
//! | `GET` | `/jobs/{id}` | Job state and counters |
//! | `POST` | `/errors` | Append an error record `{"source", "body"}` |
//! | `GET` | `/records/{kind}` | Paged records, query `p`, `s`, `o`, `d` |

use crate::auth::API_KEY_HEADER;
use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::handler::{
    HandlerContext, ListRecordsQuery, ReportErrorRequest, RequestHandler, SubmitJobRequest,
};
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, Request, State};
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use boardsync_engine::SyncEngine;
use serde::Serialize;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

type AppState = Arc<RequestHandler>;

#[derive(Debug, Serialize)]
struct DataResponse<T> {
    data: T,
}

#[derive(Debug, Serialize)]
struct MessageResponse {
    message: String,
}

fn data_response<T: Serialize>(data: T) -> Response {
    Json(DataResponse { data }).into_response()
}

fn error_response(status: StatusCode, msg: impl Into<String>) -> Response {
    (
        status,
        Json(MessageResponse {
            message: msg.into(),
        }),
    )
        .into_response()
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        if self.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        error_response(self.status_code(), self.to_string())
    }
}

/// The HTTP API server.
///
/// # Example
///
/// ```rust,ignore
/// let server = BoardsyncServer::new(ServerConfig::default(), engine);
/// let shutdown = CancellationToken::new();
/// server.run(shutdown.clone()).await?;
/// ```
pub struct BoardsyncServer {
    config: ServerConfig,
    handler: AppState,
}

impl BoardsyncServer {
    /// Creates a server around a running engine.
    pub fn new(config: ServerConfig, engine: Arc<SyncEngine>) -> Self {
        let context = Arc::new(HandlerContext::new(config.clone(), engine));
        let handler = Arc::new(RequestHandler::new(context));
        Self { config, handler }
    }

    /// Builds the router.
    pub fn router(&self) -> Router {
        let protected = Router::new()
            .route("/jobs", post(submit_job))
            .route("/jobs/{id}", get(get_job))
            .route("/errors", post(record_error))
            .route("/records/{kind}", get(list_records))
            .route_layer(middleware::from_fn_with_state(
                Arc::clone(&self.handler),
                require_api_key,
            ));

        Router::new()
            .route("/ping", get(ping))
            .merge(protected)
            .with_state(Arc::clone(&self.handler))
    }

    /// Binds the configured address and serves until `shutdown` is cancelled.
    pub async fn run(self, shutdown: CancellationToken) -> ServerResult<()> {
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        self.serve(listener, shutdown).await
    }

    /// Serves on an already bound listener until `shutdown` is cancelled.
    pub async fn serve(self, listener: TcpListener, shutdown: CancellationToken) -> ServerResult<()> {
        let addr = listener.local_addr()?;
        tracing::info!(%addr, "http api listening");
        axum::serve(listener, self.router())
            .with_graceful_shutdown(async move { shutdown.cancelled().await })
            .await?;
        tracing::info!("http api stopped");
        Ok(())
    }
}

async fn require_api_key(State(handler): State<AppState>, request: Request, next: Next) -> Response {
    let key = request
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|value| value.to_str().ok());
    match handler.authorize(key) {
        Ok(()) => next.run(request).await,
        Err(err) => err.into_response(),
    }
}

async fn ping(State(handler): State<AppState>) -> Response {
    Json(MessageResponse {
        message: handler.ping(),
    })
    .into_response()
}

async fn submit_job(
    State(handler): State<AppState>,
    body: Result<Json<SubmitJobRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match body {
        Ok(body) => body,
        Err(rejection) => {
            return error_response(
                StatusCode::BAD_REQUEST,
                format!("invalid job: {}", rejection.body_text()),
            )
        }
    };
    match handler.submit_job(&request) {
        Ok(id) => data_response(id),
        Err(err) => err.into_response(),
    }
}

async fn get_job(State(handler): State<AppState>, Path(id): Path<String>) -> Response {
    let Ok(id) = id.parse::<u64>() else {
        return error_response(StatusCode::BAD_REQUEST, "job ID could not be parsed");
    };
    match handler.get_job(id) {
        Ok(job) => data_response(job),
        Err(err) => err.into_response(),
    }
}

async fn record_error(
    State(handler): State<AppState>,
    body: Result<Json<ReportErrorRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match body {
        Ok(body) => body,
        Err(rejection) => {
            return error_response(
                StatusCode::BAD_REQUEST,
                format!("invalid error: {}", rejection.body_text()),
            )
        }
    };
    match handler.record_error(&request) {
        Ok(record) => data_response(record),
        Err(err) => err.into_response(),
    }
}

async fn list_records(
    State(handler): State<AppState>,
    Path(kind): Path<String>,
    Query(query): Query<ListRecordsQuery>,
) -> Response {
    match handler.list_records(&kind, &query) {
        Ok(page) => data_response(page),
        Err(err) => err.into_response(),
    }
}
