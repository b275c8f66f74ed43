//! Completion notifications.

use crate::error::{EngineError, EngineResult};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::time::Duration;

/// Signals a downstream system that a run completed.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Sends one notification to `url`.
    async fn notify(&self, url: &str) -> EngineResult<()>;
}

/// POSTs an empty body to the webhook. Any non-2xx status is a failure.
#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    client: reqwest::Client,
}

impl WebhookNotifier {
    /// Default request timeout.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

    /// Creates a notifier with the default timeout.
    pub fn new() -> EngineResult<Self> {
        Self::with_timeout(Self::DEFAULT_TIMEOUT)
    }

    /// Creates a notifier with a request timeout.
    pub fn with_timeout(timeout: Duration) -> EngineResult<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("boardsync/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|err| EngineError::notify(format!("failed to build HTTP client: {err}")))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, url: &str) -> EngineResult<()> {
        if url.trim().is_empty() {
            return Err(EngineError::notify("webhook url is empty"));
        }
        let response = self
            .client
            .post(url)
            .header(reqwest::header::CONTENT_TYPE, "text/plain")
            .body("")
            .send()
            .await
            .map_err(|err| EngineError::notify(format!("POST {url} failed: {err}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(EngineError::notify(format!("POST {url} returned HTTP {status}")));
        }
        Ok(())
    }
}

/// Records notifications instead of sending them.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<String>>,
    failing: Mutex<bool>,
}

impl RecordingNotifier {
    /// Creates a notifier that succeeds.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes notifications fail after being recorded.
    pub fn set_failing(&self, failing: bool) {
        *self.failing.lock() = failing;
    }

    /// URLs notified so far.
    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, url: &str) -> EngineResult<()> {
        self.sent.lock().push(url.to_string());
        if *self.failing.lock() {
            return Err(EngineError::notify(format!("scripted failure for {url}")));
        }
        Ok(())
    }
}
