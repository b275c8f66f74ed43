//! Configuration for the Trello client.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Default Trello REST endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.trello.com/1";

/// Credentials and endpoints for [`TrelloClient`](crate::TrelloClient).
#[derive(Clone)]
pub struct TrelloConfig {
    /// REST endpoint without trailing slash.
    pub base_url: String,
    /// Application key.
    pub api_key: String,
    /// Member token used for reads.
    pub token: String,
    /// Token used for attachment downloads. Falls back to `token`.
    pub download_token: Option<String>,
    /// Directory downloads are staged in.
    pub download_dir: PathBuf,
    /// Request timeout.
    pub timeout: Duration,
}

impl TrelloConfig {
    /// Creates a configuration against the public endpoint.
    pub fn new(
        api_key: impl Into<String>,
        token: impl Into<String>,
        download_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into(),
            token: token.into(),
            download_token: None,
            download_dir: download_dir.into(),
            timeout: Duration::from_secs(60),
        }
    }

    /// Sets the REST endpoint.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Sets a dedicated download token.
    pub fn with_download_token(mut self, token: impl Into<String>) -> Self {
        let token = token.into();
        self.download_token = (!token.is_empty()).then_some(token);
        self
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub(crate) fn effective_download_token(&self) -> &str {
        self.download_token.as_deref().unwrap_or(&self.token)
    }
}

impl fmt::Debug for TrelloConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrelloConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .field("token", &"<redacted>")
            .field("download_dir", &self.download_dir)
            .field("timeout", &self.timeout)
            .finish()
    }
}
