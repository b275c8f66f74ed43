//! Server configuration.

use boardsync_core::PageRequest;
use std::net::SocketAddr;

/// Configuration for the HTTP API.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to.
    pub bind_addr: SocketAddr,
    /// Runtime environment reported by `/ping`.
    pub environment: String,
    /// Page size used when a listing does not specify one.
    pub default_page_size: u32,
    /// Largest page size a listing may request.
    pub max_page_size: u32,
}

impl ServerConfig {
    /// Creates a configuration bound to `bind_addr`.
    pub fn new(bind_addr: SocketAddr) -> Self {
        Self {
            bind_addr,
            environment: "dev".to_string(),
            default_page_size: PageRequest::DEFAULT_PAGE_SIZE,
            max_page_size: 500,
        }
    }

    /// Sets the runtime environment name.
    pub fn with_environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = environment.into();
        self
    }

    /// Sets the default page size.
    pub fn with_default_page_size(mut self, size: u32) -> Self {
        self.default_page_size = size.max(1);
        self
    }

    /// Sets the maximum page size.
    pub fn with_max_page_size(mut self, size: u32) -> Self {
        self.max_page_size = size.max(1);
        self
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new(SocketAddr::from(([127, 0, 0, 1], 8080)))
    }
}
