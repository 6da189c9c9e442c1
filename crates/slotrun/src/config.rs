//! Connection and server settings.

use std::time::Duration;

use crate::registry::DEFAULT_MODULE_DIR;

/// Port the RPC service listens on unless told otherwise.
pub const DEFAULT_PORT: u16 = 1087;

/// Largest frame either side accepts by default (1 MiB).
pub const DEFAULT_MAX_FRAME_LEN: usize = 1 << 20;

/// Client-side settings for a TCP session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// `host:port` of the server.
    pub endpoint: String,
    /// Upper bound for establishing the connection. Calls themselves are not
    /// bounded.
    pub connect_timeout: Duration,
    pub max_frame_len: usize,
}

impl SessionConfig {
    /// Targets `host` on [`DEFAULT_PORT`].
    pub fn new(host: &str) -> Self {
        Self { endpoint: format!("{}:{}", host, DEFAULT_PORT), ..Self::default() }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            endpoint: format!("127.0.0.1:{}", DEFAULT_PORT),
            connect_timeout: Duration::from_secs(5),
            max_frame_len: DEFAULT_MAX_FRAME_LEN,
        }
    }
}

/// Server-side settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Address to listen on.
    pub bind: String,
    /// Catalog directory that `module.load` requests resolve against.
    pub module_dir: String,
    pub max_frame_len: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: format!("0.0.0.0:{}", DEFAULT_PORT),
            module_dir: DEFAULT_MODULE_DIR.to_string(),
            max_frame_len: DEFAULT_MAX_FRAME_LEN,
        }
    }
}
