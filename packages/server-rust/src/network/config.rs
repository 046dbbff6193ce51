//! Network configuration types for the Keyward server.

use std::time::Duration;

/// Top-level network configuration for the server.
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    /// Bind address for the server.
    pub host: String,
    /// Port to listen on. 0 means OS-assigned.
    pub port: u16,
    /// Maximum time to wait for a request to complete.
    pub request_timeout: Duration,
    /// Largest request payload read into a request context, in bytes.
    pub max_body_bytes: usize,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 0,
            request_timeout: Duration::from_secs(30),
            max_body_bytes: 1_048_576, // 1 MiB
        }
    }
}
