//! WebSocket transport configuration types.

use super::defaults::{default_auth_timeout_secs, default_max_connections};
use serde::{Deserialize, Serialize};

/// WebSocket configuration.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct WebSocketConfig {
    /// Time allowed for a freshly accepted connection to send `register`,
    /// `login`, or `auto_login` before it is dropped.
    #[serde(default = "default_auth_timeout_secs")]
    pub auth_timeout_secs: u64,
    /// Soft cap on simultaneously open connections, enforced at accept time.
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
}

impl Default for WebSocketConfig {
    fn default() -> Self {
        Self {
            auth_timeout_secs: default_auth_timeout_secs(),
            max_connections: default_max_connections(),
        }
    }
}

impl WebSocketConfig {
    /// Validate WebSocket configuration.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.auth_timeout_secs < 2 {
            anyhow::bail!(
                "websocket.auth_timeout_secs must be at least 2 seconds (configured: {})",
                self.auth_timeout_secs
            );
        }
        if self.auth_timeout_secs > 120 {
            anyhow::bail!(
                "websocket.auth_timeout_secs must not exceed 120 seconds (configured: {})",
                self.auth_timeout_secs
            );
        }
        Ok(())
    }
}
