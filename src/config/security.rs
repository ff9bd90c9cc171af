//! Security and authentication configuration types.

use super::defaults::{
    default_cors_origins, default_login_rate_limit_max_attempts,
    default_login_rate_limit_window_secs, default_max_connections_per_ip,
    default_max_message_size, default_max_username_length, default_min_password_length,
    default_min_username_length, default_rate_limit_cache_cleanup_interval_secs,
};
use serde::{Deserialize, Serialize};

/// Security configuration.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SecurityConfig {
    /// Allowed CORS origins (comma-separated, or "*" for any)
    #[serde(default = "default_cors_origins")]
    pub cors_origins: String,
    /// Maximum WebSocket message size in bytes
    #[serde(default = "default_max_message_size")]
    pub max_message_size: usize,
    /// Maximum connections per IP address
    #[serde(default = "default_max_connections_per_ip")]
    pub max_connections_per_ip: usize,
    /// Username length bounds
    #[serde(default = "default_min_username_length")]
    pub min_username_length: usize,
    #[serde(default = "default_max_username_length")]
    pub max_username_length: usize,
    /// Minimum password length accepted at registration
    #[serde(default = "default_min_password_length")]
    pub min_password_length: usize,
    /// Login attempt throttling, keyed per username
    #[serde(default)]
    pub login_rate_limit: LoginRateLimitConfig,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            cors_origins: default_cors_origins(),
            max_message_size: default_max_message_size(),
            max_connections_per_ip: default_max_connections_per_ip(),
            min_username_length: default_min_username_length(),
            max_username_length: default_max_username_length(),
            min_password_length: default_min_password_length(),
            login_rate_limit: LoginRateLimitConfig::default(),
        }
    }
}

/// Throttles repeated login/register attempts per username.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoginRateLimitConfig {
    #[serde(default = "default_login_rate_limit_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_login_rate_limit_window_secs")]
    pub window_secs: u64,
}

impl Default for LoginRateLimitConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_login_rate_limit_max_attempts(),
            window_secs: default_login_rate_limit_window_secs(),
        }
    }
}

/// Auth-adjacent maintenance sweeps (cleanup of the login rate limiter cache).
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AuthMaintenanceConfig {
    /// Interval between rate-limit cache cleanup sweeps (seconds)
    #[serde(default = "default_rate_limit_cache_cleanup_interval_secs")]
    pub rate_limit_cache_cleanup_interval_secs: u64,
}

impl Default for AuthMaintenanceConfig {
    fn default() -> Self {
        Self {
            rate_limit_cache_cleanup_interval_secs:
                default_rate_limit_cache_cleanup_interval_secs(),
        }
    }
}
