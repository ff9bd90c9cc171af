//! Configuration module for the card-game session hub.
//!
//! This module provides layered configuration management with support for:
//! - JSON configuration files
//! - Environment variable overrides
//! - Stdin input
//! - Sensible defaults
//!
//! # Module Structure
//!
//! - [`types`]: Root `Config` struct
//! - [`server`]: Matchmaking/Elo/history behavior
//! - [`security`]: CORS, message-size limits, username/password rules, login throttling
//! - [`logging`]: Logging configuration
//! - [`metrics`]: Metrics configuration
//! - [`websocket`]: Connection-level settings
//! - [`loader`]: Configuration loading functions
//! - [`validation`]: Configuration validation functions
//! - [`defaults`]: Default value functions

pub mod defaults;
pub mod loader;
pub mod logging;
pub mod metrics;
pub mod security;
pub mod server;
pub mod types;
pub mod validation;
pub mod websocket;

pub use loader::load;
pub use logging::{LogFormat, LogLevel, LoggingConfig};
pub use metrics::MetricsConfig;
pub use security::{AuthMaintenanceConfig, LoginRateLimitConfig, SecurityConfig};
pub use server::ServerConfig;
pub use types::Config;
pub use validation::{is_production_mode, validate_config_security};
pub use websocket::WebSocketConfig;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = Config::default();

        assert_eq!(config.port, 3000);
        assert_eq!(config.server.elo_k_factor, 32);
        assert_eq!(config.server.elo_reference, 400);
        assert_eq!(config.server.initial_rating, 1500);
        assert_eq!(config.server.history_cap, 10);

        assert_eq!(config.security.min_username_length, 3);
        assert_eq!(config.security.max_username_length, 15);

        assert_eq!(config.logging.dir, "logs");
        assert_eq!(config.logging.filename, "server.log");
        assert_eq!(config.logging.rotation, "daily");
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let json = serde_json::to_string_pretty(&config).unwrap();
        let deserialized: Config = serde_json::from_str(&json).unwrap();

        assert_eq!(config.port, deserialized.port);
        assert_eq!(config.server.elo_k_factor, deserialized.server.elo_k_factor);
        assert_eq!(
            config.security.min_username_length,
            deserialized.security.min_username_length
        );
    }

    #[test]
    fn test_log_level_display() {
        assert_eq!(LogLevel::Trace.to_string(), "trace");
        assert_eq!(LogLevel::Info.to_string(), "info");
        assert_eq!(LogLevel::Error.to_string(), "error");
    }
}
