//! Default value functions for configuration fields.
//!
//! This module contains all the default value functions used by serde's `#[serde(default = ...)]`
//! attributes throughout the configuration system. Functions are organized by category for
//! easier maintenance.

use super::logging::LogFormat;

// =============================================================================
// Port & Root Config
// =============================================================================

pub const fn default_port() -> u16 {
    3000
}

// =============================================================================
// Server / Matchmaking / Match Defaults
// =============================================================================

pub const fn default_elo_k_factor() -> i32 {
    32
}

pub const fn default_elo_reference() -> i32 {
    400
}

pub const fn default_initial_rating() -> i32 {
    1500
}

pub const fn default_history_cap() -> usize {
    10
}

pub const fn default_room_code_length() -> usize {
    8
}

pub const fn default_ping_interval_secs() -> u64 {
    30
}

pub const fn default_queue_notify_all() -> bool {
    true
}

// =============================================================================
// Protocol / Validation Defaults
// =============================================================================

pub const fn default_min_username_length() -> usize {
    3
}

pub const fn default_max_username_length() -> usize {
    15
}

pub const fn default_min_password_length() -> usize {
    8
}

pub const fn default_max_message_body_size() -> usize {
    16_384
}

// =============================================================================
// Logging Defaults
// =============================================================================

pub fn default_log_dir() -> String {
    "logs".to_string()
}

pub fn default_log_filename() -> String {
    "server.log".to_string()
}

pub fn default_rotation() -> String {
    "daily".to_string()
}

pub const fn default_enable_file_logging() -> bool {
    true
}

pub const fn default_log_format() -> LogFormat {
    LogFormat::Json
}

// =============================================================================
// Security Defaults
// =============================================================================

pub fn default_cors_origins() -> String {
    "http://localhost:3000,http://localhost:5173".to_string()
}

pub const fn default_max_message_size() -> usize {
    65536 // 64KB
}

pub const fn default_max_connections_per_ip() -> usize {
    20
}

// =============================================================================
// Auth Maintenance Defaults
// =============================================================================

pub const fn default_login_rate_limit_max_attempts() -> u32 {
    10
}

pub const fn default_login_rate_limit_window_secs() -> u64 {
    60
}

pub const fn default_rate_limit_cache_cleanup_interval_secs() -> u64 {
    300
}

// =============================================================================
// Metrics Defaults
// =============================================================================

pub const fn default_metrics_enabled() -> bool {
    true
}

// =============================================================================
// WebSocket Defaults
// =============================================================================

pub const fn default_auth_timeout_secs() -> u64 {
    10 // time allowed for a connection to register/login before it is dropped
}

pub const fn default_max_connections() -> usize {
    10_000
}
