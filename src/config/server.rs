//! Server behavior configuration: matchmaking, match resolution, rating.

use super::defaults::{
    default_elo_k_factor, default_elo_reference, default_history_cap, default_initial_rating,
    default_ping_interval_secs, default_queue_notify_all, default_room_code_length,
};
use serde::{Deserialize, Serialize};

/// Server configuration for matchmaking, match resolution, and rating.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    /// K-factor used in the Elo update (§6 of the spec).
    #[serde(default = "default_elo_k_factor")]
    pub elo_k_factor: i32,
    /// Reference denominator in the expected-score formula (standard Elo: 400).
    #[serde(default = "default_elo_reference")]
    pub elo_reference: i32,
    /// Starting rating assigned to a newly registered user.
    #[serde(default = "default_initial_rating")]
    pub initial_rating: i32,
    /// Number of match-history entries retained per user, newest first.
    #[serde(default = "default_history_cap")]
    pub history_cap: usize,
    /// Length, in hex characters, of generated spectate room tokens.
    #[serde(default = "default_room_code_length")]
    pub room_code_length: usize,
    /// Heartbeat ping interval sent to idle connections (seconds).
    #[serde(default = "default_ping_interval_secs")]
    pub ping_interval_secs: u64,
    /// Whether queue-count updates are pushed to every connection (true) or
    /// only to queue members (false).
    #[serde(default = "default_queue_notify_all")]
    pub queue_notify_all: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            elo_k_factor: default_elo_k_factor(),
            elo_reference: default_elo_reference(),
            initial_rating: default_initial_rating(),
            history_cap: default_history_cap(),
            room_code_length: default_room_code_length(),
            ping_interval_secs: default_ping_interval_secs(),
            queue_notify_all: default_queue_notify_all(),
        }
    }
}
