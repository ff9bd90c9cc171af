#![cfg_attr(not(test), deny(clippy::panic))]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions,
    clippy::struct_excessive_bools,
    clippy::too_many_arguments,
    clippy::too_many_lines,
    clippy::similar_names
)]

//! # Card Hub Server
//!
//! Realtime session hub for a rated 1v1 card-game matching service: connection
//! lifecycle and session takeover, a FIFO matchmaking queue, match lifecycle
//! and Elo resolution, opaque WebRTC signaling relay, and spectate rooms.

/// Authentication: password hashing and login-attempt throttling
pub mod auth;

/// Broadcast-list and queue-count push notifications
pub mod broadcast_notifier;

/// Server configuration and environment variables
pub mod config;

/// Elo rating update
pub mod elo;

/// Structured logging configuration
pub mod logging;

/// Match lifecycle: creation, report reconciliation, resolution
pub mod match_coordinator;

/// Metrics collection and reporting
pub mod metrics;

/// Matchmaking queue
pub mod queue;

/// WebSocket message protocol definitions
pub mod protocol;

/// Retry policy for the Store Gateway
pub mod retry;

/// Main server orchestration: the hub, message router, and handlers
pub mod server;

/// Live connection / bound user session table
pub mod session;

/// Opaque WebRTC signal relay
pub mod signaling;

/// Spectate room registry
pub mod spectate;

/// User and match persistence gateway
pub mod store;

/// WebSocket connection handling
pub mod websocket;
