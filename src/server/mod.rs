//! Main server orchestration: the `HubServer` wires the Store Gateway,
//! Session Table, Matchmaking Queue, Match Coordinator, Signaling Relay,
//! Spectate Room Registry, and Broadcast-List Notifier together, and is the
//! shared `axum` application state.

pub mod connection_manager;
pub mod handlers;
pub mod message_router;

use std::net::IpAddr;
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::auth::{Argon2PasswordHasher, InMemoryRateLimiter, PasswordHasher};
use crate::broadcast_notifier::BroadcastNotifier;
use crate::config::Config;
use crate::match_coordinator::MatchCoordinator;
use crate::metrics::ServerMetrics;
use crate::protocol::{ConnId, ServerMessage};
use crate::queue::MatchQueue;
use crate::retry::{RetryConfig, RetryExecutor};
use crate::session::SessionTable;
use crate::signaling::Signaling;
use crate::spectate::SpectateRegistry;
use crate::store::{InMemoryStore, Store};

use self::connection_manager::ConnectionManager;

pub struct HubServer {
    pub config: Config,
    pub store: Arc<dyn Store>,
    pub sessions: Arc<SessionTable>,
    pub queue: Arc<MatchQueue>,
    pub match_coordinator: MatchCoordinator,
    pub signaling: Signaling,
    pub spectate: Arc<SpectateRegistry>,
    pub notifier: BroadcastNotifier,
    pub metrics: Arc<ServerMetrics>,
    pub password_hasher: Arc<dyn PasswordHasher>,
    pub login_rate_limiter: Arc<InMemoryRateLimiter>,
    pub connection_manager: ConnectionManager,
    pub retry: RetryExecutor,
}

impl HubServer {
    pub async fn new(config: Config) -> anyhow::Result<Arc<Self>> {
        let store: Arc<dyn Store> = Arc::new(InMemoryStore::new());
        store.initialize().await?;

        let sessions = Arc::new(SessionTable::new());
        let queue = Arc::new(MatchQueue::new());
        let spectate = Arc::new(SpectateRegistry::new(sessions.clone()));
        let match_coordinator = MatchCoordinator::new(
            store.clone(),
            sessions.clone(),
            config.server.elo_k_factor,
            config.server.elo_reference,
            config.server.history_cap,
        );
        let signaling = Signaling::new(sessions.clone(), spectate.clone());
        let notifier = BroadcastNotifier::new(sessions.clone(), spectate.clone(), queue.clone());
        let metrics = Arc::new(ServerMetrics::new());
        let password_hasher: Arc<dyn PasswordHasher> = Arc::new(Argon2PasswordHasher);
        let login_rate_limiter = Arc::new(InMemoryRateLimiter::new(
            std::time::Duration::from_secs(config.auth.rate_limit_cache_cleanup_interval_secs),
            std::time::Duration::from_secs(config.security.login_rate_limit.window_secs),
        ));
        let connection_manager = ConnectionManager::new(config.security.max_connections_per_ip);
        let retry = RetryExecutor::new(RetryConfig::storage());

        Ok(Arc::new(Self {
            config,
            store,
            sessions,
            queue,
            match_coordinator,
            signaling,
            spectate,
            notifier,
            metrics,
            password_hasher,
            login_rate_limiter,
            connection_manager,
            retry,
        }))
    }

    /// Spawns the background sweep that trims the login rate limiter's
    /// sliding-window cache.
    pub fn spawn_maintenance_tasks(self: &Arc<Self>) {
        self.login_rate_limiter.clone().start_cleanup_task();
    }

    /// Accepts a freshly upgraded connection: enforces the per-IP cap,
    /// registers the session, and bumps metrics. Returns the assigned
    /// connection id, or `None` if the IP is already at its limit.
    pub async fn accept_connection(
        &self,
        addr: IpAddr,
        sender: mpsc::Sender<Arc<ServerMessage>>,
    ) -> Option<ConnId> {
        if !self.connection_manager.try_acquire(addr) {
            return None;
        }
        let conn_id = ConnId::new_v4();
        self.sessions.register(conn_id, sender).await;
        self.metrics.connection_opened();
        Some(conn_id)
    }

    /// Tears down a closed connection: releases its per-IP slot, evicts it
    /// from the queue and any spectate rooms, and updates metrics.
    pub async fn handle_disconnect(&self, conn_id: ConnId, addr: IpAddr) {
        self.connection_manager.release(addr);
        let removed = self.sessions.remove(conn_id).await;
        if let Some(session) = removed {
            if let Some(user_id) = session.user_id {
                self.queue.leave(user_id).await;
                self.metrics.session_unbound();
                self.notifier.push_queue_count().await;
            }
        }
        let room_list_changed = self.spectate.handle_disconnect(conn_id).await;
        if room_list_changed {
            self.notifier.push_broadcast_list().await;
        }
        self.metrics.connection_closed();
    }

    /// Parses one inbound text frame and dispatches it. Malformed frames are
    /// logged and dropped; the caller sends nothing back for them. Returns
    /// whether the frame was one of `register`/`login`/`auto_login`, so the
    /// transport layer can clear its authentication-timeout deadline.
    pub async fn dispatch(&self, conn_id: ConnId, raw: &str) -> bool {
        use crate::protocol::ClientMessage;

        let message: ClientMessage = match serde_json::from_str(raw) {
            Ok(message) => message,
            Err(error) => {
                tracing::warn!(%conn_id, %error, "dropping malformed frame");
                return false;
            }
        };
        let is_auth_attempt = matches!(
            message,
            ClientMessage::Register { .. } | ClientMessage::Login { .. } | ClientMessage::AutoLogin { .. }
        );
        message_router::route(self, conn_id, message).await;
        is_auth_attempt
    }
}
