//! Session Table (component B): the in-memory map from live connections to
//! bound users, with single-live-session-per-user enforcement.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{mpsc, RwLock};
use tracing::{info, warn};

use crate::protocol::{ConnId, MatchId, RoomId, ServerMessage, UserId};

/// Per-connection state. Cheap to clone the handle (`Sender`) but the struct
/// itself always lives behind the table's lock.
#[derive(Clone)]
pub struct ConnectionSession {
    pub conn_id: ConnId,
    pub user_id: Option<UserId>,
    pub opponent_conn_id: Option<ConnId>,
    pub match_id: Option<MatchId>,
    /// Set only while this connection owns a spectate room; lets a
    /// latecomer spectator be bootstrapped without a fresh offer/answer.
    pub cached_broadcaster_offer: Option<serde_json::Value>,
    pub owned_room: Option<RoomId>,
    pub spectating_rooms: Vec<RoomId>,
    sender: mpsc::Sender<Arc<ServerMessage>>,
}

impl ConnectionSession {
    fn new(conn_id: ConnId, sender: mpsc::Sender<Arc<ServerMessage>>) -> Self {
        Self {
            conn_id,
            user_id: None,
            opponent_conn_id: None,
            match_id: None,
            cached_broadcaster_offer: None,
            owned_room: None,
            spectating_rooms: Vec::new(),
            sender,
        }
    }
}

#[derive(Default)]
struct Tables {
    connections: HashMap<ConnId, ConnectionSession>,
    user_to_conn: HashMap<UserId, ConnId>,
}

/// Three maps maintained together, per the spec: `conn -> session`,
/// `connId -> conn` (trivial here: the session is keyed by its own connId),
/// and `userId -> connId` (populated only while a user is logged in).
pub struct SessionTable {
    tables: RwLock<Tables>,
}

impl SessionTable {
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(Tables::default()),
        }
    }

    /// Registers a freshly accepted, not-yet-authenticated connection.
    pub async fn register(&self, conn_id: ConnId, sender: mpsc::Sender<Arc<ServerMessage>>) {
        let mut tables = self.tables.write().await;
        tables
            .connections
            .insert(conn_id, ConnectionSession::new(conn_id, sender));
    }

    /// Binds a connection to a user, performing single-device takeover if
    /// another connection already holds this user's session. Returns the
    /// evicted connection id, if any, so the caller can notify and close it.
    pub async fn bind(&self, conn_id: ConnId, user_id: UserId) -> Option<ConnId> {
        let mut tables = self.tables.write().await;
        let evicted = tables.user_to_conn.insert(user_id, conn_id);
        if let Some(session) = tables.connections.get_mut(&conn_id) {
            session.user_id = Some(user_id);
        }
        let evicted = evicted.filter(|old| *old != conn_id);
        if let Some(old_conn) = evicted {
            info!(%user_id, old_connection = %old_conn, new_connection = %conn_id, "session takeover");
        }
        evicted
    }

    /// Clears the user binding (explicit logout). Leaves the connection
    /// itself registered.
    pub async fn unbind(&self, conn_id: ConnId) {
        let mut tables = self.tables.write().await;
        let user_id = tables.connections.get(&conn_id).and_then(|s| s.user_id);
        if let Some(user_id) = user_id {
            if tables.user_to_conn.get(&user_id) == Some(&conn_id) {
                tables.user_to_conn.remove(&user_id);
            }
        }
        if let Some(session) = tables.connections.get_mut(&conn_id) {
            session.user_id = None;
        }
    }

    /// Removes a connection entirely (close). Only clears the `userId ->
    /// connId` mapping if it still points at this connection — a stale close
    /// racing a takeover must not evict the newer session. Returns the
    /// session that was removed, if any, so callers can run cleanup (queue
    /// eviction, room teardown) against its final state.
    pub async fn remove(&self, conn_id: ConnId) -> Option<ConnectionSession> {
        let mut tables = self.tables.write().await;
        let removed = tables.connections.remove(&conn_id)?;
        if let Some(user_id) = removed.user_id {
            if tables.user_to_conn.get(&user_id) == Some(&conn_id) {
                tables.user_to_conn.remove(&user_id);
            }
        }
        Some(removed)
    }

    pub async fn is_live(&self, conn_id: ConnId) -> bool {
        self.tables.read().await.connections.contains_key(&conn_id)
    }

    pub async fn conn_for_user(&self, user_id: UserId) -> Option<ConnId> {
        self.tables.read().await.user_to_conn.get(&user_id).copied()
    }

    pub async fn user_of(&self, conn_id: ConnId) -> Option<UserId> {
        self.tables
            .read()
            .await
            .connections
            .get(&conn_id)
            .and_then(|s| s.user_id)
    }

    pub async fn snapshot(&self, conn_id: ConnId) -> Option<ConnectionSession> {
        self.tables.read().await.connections.get(&conn_id).cloned()
    }

    pub async fn set_opponent(&self, conn_id: ConnId, opponent: Option<ConnId>, match_id: Option<MatchId>) {
        let mut tables = self.tables.write().await;
        if let Some(session) = tables.connections.get_mut(&conn_id) {
            session.opponent_conn_id = opponent;
            session.match_id = match_id;
        }
    }

    pub async fn set_owned_room(&self, conn_id: ConnId, room_id: Option<RoomId>) {
        let mut tables = self.tables.write().await;
        if let Some(session) = tables.connections.get_mut(&conn_id) {
            session.owned_room = room_id;
        }
    }

    pub async fn set_cached_offer(&self, conn_id: ConnId, offer: Option<serde_json::Value>) {
        let mut tables = self.tables.write().await;
        if let Some(session) = tables.connections.get_mut(&conn_id) {
            session.cached_broadcaster_offer = offer;
        }
    }

    pub async fn add_spectating(&self, conn_id: ConnId, room_id: RoomId) {
        let mut tables = self.tables.write().await;
        if let Some(session) = tables.connections.get_mut(&conn_id) {
            session.spectating_rooms.push(room_id);
        }
    }

    pub async fn remove_spectating(&self, conn_id: ConnId, room_id: &str) {
        let mut tables = self.tables.write().await;
        if let Some(session) = tables.connections.get_mut(&conn_id) {
            session.spectating_rooms.retain(|r| r != room_id);
        }
    }

    pub async fn all_conn_ids(&self) -> Vec<ConnId> {
        self.tables.read().await.connections.keys().copied().collect()
    }

    /// Best-effort delivery; a full or closed channel is logged and dropped,
    /// never propagated as an error to the caller's own request handling.
    pub async fn send_to(&self, conn_id: ConnId, message: Arc<ServerMessage>) {
        let sender = {
            let tables = self.tables.read().await;
            tables.connections.get(&conn_id).map(|s| s.sender.clone())
        };
        if let Some(sender) = sender {
            if sender.try_send(message).is_err() {
                warn!(%conn_id, "dropped message: connection send queue full or closed");
            }
        }
    }

    pub async fn broadcast(&self, message: Arc<ServerMessage>) {
        let conn_ids = self.all_conn_ids().await;
        for conn_id in conn_ids {
            self.send_to(conn_id, message.clone()).await;
        }
    }
}

impl Default for SessionTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channel() -> (mpsc::Sender<Arc<ServerMessage>>, mpsc::Receiver<Arc<ServerMessage>>) {
        mpsc::channel(8)
    }

    #[tokio::test]
    async fn bind_takeover_evicts_previous_connection() {
        let table = SessionTable::new();
        let user_id = UserId::new_v4();
        let (tx1, _rx1) = channel();
        let (tx2, _rx2) = channel();
        let conn1 = ConnId::new_v4();
        let conn2 = ConnId::new_v4();
        table.register(conn1, tx1).await;
        table.register(conn2, tx2).await;

        assert_eq!(table.bind(conn1, user_id).await, None);
        let evicted = table.bind(conn2, user_id).await;
        assert_eq!(evicted, Some(conn1));
        assert_eq!(table.conn_for_user(user_id).await, Some(conn2));
    }

    #[tokio::test]
    async fn stale_close_does_not_evict_newer_session() {
        let table = SessionTable::new();
        let user_id = UserId::new_v4();
        let (tx1, _rx1) = channel();
        let (tx2, _rx2) = channel();
        let conn1 = ConnId::new_v4();
        let conn2 = ConnId::new_v4();
        table.register(conn1, tx1).await;
        table.register(conn2, tx2).await;
        table.bind(conn1, user_id).await;
        table.bind(conn2, user_id).await;

        // conn1's close races in after conn2 already took over.
        table.remove(conn1).await;
        assert_eq!(table.conn_for_user(user_id).await, Some(conn2));
    }

    #[tokio::test]
    async fn remove_clears_mapping_for_the_owning_connection() {
        let table = SessionTable::new();
        let user_id = UserId::new_v4();
        let (tx, _rx) = channel();
        let conn = ConnId::new_v4();
        table.register(conn, tx).await;
        table.bind(conn, user_id).await;
        table.remove(conn).await;
        assert_eq!(table.conn_for_user(user_id).await, None);
        assert!(!table.is_live(conn).await);
    }
}
