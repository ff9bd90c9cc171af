//! Spectate Room Registry (component F): one broadcaster, many spectators,
//! with a cached offer so latecomers can be bootstrapped without waiting for
//! a fresh renegotiation.

use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::RwLock;

use crate::protocol::{BroadcastListEntry, ConnId, RoomId, ServerMessage};
use crate::session::SessionTable;

#[derive(Debug, Error)]
pub enum SpectateError {
    #[error("you already own an active spectate room")]
    AlreadyBroadcasting,
    #[error("no such spectate room exists")]
    RoomNotFound,
    #[error("only the broadcaster may perform that action")]
    NotRoomOwner,
    #[error("you are not a spectator of that room")]
    NotASpectator,
}

struct Room {
    owner_conn: ConnId,
    owner_username: String,
    spectators: Vec<ConnId>,
}

pub struct SpectateRegistry {
    sessions: Arc<SessionTable>,
    rooms: RwLock<HashMap<RoomId, Room>>,
}

impl SpectateRegistry {
    pub fn new(sessions: Arc<SessionTable>) -> Self {
        Self {
            sessions,
            rooms: RwLock::new(HashMap::new()),
        }
    }

    pub async fn start_broadcast(&self, owner_conn: ConnId, owner_username: String) -> Result<RoomId, SpectateError> {
        let mut rooms = self.rooms.write().await;
        if rooms.values().any(|r| r.owner_conn == owner_conn) {
            return Err(SpectateError::AlreadyBroadcasting);
        }
        let mut token = generate_token();
        while rooms.contains_key(&token) {
            token = generate_token();
        }
        rooms.insert(
            token.clone(),
            Room {
                owner_conn,
                owner_username,
                spectators: Vec::new(),
            },
        );
        drop(rooms);
        self.sessions.set_owned_room(owner_conn, Some(token.clone())).await;
        Ok(token)
    }

    pub async fn stop_broadcast(&self, token: &str, requester_conn: ConnId) -> Result<(), SpectateError> {
        let room = {
            let mut rooms = self.rooms.write().await;
            match rooms.get(token) {
                None => return Err(SpectateError::RoomNotFound),
                Some(room) if room.owner_conn != requester_conn => return Err(SpectateError::NotRoomOwner),
                _ => {}
            }
            rooms.remove(token).expect("presence just checked above")
        };
        self.sessions.set_owned_room(requester_conn, None).await;
        self.sessions.set_cached_offer(requester_conn, None).await;
        for spectator in &room.spectators {
            self.sessions.remove_spectating(*spectator, token).await;
            self.sessions
                .send_to(
                    *spectator,
                    Arc::new(ServerMessage::BroadcastStopped {
                        room_id: token.to_string(),
                    }),
                )
                .await;
        }
        Ok(())
    }

    /// Adds the spectator and returns the broadcaster's username for the
    /// caller's reply. Bootstraps a cached offer if one exists.
    pub async fn join(&self, token: &str, spectator_conn: ConnId) -> Result<String, SpectateError> {
        let (owner_conn, owner_username) = {
            let mut rooms = self.rooms.write().await;
            let room = rooms.get_mut(token).ok_or(SpectateError::RoomNotFound)?;
            if !room.spectators.contains(&spectator_conn) {
                room.spectators.push(spectator_conn);
            }
            (room.owner_conn, room.owner_username.clone())
        };
        self.sessions.add_spectating(spectator_conn, token.to_string()).await;
        self.sessions
            .send_to(
                owner_conn,
                Arc::new(ServerMessage::NewSpectator {
                    room_id: token.to_string(),
                    spectator_id: spectator_conn,
                }),
            )
            .await;

        if let Some(owner_session) = self.sessions.snapshot(owner_conn).await {
            if let Some(offer) = owner_session.cached_broadcaster_offer {
                self.sessions
                    .send_to(
                        spectator_conn,
                        Arc::new(ServerMessage::SpectateSignal {
                            room_id: token.to_string(),
                            signal: offer,
                        }),
                    )
                    .await;
            }
        }
        Ok(owner_username)
    }

    pub async fn leave(&self, token: &str, spectator_conn: ConnId) -> Result<(), SpectateError> {
        let owner_conn = {
            let mut rooms = self.rooms.write().await;
            let room = rooms.get_mut(token).ok_or(SpectateError::RoomNotFound)?;
            let before = room.spectators.len();
            room.spectators.retain(|c| *c != spectator_conn);
            if room.spectators.len() == before {
                return Err(SpectateError::NotASpectator);
            }
            room.owner_conn
        };
        self.sessions.remove_spectating(spectator_conn, token).await;
        self.sessions
            .send_to(
                owner_conn,
                Arc::new(ServerMessage::SpectatorLeft {
                    room_id: token.to_string(),
                    spectator_id: spectator_conn,
                }),
            )
            .await;
        Ok(())
    }

    pub async fn is_owner(&self, token: &str, conn: ConnId) -> bool {
        self.rooms.read().await.get(token).is_some_and(|r| r.owner_conn == conn)
    }

    pub async fn is_spectator(&self, token: &str, conn: ConnId) -> bool {
        self.rooms
            .read()
            .await
            .get(token)
            .is_some_and(|r| r.spectators.contains(&conn))
    }

    pub async fn owner_conn(&self, token: &str) -> Option<ConnId> {
        self.rooms.read().await.get(token).map(|r| r.owner_conn)
    }

    pub async fn spectator_conns(&self, token: &str) -> Vec<ConnId> {
        self.rooms
            .read()
            .await
            .get(token)
            .map(|r| r.spectators.clone())
            .unwrap_or_default()
    }

    pub async fn list(&self) -> Vec<BroadcastListEntry> {
        self.rooms
            .read()
            .await
            .iter()
            .map(|(token, room)| BroadcastListEntry {
                room_id: token.clone(),
                broadcaster_username: room.owner_username.clone(),
            })
            .collect()
    }

    /// Tears down a room owned by `conn_id` and prunes it from any rooms it
    /// was spectating. Returns whether the room list changed, so the caller
    /// can decide whether to push a broadcast-list update.
    pub async fn handle_disconnect(&self, conn_id: ConnId) -> bool {
        let mut room_list_changed = false;

        let owned_token = {
            let rooms = self.rooms.read().await;
            rooms.iter().find(|(_, r)| r.owner_conn == conn_id).map(|(t, _)| t.clone())
        };
        if let Some(token) = owned_token {
            let room = self.rooms.write().await.remove(&token);
            if let Some(room) = room {
                for spectator in &room.spectators {
                    self.sessions.remove_spectating(*spectator, &token).await;
                    self.sessions
                        .send_to(
                            *spectator,
                            Arc::new(ServerMessage::BroadcastStopped { room_id: token.clone() }),
                        )
                        .await;
                }
                room_list_changed = true;
            }
        }

        let spectating_tokens: Vec<RoomId> = {
            let rooms = self.rooms.read().await;
            rooms
                .iter()
                .filter(|(_, r)| r.spectators.contains(&conn_id))
                .map(|(t, _)| t.clone())
                .collect()
        };
        for token in spectating_tokens {
            let owner_conn = {
                let mut rooms = self.rooms.write().await;
                rooms.get_mut(&token).map(|room| {
                    room.spectators.retain(|c| *c != conn_id);
                    room.owner_conn
                })
            };
            if let Some(owner_conn) = owner_conn {
                self.sessions
                    .send_to(
                        owner_conn,
                        Arc::new(ServerMessage::SpectatorLeft {
                            room_id: token,
                            spectator_id: conn_id,
                        }),
                    )
                    .await;
            }
        }

        room_list_changed
    }
}

fn generate_token() -> RoomId {
    format!("{:08x}", rand::random::<u32>())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    async fn connected(sessions: &SessionTable) -> ConnId {
        let (tx, _rx) = mpsc::channel(8);
        let conn = ConnId::new_v4();
        sessions.register(conn, tx).await;
        conn
    }

    #[tokio::test]
    async fn start_broadcast_rejects_a_second_room_from_the_same_owner() {
        let sessions = Arc::new(SessionTable::new());
        let registry = SpectateRegistry::new(sessions.clone());
        let owner = connected(&sessions).await;
        registry.start_broadcast(owner, "alice".into()).await.unwrap();
        let second = registry.start_broadcast(owner, "alice".into()).await;
        assert!(matches!(second, Err(SpectateError::AlreadyBroadcasting)));
    }

    #[tokio::test]
    async fn join_bootstraps_cached_offer() {
        let sessions = Arc::new(SessionTable::new());
        let registry = SpectateRegistry::new(sessions.clone());
        let owner = connected(&sessions).await;
        let spectator = connected(&sessions).await;
        let token = registry.start_broadcast(owner, "alice".into()).await.unwrap();
        sessions
            .set_cached_offer(owner, Some(serde_json::json!({"sdp": "offer"})))
            .await;

        registry.join(&token, spectator).await.unwrap();
        assert!(registry.is_spectator(&token, spectator).await);
    }

    #[tokio::test]
    async fn stop_broadcast_requires_ownership() {
        let sessions = Arc::new(SessionTable::new());
        let registry = SpectateRegistry::new(sessions.clone());
        let owner = connected(&sessions).await;
        let other = connected(&sessions).await;
        let token = registry.start_broadcast(owner, "alice".into()).await.unwrap();
        let result = registry.stop_broadcast(&token, other).await;
        assert!(matches!(result, Err(SpectateError::NotRoomOwner)));
    }

    #[tokio::test]
    async fn owner_disconnect_prunes_room_and_notifies_spectators() {
        let sessions = Arc::new(SessionTable::new());
        let registry = SpectateRegistry::new(sessions.clone());
        let owner = connected(&sessions).await;
        let spectator = connected(&sessions).await;
        let token = registry.start_broadcast(owner, "alice".into()).await.unwrap();
        registry.join(&token, spectator).await.unwrap();

        let changed = registry.handle_disconnect(owner).await;
        assert!(changed);
        assert!(registry.owner_conn(&token).await.is_none());
    }
}
