//! Signaling Relay (component E): opaque forwarding of WebRTC offer/answer/
//! ICE payloads. The hub never parses the payload body — it only decides who
//! is allowed to receive it.

use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;

use crate::protocol::{ConnId, ServerMessage};
use crate::session::SessionTable;
use crate::spectate::SpectateRegistry;

#[derive(Debug, Error)]
pub enum SignalError {
    #[error("you are not currently paired with an opponent")]
    NoOpponent,
    #[error("this request requires an authenticated session")]
    NotAuthenticated,
    #[error("no such spectate room exists")]
    RoomNotFound,
    #[error("only the broadcaster may perform that action")]
    NotRoomOwner,
    #[error("you are not a spectator of that room")]
    NotASpectator,
}

pub struct Signaling {
    sessions: Arc<SessionTable>,
    spectate: Arc<SpectateRegistry>,
}

impl Signaling {
    pub fn new(sessions: Arc<SessionTable>, spectate: Arc<SpectateRegistry>) -> Self {
        Self { sessions, spectate }
    }

    /// Forwards a 1v1 signal from `from_conn` to its bound opponent.
    pub async fn relay_to_opponent(&self, from_conn: ConnId, signal: Value) -> Result<(), SignalError> {
        let session = self.sessions.snapshot(from_conn).await.ok_or(SignalError::NoOpponent)?;
        let opponent_conn = session.opponent_conn_id.ok_or(SignalError::NoOpponent)?;
        let from_user = session.user_id.ok_or(SignalError::NotAuthenticated)?;
        self.sessions
            .send_to(opponent_conn, Arc::new(ServerMessage::WebrtcSignal { from: from_user, signal }))
            .await;
        Ok(())
    }

    /// The broadcaster pushes an offer/renegotiation to every current
    /// spectator of its own room; the payload is cached so late joiners can
    /// be bootstrapped without waiting for the next push.
    pub async fn broadcast_spectate_signal(
        &self,
        room_id: &str,
        from_conn: ConnId,
        signal: Value,
    ) -> Result<(), SignalError> {
        if !self.spectate.is_owner(room_id, from_conn).await {
            return Err(SignalError::NotRoomOwner);
        }
        self.sessions.set_cached_offer(from_conn, Some(signal.clone())).await;
        for spectator in self.spectate.spectator_conns(room_id).await {
            self.sessions
                .send_to(
                    spectator,
                    Arc::new(ServerMessage::SpectateSignal {
                        room_id: room_id.to_string(),
                        signal: signal.clone(),
                    }),
                )
                .await;
        }
        Ok(())
    }

    /// Directed signal from the broadcaster to one specific current
    /// spectator.
    pub async fn relay_to_spectator(
        &self,
        room_id: &str,
        from_conn: ConnId,
        spectator_conn: ConnId,
        signal: Value,
    ) -> Result<(), SignalError> {
        if !self.spectate.is_owner(room_id, from_conn).await {
            return Err(SignalError::NotRoomOwner);
        }
        if !self.spectate.is_spectator(room_id, spectator_conn).await {
            return Err(SignalError::NotASpectator);
        }
        let from_user = self.sessions.user_of(from_conn).await.ok_or(SignalError::NotAuthenticated)?;
        self.sessions
            .send_to(
                spectator_conn,
                Arc::new(ServerMessage::WebrtcSignalToSpectator {
                    room_id: room_id.to_string(),
                    from: from_user,
                    signal,
                }),
            )
            .await;
        Ok(())
    }

    /// Directed signal from a current spectator to the room's broadcaster.
    pub async fn relay_to_broadcaster(&self, room_id: &str, from_conn: ConnId, signal: Value) -> Result<(), SignalError> {
        if !self.spectate.is_spectator(room_id, from_conn).await {
            return Err(SignalError::NotASpectator);
        }
        let owner_conn = self.spectate.owner_conn(room_id).await.ok_or(SignalError::RoomNotFound)?;
        self.sessions
            .send_to(
                owner_conn,
                Arc::new(ServerMessage::WebrtcSignalToBroadcaster {
                    room_id: room_id.to_string(),
                    spectator_id: from_conn,
                    signal,
                }),
            )
            .await;
        Ok(())
    }
}
