//! Broadcast-List Notifier (component G): holds no state of its own. Derives
//! the current room list from the spectate registry and the current queue
//! depth from the matchmaking queue, and pushes both to every open
//! connection whenever the handler layer calls in.

use std::sync::Arc;

use crate::protocol::ServerMessage;
use crate::queue::MatchQueue;
use crate::session::SessionTable;
use crate::spectate::SpectateRegistry;

pub struct BroadcastNotifier {
    sessions: Arc<SessionTable>,
    spectate: Arc<SpectateRegistry>,
    queue: Arc<MatchQueue>,
}

impl BroadcastNotifier {
    pub fn new(sessions: Arc<SessionTable>, spectate: Arc<SpectateRegistry>, queue: Arc<MatchQueue>) -> Self {
        Self { sessions, spectate, queue }
    }

    /// Call after any room is created or destroyed.
    pub async fn push_broadcast_list(&self) {
        let rooms = self.spectate.list().await;
        self.sessions.broadcast(Arc::new(ServerMessage::BroadcastListUpdate { rooms })).await;
    }

    /// Call after any enqueue, leave, or successful pairing.
    pub async fn push_queue_count(&self) {
        let count = self.queue.len().await;
        self.sessions.broadcast(Arc::new(ServerMessage::QueueCountUpdate { count })).await;
    }
}
