//! Matchmaking Queue (component C): a strict FIFO list of waiting users.

use std::collections::VecDeque;

use tokio::sync::Mutex;

use crate::protocol::UserId;
use crate::session::SessionTable;

pub struct MatchQueue {
    order: Mutex<VecDeque<UserId>>,
}

impl MatchQueue {
    pub fn new() -> Self {
        Self {
            order: Mutex::new(VecDeque::new()),
        }
    }

    /// Adds a user to the back of the queue. No-op if already queued.
    pub async fn enqueue(&self, user_id: UserId) -> bool {
        let mut order = self.order.lock().await;
        if order.contains(&user_id) {
            return false;
        }
        order.push_back(user_id);
        true
    }

    async fn enqueue_at_head(&self, user_id: UserId) {
        let mut order = self.order.lock().await;
        if !order.contains(&user_id) {
            order.push_front(user_id);
        }
    }

    /// Removes a user from the queue, wherever it sits. Returns whether it
    /// was present.
    pub async fn leave(&self, user_id: UserId) -> bool {
        let mut order = self.order.lock().await;
        let before = order.len();
        order.retain(|id| *id != user_id);
        order.len() != before
    }

    pub async fn len(&self) -> usize {
        self.order.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// One pairing attempt: pop the head and the next entry, verify both are
    /// still bound to a live connection, and either return the pair or
    /// re-enqueue the still-live half at the head and stop. The earlier of
    /// the two (`first`) is the signaling initiator.
    pub async fn try_pair(&self, sessions: &SessionTable) -> Option<(UserId, UserId)> {
        let (first, second) = {
            let mut order = self.order.lock().await;
            if order.len() < 2 {
                return None;
            }
            #[allow(clippy::unwrap_used)]
            (order.pop_front().unwrap(), order.pop_front().unwrap())
        };

        let first_live = sessions.conn_for_user(first).await.is_some();
        let second_live = sessions.conn_for_user(second).await.is_some();

        match (first_live, second_live) {
            (true, true) => Some((first, second)),
            (true, false) => {
                self.enqueue_at_head(first).await;
                None
            }
            (false, true) => {
                self.enqueue_at_head(second).await;
                None
            }
            (false, false) => None,
        }
    }
}

impl Default for MatchQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    async fn bound_session(sessions: &SessionTable) -> UserId {
        let (tx, _rx) = mpsc::channel(8);
        let conn = uuid::Uuid::new_v4();
        let user = UserId::new_v4();
        sessions.register(conn, tx).await;
        sessions.bind(conn, user).await;
        user
    }

    #[tokio::test]
    async fn fifo_order_is_preserved() {
        let queue = MatchQueue::new();
        let a = UserId::new_v4();
        let b = UserId::new_v4();
        let c = UserId::new_v4();
        queue.enqueue(a).await;
        queue.enqueue(b).await;
        queue.enqueue(c).await;
        assert_eq!(queue.len().await, 3);
    }

    #[tokio::test]
    async fn enqueue_is_idempotent() {
        let queue = MatchQueue::new();
        let a = UserId::new_v4();
        assert!(queue.enqueue(a).await);
        assert!(!queue.enqueue(a).await);
        assert_eq!(queue.len().await, 1);
    }

    #[tokio::test]
    async fn pairs_two_live_users_in_fifo_order() {
        let sessions = SessionTable::new();
        let queue = MatchQueue::new();
        let a = bound_session(&sessions).await;
        let b = bound_session(&sessions).await;
        queue.enqueue(a).await;
        queue.enqueue(b).await;

        let pair = queue.try_pair(&sessions).await.unwrap();
        assert_eq!(pair, (a, b));
        assert_eq!(queue.len().await, 0);
    }

    #[tokio::test]
    async fn stale_entry_is_discarded_and_live_one_requeued() {
        let sessions = SessionTable::new();
        let queue = MatchQueue::new();
        let live = bound_session(&sessions).await;
        let stale = UserId::new_v4(); // never registered: not live

        queue.enqueue(stale).await;
        queue.enqueue(live).await;

        let result = queue.try_pair(&sessions).await;
        assert!(result.is_none());
        assert_eq!(queue.len().await, 1);

        // A second live partner now pairs successfully with the requeued user.
        let other = bound_session(&sessions).await;
        queue.enqueue(other).await;
        let pair = queue.try_pair(&sessions).await.unwrap();
        assert!(pair == (live, other) || pair == (other, live));
    }
}
