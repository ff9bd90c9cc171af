//! Match Coordinator (component D): match lifecycle, report reconciliation,
//! and the Elo rating update.

use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use tracing::info;

use crate::elo::winner_rate_change;
use crate::protocol::{MatchId, MatchOutcome, ReportStatus, ReportValue, ServerMessage, UserId};
use crate::session::SessionTable;
use crate::store::{Store, StoreError, UserPatch};

#[derive(Debug, Error)]
pub enum MatchError {
    #[error("match not found")]
    NotFound,
    #[error("match already resolved")]
    AlreadyResolved,
    #[error("user is not part of that match")]
    NotInMatch,
    #[error("duplicate report")]
    DuplicateReport,
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

pub struct MatchCoordinator {
    store: Arc<dyn Store>,
    sessions: Arc<SessionTable>,
    k_factor: i32,
    reference: i32,
    history_cap: usize,
}

impl MatchCoordinator {
    pub fn new(
        store: Arc<dyn Store>,
        sessions: Arc<SessionTable>,
        k_factor: i32,
        reference: i32,
        history_cap: usize,
    ) -> Self {
        Self {
            store,
            sessions,
            k_factor,
            reference,
            history_cap,
        }
    }

    /// Creates a match between two paired players, cross-links their
    /// sessions' opponent pointers, and notifies both connections. `first`
    /// is the earlier-enqueued player and becomes the signaling initiator.
    pub async fn create_match(&self, first: UserId, second: UserId) -> Result<MatchId, MatchError> {
        let match_id = MatchId::new_v4();
        self.store.insert_match(match_id, first, second).await?;

        self.store
            .patch_user(
                first,
                UserPatch {
                    current_match_id: Some(Some(match_id)),
                    ..Default::default()
                },
            )
            .await?;
        self.store
            .patch_user(
                second,
                UserPatch {
                    current_match_id: Some(Some(match_id)),
                    ..Default::default()
                },
            )
            .await?;

        let first_conn = self.sessions.conn_for_user(first).await;
        let second_conn = self.sessions.conn_for_user(second).await;
        if let (Some(fc), Some(sc)) = (first_conn, second_conn) {
            self.sessions.set_opponent(fc, Some(sc), Some(match_id)).await;
            self.sessions.set_opponent(sc, Some(fc), Some(match_id)).await;
        }

        let first_user = self.store.fetch_user(first).await?.ok_or(StoreError::NotFound)?;
        let second_user = self.store.fetch_user(second).await?.ok_or(StoreError::NotFound)?;

        if let Some(fc) = first_conn {
            self.sessions
                .send_to(
                    fc,
                    Arc::new(ServerMessage::MatchFound {
                        match_id,
                        opponent_user_id: second,
                        opponent_username: second_user.username.clone(),
                        is_initiator: true,
                    }),
                )
                .await;
        }
        if let Some(sc) = second_conn {
            self.sessions
                .send_to(
                    sc,
                    Arc::new(ServerMessage::MatchFound {
                        match_id,
                        opponent_user_id: first,
                        opponent_username: first_user.username.clone(),
                        is_initiator: false,
                    }),
                )
                .await;
        }

        info!(%match_id, %first, %second, "match created");
        Ok(match_id)
    }

    /// Records one side's report. Returns `Pending` if the opponent has not
    /// yet reported; otherwise resolves the match (rating update included)
    /// and pushes a `MatchResolved` event to both live connections before
    /// returning `Resolved`.
    pub async fn report_result(
        &self,
        reporter: UserId,
        match_id: MatchId,
        result: ReportValue,
    ) -> Result<ReportStatus, MatchError> {
        let current = self.store.fetch_match(match_id).await?.ok_or(MatchError::NotFound)?;
        if current.resolved_at.is_some() {
            return Err(MatchError::AlreadyResolved);
        }
        let slot = current.slot_of(reporter).ok_or(MatchError::NotInMatch)?;
        if current.report_of(slot).is_some() {
            return Err(MatchError::DuplicateReport);
        }

        let updated = self.store.patch_match_report(match_id, slot, result).await?;
        let (Some(report1), Some(report2)) = (updated.report1, updated.report2) else {
            return Ok(ReportStatus::Pending);
        };

        self.resolve(&updated.id, updated.player1, updated.player2, report1, report2)
            .await?;
        Ok(ReportStatus::Resolved)
    }

    async fn resolve(
        &self,
        match_id: &MatchId,
        player1: UserId,
        player2: UserId,
        report1: ReportValue,
        report2: ReportValue,
    ) -> Result<(), MatchError> {
        let outcome = classify(report1, report2);
        let timestamp = Utc::now();
        let stamp = timestamp.format("%Y-%m-%d %H:%M:%S UTC");

        let user1 = self.store.fetch_user(player1).await?.ok_or(StoreError::NotFound)?;
        let user2 = self.store.fetch_user(player2).await?.ok_or(StoreError::NotFound)?;

        let (entry1, entry2, rate1, rate2, change1, change2) = match outcome {
            MatchOutcome::Cancel => (
                format!("{stamp} 対戦中止"),
                format!("{stamp} 対戦中止"),
                user1.rate,
                user2.rate,
                None,
                None,
            ),
            MatchOutcome::Disputed => (
                format!("{stamp} 結果不一致"),
                format!("{stamp} 結果不一致"),
                user1.rate,
                user2.rate,
                None,
                None,
            ),
            MatchOutcome::Consistent => {
                let (winner_old, loser_old) = if report1 == ReportValue::Win {
                    (user1.rate, user2.rate)
                } else {
                    (user2.rate, user1.rate)
                };
                let change = winner_rate_change(winner_old, loser_old, self.k_factor, self.reference);
                let winner_new = winner_old + change;
                let loser_new = loser_old - change;

                if report1 == ReportValue::Win {
                    (
                        format!("{stamp} 勝利 ({}→{})", user1.rate, winner_new),
                        format!("{stamp} 敗北 ({}→{})", user2.rate, loser_new),
                        winner_new,
                        loser_new,
                        Some(change),
                        Some(-change),
                    )
                } else {
                    (
                        format!("{stamp} 敗北 ({}→{})", user1.rate, loser_new),
                        format!("{stamp} 勝利 ({}→{})", user2.rate, winner_new),
                        loser_new,
                        winner_new,
                        Some(-change),
                        Some(change),
                    )
                }
            }
        };

        let history1 = prepend_capped(&user1.match_history, entry1.clone(), self.history_cap);
        let history2 = prepend_capped(&user2.match_history, entry2.clone(), self.history_cap);

        self.store
            .patch_user(
                player1,
                UserPatch {
                    rate: Some(rate1),
                    match_history: Some(history1.clone()),
                    current_match_id: Some(None),
                    ..Default::default()
                },
            )
            .await?;
        self.store
            .patch_user(
                player2,
                UserPatch {
                    rate: Some(rate2),
                    match_history: Some(history2.clone()),
                    current_match_id: Some(None),
                    ..Default::default()
                },
            )
            .await?;
        self.store.mark_match_resolved(*match_id, timestamp).await?;

        for (user_id, rate, change, history) in [
            (player1, rate1, change1, history1),
            (player2, rate2, change2, history2),
        ] {
            if let Some(conn_id) = self.sessions.conn_for_user(user_id).await {
                self.sessions.set_opponent(conn_id, None, None).await;
                self.sessions
                    .send_to(
                        conn_id,
                        Arc::new(ServerMessage::MatchResolved {
                            match_id: *match_id,
                            outcome,
                            rate: Some(rate),
                            rate_change: change,
                            history: history.into_iter().collect(),
                        }),
                    )
                    .await;
            }
        }

        info!(%match_id, ?outcome, "match resolved");
        Ok(())
    }
}

pub(crate) fn classify(report1: ReportValue, report2: ReportValue) -> MatchOutcome {
    use ReportValue::{Cancel, Lose, Win};
    match (report1, report2) {
        (Cancel, Cancel) => MatchOutcome::Cancel,
        (Win, Lose) | (Lose, Win) => MatchOutcome::Consistent,
        _ => MatchOutcome::Disputed,
    }
}

fn prepend_capped(
    existing: &std::collections::VecDeque<String>,
    entry: String,
    cap: usize,
) -> std::collections::VecDeque<String> {
    let mut history = existing.clone();
    history.push_front(entry);
    while history.len() > cap {
        history.pop_back();
    }
    history
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryStore;

    async fn setup() -> (MatchCoordinator, Arc<dyn Store>, Arc<SessionTable>, UserId, UserId) {
        let store: Arc<dyn Store> = Arc::new(InMemoryStore::new());
        let sessions = Arc::new(SessionTable::new());
        let p1 = UserId::new_v4();
        let p2 = UserId::new_v4();
        store.insert_user(p1, "alice", "h").await.unwrap();
        store.insert_user(p2, "bob", "h").await.unwrap();
        let coordinator = MatchCoordinator::new(store.clone(), sessions.clone(), 32, 400, 10);
        (coordinator, store, sessions, p1, p2)
    }

    #[tokio::test]
    async fn first_report_is_pending() {
        let (coordinator, store, _sessions, p1, p2) = setup().await;
        let match_id = coordinator.create_match(p1, p2).await.unwrap();
        let status = coordinator
            .report_result(p1, match_id, ReportValue::Win)
            .await
            .unwrap();
        assert_eq!(status, ReportStatus::Pending);
        let m = store.fetch_match(match_id).await.unwrap().unwrap();
        assert!(m.resolved_at.is_none());
    }

    #[tokio::test]
    async fn consistent_reports_apply_zero_sum_elo() {
        let (coordinator, store, _sessions, p1, p2) = setup().await;
        let match_id = coordinator.create_match(p1, p2).await.unwrap();
        coordinator.report_result(p1, match_id, ReportValue::Win).await.unwrap();
        let status = coordinator
            .report_result(p2, match_id, ReportValue::Lose)
            .await
            .unwrap();
        assert_eq!(status, ReportStatus::Resolved);

        let winner = store.fetch_user(p1).await.unwrap().unwrap();
        let loser = store.fetch_user(p2).await.unwrap().unwrap();
        assert_eq!(winner.rate, 1516);
        assert_eq!(loser.rate, 1484);
        assert_eq!(winner.rate - 1500, -(loser.rate - 1500));
        assert!(winner.match_history[0].contains('勝'));
        assert!(loser.match_history[0].contains('敗'));
        assert!(winner.current_match_id.is_none());
    }

    #[tokio::test]
    async fn mutual_cancel_leaves_rates_unchanged() {
        let (coordinator, store, _sessions, p1, p2) = setup().await;
        let match_id = coordinator.create_match(p1, p2).await.unwrap();
        coordinator.report_result(p1, match_id, ReportValue::Cancel).await.unwrap();
        coordinator.report_result(p2, match_id, ReportValue::Cancel).await.unwrap();
        let u1 = store.fetch_user(p1).await.unwrap().unwrap();
        assert_eq!(u1.rate, 1500);
        assert!(u1.match_history[0].contains("対戦中止"));
    }

    #[tokio::test]
    async fn disputed_reports_leave_rates_unchanged() {
        let (coordinator, store, _sessions, p1, p2) = setup().await;
        let match_id = coordinator.create_match(p1, p2).await.unwrap();
        coordinator.report_result(p1, match_id, ReportValue::Win).await.unwrap();
        coordinator.report_result(p2, match_id, ReportValue::Win).await.unwrap();
        let u1 = store.fetch_user(p1).await.unwrap().unwrap();
        assert_eq!(u1.rate, 1500);
        assert!(u1.match_history[0].contains("結果不一致"));
    }

    #[tokio::test]
    async fn duplicate_report_is_rejected() {
        let (coordinator, _store, _sessions, p1, p2) = setup().await;
        let match_id = coordinator.create_match(p1, p2).await.unwrap();
        coordinator.report_result(p1, match_id, ReportValue::Win).await.unwrap();
        let result = coordinator.report_result(p1, match_id, ReportValue::Win).await;
        assert!(matches!(result, Err(MatchError::DuplicateReport)));
    }

    #[tokio::test]
    async fn resolved_match_rejects_further_reports() {
        let (coordinator, _store, _sessions, p1, p2) = setup().await;
        let match_id = coordinator.create_match(p1, p2).await.unwrap();
        coordinator.report_result(p1, match_id, ReportValue::Win).await.unwrap();
        coordinator.report_result(p2, match_id, ReportValue::Lose).await.unwrap();
        let result = coordinator.report_result(p1, match_id, ReportValue::Win).await;
        assert!(matches!(result, Err(MatchError::AlreadyResolved)));
    }
}
