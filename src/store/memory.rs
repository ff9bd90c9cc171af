//! In-process [`Store`] implementation: two maps guarded by `tokio::sync::RwLock`,
//! the same shape the teacher uses for its in-memory coordinators. A real
//! deployment would swap this for a SQL-backed implementation of the same
//! trait without touching any caller.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::{Match, Store, StoreError, StoreResult, User, UserPatch};
use crate::protocol::{MatchId, PlayerSlot, ReportValue, UserId};

#[derive(Default)]
struct Tables {
    users: HashMap<UserId, User>,
    username_index: HashMap<String, UserId>,
    matches: HashMap<MatchId, Match>,
}

/// In-memory `Store`. Row-level atomicity comes from holding the single
/// write lock for the whole read-modify-write of one operation; no lock is
/// ever held across an `.await` other than the lock acquisition itself.
pub struct InMemoryStore {
    tables: RwLock<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(Tables::default()),
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn initialize(&self) -> StoreResult<()> {
        Ok(())
    }

    async fn fetch_user(&self, id: UserId) -> StoreResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables.users.get(&id).cloned())
    }

    async fn fetch_user_by_name(&self, username: &str) -> StoreResult<Option<User>> {
        let tables = self.tables.read().await;
        let normalized = username.to_lowercase();
        let Some(id) = tables.username_index.get(&normalized) else {
            return Ok(None);
        };
        Ok(tables.users.get(id).cloned())
    }

    async fn insert_user(&self, id: UserId, username: &str, verifier: &str) -> StoreResult<User> {
        let mut tables = self.tables.write().await;
        let normalized = username.to_lowercase();
        if tables.username_index.contains_key(&normalized) {
            return Err(StoreError::UniqueViolation(format!(
                "username '{username}' already registered"
            )));
        }
        let now = Utc::now();
        let user = User {
            id,
            username: username.to_string(),
            verifier: verifier.to_string(),
            rate: 1500,
            match_history: Default::default(),
            memos: serde_json::Value::Null,
            battle_records: serde_json::Value::Null,
            registered_decks: serde_json::Value::Null,
            current_match_id: None,
            created_at: now,
            last_login_at: now,
        };
        tables.username_index.insert(normalized, id);
        tables.users.insert(id, user.clone());
        Ok(user)
    }

    async fn patch_user(&self, id: UserId, patch: UserPatch) -> StoreResult<User> {
        let mut tables = self.tables.write().await;

        if let Some(ref new_name) = patch.username {
            let normalized = new_name.to_lowercase();
            let collides = tables
                .username_index
                .get(&normalized)
                .is_some_and(|existing| *existing != id);
            if collides {
                return Err(StoreError::UniqueViolation(format!(
                    "username '{new_name}' already registered"
                )));
            }
        }

        let old_name_normalized = {
            let user = tables.users.get(&id).ok_or(StoreError::NotFound)?;
            user.username.to_lowercase()
        };

        let user = tables.users.get_mut(&id).ok_or(StoreError::NotFound)?;
        if let Some(new_name) = patch.username {
            tables
                .username_index
                .remove(&old_name_normalized);
            let user = tables.users.get_mut(&id).ok_or(StoreError::NotFound)?;
            user.username = new_name.clone();
            tables.username_index.insert(new_name.to_lowercase(), id);
        }
        let user = tables.users.get_mut(&id).ok_or(StoreError::NotFound)?;
        if let Some(rate) = patch.rate {
            user.rate = rate;
        }
        if let Some(history) = patch.match_history {
            user.match_history = history;
        }
        if let Some(memos) = patch.memos {
            user.memos = memos;
        }
        if let Some(battle_records) = patch.battle_records {
            user.battle_records = battle_records;
        }
        if let Some(registered_decks) = patch.registered_decks {
            user.registered_decks = registered_decks;
        }
        if let Some(current_match_id) = patch.current_match_id {
            user.current_match_id = current_match_id;
        }
        Ok(user.clone())
    }

    async fn insert_match(&self, id: MatchId, player1: UserId, player2: UserId) -> StoreResult<Match> {
        let mut tables = self.tables.write().await;
        let m = Match {
            id,
            player1,
            player2,
            report1: None,
            report2: None,
            resolved_at: None,
            created_at: Utc::now(),
        };
        tables.matches.insert(id, m.clone());
        Ok(m)
    }

    async fn fetch_match(&self, id: MatchId) -> StoreResult<Option<Match>> {
        let tables = self.tables.read().await;
        Ok(tables.matches.get(&id).cloned())
    }

    async fn patch_match_report(
        &self,
        id: MatchId,
        slot: PlayerSlot,
        value: ReportValue,
    ) -> StoreResult<Match> {
        let mut tables = self.tables.write().await;
        let m = tables.matches.get_mut(&id).ok_or(StoreError::NotFound)?;
        match slot {
            PlayerSlot::One => m.report1 = Some(value),
            PlayerSlot::Two => m.report2 = Some(value),
        }
        Ok(m.clone())
    }

    async fn mark_match_resolved(&self, id: MatchId, at: DateTime<Utc>) -> StoreResult<Match> {
        let mut tables = self.tables.write().await;
        let m = tables.matches.get_mut(&id).ok_or(StoreError::NotFound)?;
        if m.resolved_at.is_none() {
            m.resolved_at = Some(at);
        }
        Ok(m.clone())
    }

    async fn top_by_rating(&self, limit: usize) -> StoreResult<Vec<User>> {
        let tables = self.tables.read().await;
        let mut users: Vec<User> = tables.users.values().cloned().collect();
        users.sort_by(|a, b| b.rate.cmp(&a.rate).then_with(|| a.username.cmp(&b.username)));
        users.truncate(limit);
        Ok(users)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn insert_and_fetch_user_round_trips() {
        let store = InMemoryStore::new();
        let id = UserId::new_v4();
        let inserted = store.insert_user(id, "Alice", "hash").await.unwrap();
        assert_eq!(inserted.rate, 1500);

        let fetched = store.fetch_user(id).await.unwrap().unwrap();
        assert_eq!(fetched.username, "Alice");

        let by_name = store.fetch_user_by_name("alice").await.unwrap().unwrap();
        assert_eq!(by_name.id, id);
    }

    #[tokio::test]
    async fn duplicate_username_rejected_case_insensitively() {
        let store = InMemoryStore::new();
        store
            .insert_user(UserId::new_v4(), "Alice", "hash")
            .await
            .unwrap();
        let result = store.insert_user(UserId::new_v4(), "ALICE", "hash2").await;
        assert!(matches!(result, Err(StoreError::UniqueViolation(_))));
    }

    #[tokio::test]
    async fn resolution_guard_is_idempotent() {
        let store = InMemoryStore::new();
        let match_id = MatchId::new_v4();
        store
            .insert_match(match_id, UserId::new_v4(), UserId::new_v4())
            .await
            .unwrap();
        let first = Utc::now();
        store.mark_match_resolved(match_id, first).await.unwrap();
        let second = store.mark_match_resolved(match_id, Utc::now()).await.unwrap();
        assert_eq!(second.resolved_at, Some(first));
    }

    #[tokio::test]
    async fn top_by_rating_sorts_descending() {
        let store = InMemoryStore::new();
        let a = UserId::new_v4();
        let b = UserId::new_v4();
        store.insert_user(a, "Low", "h").await.unwrap();
        store.insert_user(b, "High", "h").await.unwrap();
        store
            .patch_user(b, UserPatch { rate: Some(1700), ..Default::default() })
            .await
            .unwrap();
        let top = store.top_by_rating(10).await.unwrap();
        assert_eq!(top[0].username, "High");
    }
}
