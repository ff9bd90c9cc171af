//! Store Gateway: typed operations on users and matches.
//!
//! The trait is defined generically so a real deployment could substitute a
//! SQL-backed implementation without touching any caller; this crate ships
//! only [`memory::InMemoryStore`].

pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::VecDeque;
use thiserror::Error;
use uuid::Uuid;

use crate::protocol::{MatchId, PlayerSlot, ReportValue, UserId};

pub use memory::InMemoryStore;

/// A registered user row.
#[derive(Debug, Clone)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub verifier: String,
    pub rate: i32,
    pub match_history: VecDeque<String>,
    pub memos: Value,
    pub battle_records: Value,
    pub registered_decks: Value,
    pub current_match_id: Option<MatchId>,
    pub created_at: DateTime<Utc>,
    pub last_login_at: DateTime<Utc>,
}

/// A match row. `resolved_at` is the idempotency guard: resolution logic
/// must never write twice to a row that already has it set.
#[derive(Debug, Clone)]
pub struct Match {
    pub id: MatchId,
    pub player1: UserId,
    pub player2: UserId,
    pub report1: Option<ReportValue>,
    pub report2: Option<ReportValue>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Match {
    pub fn slot_of(&self, user_id: UserId) -> Option<PlayerSlot> {
        if self.player1 == user_id {
            Some(PlayerSlot::One)
        } else if self.player2 == user_id {
            Some(PlayerSlot::Two)
        } else {
            None
        }
    }

    pub fn opponent_of(&self, user_id: UserId) -> Option<UserId> {
        match self.slot_of(user_id)? {
            PlayerSlot::One => Some(self.player2),
            PlayerSlot::Two => Some(self.player1),
        }
    }

    pub fn report_of(&self, slot: PlayerSlot) -> Option<ReportValue> {
        match slot {
            PlayerSlot::One => self.report1,
            PlayerSlot::Two => self.report2,
        }
    }
}

/// A partial update to a user row; `None` fields are left untouched. Nested
/// `Option<Option<_>>` fields (only `current_match_id` needs this) let a
/// caller distinguish "don't touch" from "set to null".
#[derive(Debug, Default, Clone)]
pub struct UserPatch {
    pub username: Option<String>,
    pub rate: Option<i32>,
    pub match_history: Option<VecDeque<String>>,
    pub memos: Option<Value>,
    pub battle_records: Option<Value>,
    pub registered_decks: Option<Value>,
    pub current_match_id: Option<Option<MatchId>>,
}

/// Store-level failures, mapped to the wire `ErrorCode` categories at the
/// router boundary.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not found")]
    NotFound,
    #[error("unique constraint violated: {0}")]
    UniqueViolation(String),
    #[error("transient store failure: {0}")]
    Transient(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait Store: Send + Sync {
    /// Idempotent bootstrap; a no-op for the in-process implementation, but
    /// kept so a SQL-backed implementation has somewhere to run migrations.
    async fn initialize(&self) -> StoreResult<()>;

    async fn fetch_user(&self, id: UserId) -> StoreResult<Option<User>>;
    async fn fetch_user_by_name(&self, username: &str) -> StoreResult<Option<User>>;
    async fn insert_user(&self, id: UserId, username: &str, verifier: &str) -> StoreResult<User>;
    async fn patch_user(&self, id: UserId, patch: UserPatch) -> StoreResult<User>;

    async fn insert_match(&self, id: MatchId, player1: UserId, player2: UserId) -> StoreResult<Match>;
    async fn fetch_match(&self, id: MatchId) -> StoreResult<Option<Match>>;
    async fn patch_match_report(
        &self,
        id: MatchId,
        slot: PlayerSlot,
        value: ReportValue,
    ) -> StoreResult<Match>;
    async fn mark_match_resolved(&self, id: MatchId, at: DateTime<Utc>) -> StoreResult<Match>;

    async fn top_by_rating(&self, limit: usize) -> StoreResult<Vec<User>>;
}

/// Deterministic UUID derived from a username, used only by tests that want
/// stable fixture ids without threading a random generator through.
#[allow(dead_code)]
pub fn deterministic_uuid(seed: &str) -> Uuid {
    Uuid::new_v5(&Uuid::NAMESPACE_OID, seed.as_bytes())
}
