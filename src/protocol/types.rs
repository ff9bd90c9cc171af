//! Core identifiers and small value types shared across the hub.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A registered user's stable identifier.
pub type UserId = Uuid;

/// A match's stable identifier.
pub type MatchId = Uuid;

/// A live connection's identifier, assigned at accept time and never reused.
pub type ConnId = Uuid;

/// A spectate room's identifier: a short opaque token, not a UUID, so it is
/// comfortable to read aloud or paste into a viewer URL.
pub type RoomId = String;

/// Self-reported outcome of a match from one player's perspective.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReportValue {
    Win,
    Lose,
    Cancel,
}

/// The final, decided outcome of a resolved match.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MatchOutcome {
    /// Exactly one `win` and one `lose` report: Elo applied.
    Consistent,
    /// Both sides reported `cancel`: rates unchanged.
    Cancel,
    /// Any other combination: rates unchanged, flagged for review.
    Disputed,
}

/// Which of the two fixed slots in a `Match` row a report belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerSlot {
    One,
    Two,
}

/// Minimal public profile information sent to an opponent or spectator —
/// never the verifier, never the private blobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicProfile {
    pub user_id: UserId,
    pub username: String,
    pub rate: i32,
}

/// One entry of the leaderboard returned by `get_ranking`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankingEntry {
    pub username: String,
    pub rate: i32,
}

/// One entry of the broadcast-list pushed to every connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BroadcastListEntry {
    pub room_id: RoomId,
    pub broadcaster_username: String,
}
