use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error_codes::ErrorCode;
use super::types::{MatchId, MatchOutcome, ReportValue, RoomId, UserId};

/// Frames sent from client to server. Every variant corresponds to one of the
/// recognized request types in the external-interface table; the wire field
/// is a flat `{"type": "...", ...}` object, not a nested envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    Register {
        username: String,
        password: String,
    },
    Login {
        username: String,
        password: String,
    },
    AutoLogin {
        user_id: UserId,
        username: String,
    },
    Logout,
    ChangeUsername {
        new_username: String,
    },
    UpdateUserData {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        rate: Option<i32>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        match_history: Option<Vec<String>>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        memos: Option<serde_json::Value>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        battle_records: Option<serde_json::Value>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        registered_decks: Option<serde_json::Value>,
        /// `None` leaves the field untouched; `Some(None)` clears it;
        /// `Some(Some(id))` sets it. The outer layer is only reachable when
        /// the key is present in the request, including as an explicit
        /// `null` — see `deserialize_present_but_maybe_null` below.
        #[serde(
            default,
            skip_serializing_if = "Option::is_none",
            deserialize_with = "deserialize_present_but_maybe_null"
        )]
        current_match_id: Option<Option<MatchId>>,
    },
    JoinQueue,
    LeaveQueue,
    WebrtcSignal {
        signal: serde_json::Value,
    },
    ReportResult {
        match_id: MatchId,
        result: ReportValue,
    },
    ClearMatchInfo,
    GetRanking {
        #[serde(default)]
        limit: Option<usize>,
    },
    StartBroadcast,
    StopBroadcast {
        room_id: RoomId,
    },
    JoinSpectateRoom {
        room_id: RoomId,
    },
    LeaveSpectateRoom {
        room_id: RoomId,
    },
    SpectateSignal {
        room_id: RoomId,
        signal: serde_json::Value,
    },
    WebrtcSignalToSpectator {
        room_id: RoomId,
        spectator_id: Uuid,
        signal: serde_json::Value,
    },
    WebrtcSignalToBroadcaster {
        room_id: RoomId,
        signal: serde_json::Value,
    },
    GetBroadcastList,
}

/// Frames sent from server to client: replies to requests and unsolicited
/// events alike. Reply variants carry `success`/`message`/`error_code`;
/// event variants (`MatchFound`, `BroadcastListUpdate`, …) do not.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    RegisterResponse {
        success: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        message: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        error_code: Option<ErrorCode>,
        #[serde(skip_serializing_if = "Option::is_none")]
        user_id: Option<UserId>,
    },
    LoginResponse {
        success: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        message: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        error_code: Option<ErrorCode>,
        #[serde(skip_serializing_if = "Option::is_none")]
        profile: Option<LoginProfile>,
    },
    AutoLoginResponse {
        success: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        message: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        error_code: Option<ErrorCode>,
        #[serde(skip_serializing_if = "Option::is_none")]
        profile: Option<LoginProfile>,
    },
    LogoutResponse {
        success: bool,
    },
    ChangeUsernameResponse {
        success: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        message: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        error_code: Option<ErrorCode>,
    },
    UpdateUserDataResponse {
        success: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        message: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        error_code: Option<ErrorCode>,
    },
    JoinQueueResponse {
        success: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        message: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        error_code: Option<ErrorCode>,
    },
    LeaveQueueResponse {
        success: bool,
    },
    MatchFound {
        match_id: MatchId,
        opponent_user_id: UserId,
        opponent_username: String,
        is_initiator: bool,
    },
    WebrtcSignal {
        from: UserId,
        signal: serde_json::Value,
    },
    ReportResultResponse {
        success: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        message: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        error_code: Option<ErrorCode>,
        #[serde(skip_serializing_if = "Option::is_none")]
        status: Option<ReportStatus>,
    },
    MatchResolved {
        match_id: MatchId,
        outcome: MatchOutcome,
        #[serde(skip_serializing_if = "Option::is_none")]
        rate: Option<i32>,
        #[serde(skip_serializing_if = "Option::is_none")]
        rate_change: Option<i32>,
        history: Vec<String>,
    },
    ClearMatchInfoResponse {
        success: bool,
    },
    RankingResponse {
        entries: Vec<super::types::RankingEntry>,
    },
    StartBroadcastResponse {
        success: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        message: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        error_code: Option<ErrorCode>,
        #[serde(skip_serializing_if = "Option::is_none")]
        room_id: Option<RoomId>,
    },
    StopBroadcastResponse {
        success: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        message: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        error_code: Option<ErrorCode>,
    },
    JoinSpectateRoomResponse {
        success: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        message: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        error_code: Option<ErrorCode>,
        #[serde(skip_serializing_if = "Option::is_none")]
        broadcaster_username: Option<String>,
    },
    LeaveSpectateRoomResponse {
        success: bool,
    },
    SpectateSignal {
        room_id: RoomId,
        signal: serde_json::Value,
    },
    WebrtcSignalToSpectator {
        room_id: RoomId,
        from: UserId,
        signal: serde_json::Value,
    },
    WebrtcSignalToBroadcaster {
        room_id: RoomId,
        spectator_id: Uuid,
        signal: serde_json::Value,
    },
    BroadcastListUpdate {
        rooms: Vec<super::types::BroadcastListEntry>,
    },
    QueueCountUpdate {
        count: usize,
    },
    NewSpectator {
        room_id: RoomId,
        spectator_id: Uuid,
    },
    SpectatorLeft {
        room_id: RoomId,
        spectator_id: Uuid,
    },
    BroadcastStopped {
        room_id: RoomId,
    },
    LogoutForced {
        reason: String,
    },
    Error {
        message: String,
        error_code: ErrorCode,
    },
}

/// Lifts a present key into `Some`, whether its value is `null` or not,
/// so a patch field can tell "key absent" (left untouched, via `#[serde(default)]`
/// producing `None`) apart from "key present and explicitly `null`" (`Some(None)`).
fn deserialize_present_but_maybe_null<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::deserialize(deserializer).map(Some)
}

/// Reply status for `report_result`: either the first report was recorded
/// and resolution is awaiting the opponent, or resolution already happened
/// inline (carried separately via `MatchResolved`).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    Pending,
    Resolved,
}

/// Profile data returned on a successful `login`/`auto_login`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginProfile {
    pub user_id: UserId,
    pub username: String,
    pub rate: i32,
    pub match_history: Vec<String>,
    pub memos: serde_json::Value,
    pub battle_records: serde_json::Value,
    pub registered_decks: serde_json::Value,
}
