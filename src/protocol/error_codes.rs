use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable wire-level error codes. Every client-facing failure carries exactly
/// one of these; internal error strings (store backend detail, panics caught
/// at the task boundary, …) never reach the client directly.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Validation (2xxx)
    InvalidUsername,
    InvalidPassword,
    InvalidResult,
    MessageTooLarge,
    InvalidInput,

    // Auth (1xxx)
    NotAuthenticated,
    InvalidCredentials,
    AuthTimeout,

    // Conflict (3xxx)
    UsernameTaken,
    AlreadyInQueue,
    DuplicateReport,
    AlreadyBroadcasting,

    // Not found (4xxx)
    UserNotFound,
    MatchNotFound,
    RoomNotFound,

    // State (5xxx)
    MatchAlreadyResolved,
    NoOpponent,
    NotInMatch,
    NotRoomOwner,
    NotASpectator,

    // Transient (6xxx)
    StorageUnavailable,

    // Internal (9xxx)
    InternalError,
}

impl ErrorCode {
    /// Human-readable description suitable for client display or logs.
    pub fn description(&self) -> &'static str {
        match self {
            Self::InvalidUsername => "Username must be 3-15 characters.",
            Self::InvalidPassword => "Password does not meet the minimum length requirement.",
            Self::InvalidResult => "Result must be one of win, lose, or cancel.",
            Self::MessageTooLarge => "Message exceeds the maximum allowed size.",
            Self::InvalidInput => "The request payload is malformed.",
            Self::NotAuthenticated => "This request requires an authenticated session.",
            Self::InvalidCredentials => "Username or password is incorrect.",
            Self::AuthTimeout => "No login was received before the authentication timeout elapsed.",
            Self::UsernameTaken => "That username is already registered.",
            Self::AlreadyInQueue => "You are already waiting in the matchmaking queue.",
            Self::DuplicateReport => "You have already reported a result for this match.",
            Self::AlreadyBroadcasting => "You already own an active spectate room.",
            Self::UserNotFound => "No such user exists.",
            Self::MatchNotFound => "No such match exists.",
            Self::RoomNotFound => "No such spectate room exists.",
            Self::MatchAlreadyResolved => "This match has already been resolved.",
            Self::NoOpponent => "You are not currently paired with an opponent.",
            Self::NotInMatch => "You are not part of that match.",
            Self::NotRoomOwner => "Only the broadcaster may perform that action.",
            Self::NotASpectator => "You are not a spectator of that room.",
            Self::StorageUnavailable => "The data store is temporarily unavailable; please retry.",
            Self::InternalError => "An unexpected internal error occurred.",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_screaming_snake_case() {
        let json = serde_json::to_string(&ErrorCode::UsernameTaken).unwrap();
        assert_eq!(json, "\"USERNAME_TAKEN\"");
    }

    #[test]
    fn every_variant_has_a_description() {
        assert!(!ErrorCode::InternalError.description().is_empty());
        assert!(!ErrorCode::NoOpponent.description().is_empty());
    }
}
