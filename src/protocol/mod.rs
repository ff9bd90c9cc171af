// Protocol module: wire message types, error codes, and field validation.

pub mod error_codes;
pub mod messages;
pub mod types;
pub mod validation;

pub use error_codes::ErrorCode;
pub use messages::{ClientMessage, LoginProfile, ReportStatus, ServerMessage};
pub use types::{
    BroadcastListEntry, ConnId, MatchId, MatchOutcome, PlayerSlot, PublicProfile, RankingEntry,
    ReportValue, RoomId, UserId,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_message_roundtrips_through_json() {
        let msg = ClientMessage::Login {
            username: "alice".to_string(),
            password: "hunter2pass".to_string(),
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"type\":\"login\""));
        let back: ClientMessage = serde_json::from_str(&json).unwrap();
        matches!(back, ClientMessage::Login { .. });
    }

    #[test]
    fn server_message_error_includes_code() {
        let msg = ServerMessage::Error {
            message: "nope".to_string(),
            error_code: ErrorCode::NotAuthenticated,
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["error_code"], "NOT_AUTHENTICATED");
    }

    #[test]
    fn unknown_type_fails_to_parse() {
        let raw = r#"{"type":"not_a_real_type"}"#;
        let result: Result<ClientMessage, _> = serde_json::from_str(raw);
        assert!(result.is_err());
    }
}
