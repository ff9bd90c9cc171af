//! Message Router (component H): the single entry point every parsed
//! `ClientMessage` passes through. Enforces the per-request auth
//! requirement from the external-interface table, then dispatches to a
//! handler. Handler errors are always turned into a typed reply — nothing
//! here propagates a panic or closes the connection.

use tracing::error;

use crate::protocol::{ClientMessage, ConnId, ErrorCode, ServerMessage};

use super::handlers;
use super::HubServer;

/// Routes one parsed message to its handler and, if the handler produced a
/// reply, sends it back to `conn_id`.
pub async fn route(server: &HubServer, conn_id: ConnId, message: ClientMessage) {
    let requires_auth = requires_auth(&message);
    if requires_auth && server.sessions.user_of(conn_id).await.is_none() {
        send_error(server, conn_id, ErrorCode::NotAuthenticated).await;
        return;
    }

    let reply = match message {
        ClientMessage::Register { username, password } => {
            Some(handlers::register(server, username, password).await)
        }
        ClientMessage::Login { username, password } => {
            Some(handlers::login(server, conn_id, username, password).await)
        }
        ClientMessage::AutoLogin { user_id, username } => {
            Some(handlers::auto_login(server, conn_id, user_id, username).await)
        }
        ClientMessage::Logout => Some(handlers::logout(server, conn_id).await),
        ClientMessage::ChangeUsername { new_username } => {
            Some(handlers::change_username(server, conn_id, new_username).await)
        }
        ClientMessage::UpdateUserData {
            rate,
            match_history,
            memos,
            battle_records,
            registered_decks,
            current_match_id,
        } => Some(
            handlers::update_user_data(
                server,
                conn_id,
                rate,
                match_history,
                memos,
                battle_records,
                registered_decks,
                current_match_id,
            )
            .await,
        ),
        ClientMessage::JoinQueue => Some(handlers::join_queue(server, conn_id).await),
        ClientMessage::LeaveQueue => Some(handlers::leave_queue(server, conn_id).await),
        ClientMessage::WebrtcSignal { signal } => {
            handlers::webrtc_signal(server, conn_id, signal).await
        }
        ClientMessage::ReportResult { match_id, result } => {
            Some(handlers::report_result(server, conn_id, match_id, result).await)
        }
        ClientMessage::ClearMatchInfo => Some(handlers::clear_match_info(server, conn_id).await),
        ClientMessage::GetRanking { limit } => Some(handlers::get_ranking(server, limit).await),
        ClientMessage::StartBroadcast => Some(handlers::start_broadcast(server, conn_id).await),
        ClientMessage::StopBroadcast { room_id } => {
            Some(handlers::stop_broadcast(server, conn_id, room_id).await)
        }
        ClientMessage::JoinSpectateRoom { room_id } => {
            Some(handlers::join_spectate_room(server, conn_id, room_id).await)
        }
        ClientMessage::LeaveSpectateRoom { room_id } => {
            Some(handlers::leave_spectate_room(server, conn_id, room_id).await)
        }
        ClientMessage::SpectateSignal { room_id, signal } => {
            handlers::spectate_signal(server, conn_id, room_id, signal).await
        }
        ClientMessage::WebrtcSignalToSpectator {
            room_id,
            spectator_id,
            signal,
        } => handlers::webrtc_signal_to_spectator(server, conn_id, room_id, spectator_id, signal).await,
        ClientMessage::WebrtcSignalToBroadcaster { room_id, signal } => {
            handlers::webrtc_signal_to_broadcaster(server, conn_id, room_id, signal).await
        }
        ClientMessage::GetBroadcastList => Some(handlers::get_broadcast_list(server).await),
    };

    if let Some(reply) = reply {
        server.sessions.send_to(conn_id, std::sync::Arc::new(reply)).await;
    }
}

/// Per-type auth requirement, exactly mirroring the external-interface
/// table: `register`, `login`/`auto_login`, `get_ranking`, the public
/// spectate-join/leave/list operations, and the role-dependent signaling
/// relays (gated on room membership, not on a bound session) require no
/// bound session; every other request does.
fn requires_auth(message: &ClientMessage) -> bool {
    !matches!(
        message,
        ClientMessage::Register { .. }
            | ClientMessage::Login { .. }
            | ClientMessage::AutoLogin { .. }
            | ClientMessage::GetRanking { .. }
            | ClientMessage::JoinSpectateRoom { .. }
            | ClientMessage::LeaveSpectateRoom { .. }
            | ClientMessage::GetBroadcastList
            | ClientMessage::SpectateSignal { .. }
            | ClientMessage::WebrtcSignalToSpectator { .. }
            | ClientMessage::WebrtcSignalToBroadcaster { .. }
    )
}

async fn send_error(server: &HubServer, conn_id: ConnId, code: ErrorCode) {
    error!(%conn_id, ?code, "rejecting unauthenticated request");
    server
        .sessions
        .send_to(
            conn_id,
            std::sync::Arc::new(ServerMessage::Error {
                message: code.description().to_string(),
                error_code: code,
            }),
        )
        .await;
}
