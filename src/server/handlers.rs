//! One async handler per `ClientMessage` variant. Handlers never panic and
//! never talk to the transport layer directly — they return the reply (or
//! `None`, for relays whose only effect is the forward itself) and let the
//! router send it.

use std::sync::Arc;

use serde_json::Value;
use uuid::Uuid;

use crate::match_coordinator::{classify, MatchError};
use crate::protocol::{
    BroadcastListEntry, ConnId, ErrorCode, LoginProfile, MatchId, RankingEntry, ReportStatus,
    ReportValue, RoomId, ServerMessage, UserId,
};
use crate::protocol::validation::{validate_password_with_config, validate_username_with_config};
use crate::signaling::SignalError;
use crate::spectate::SpectateError;
use crate::store::{StoreError, UserPatch};

use super::HubServer;

const MIN_RANKING_LIMIT: usize = 10;
const MAX_RANKING_LIMIT: usize = 100;

pub async fn register(server: &HubServer, username: String, password: String) -> ServerMessage {
    if let Err(message) = validate_username_with_config(&username, &server.config.security) {
        return ServerMessage::RegisterResponse {
            success: false,
            message: Some(message),
            error_code: Some(ErrorCode::InvalidUsername),
            user_id: None,
        };
    }
    if let Err(message) = validate_password_with_config(&password, &server.config.security) {
        return ServerMessage::RegisterResponse {
            success: false,
            message: Some(message),
            error_code: Some(ErrorCode::InvalidPassword),
            user_id: None,
        };
    }
    if let Err(error) = server.login_rate_limiter.check_rate_limit(
        &username.to_lowercase(),
        server.config.security.login_rate_limit.max_attempts,
    ) {
        return ServerMessage::RegisterResponse {
            success: false,
            message: Some(error.to_string()),
            error_code: Some(ErrorCode::InvalidCredentials),
            user_id: None,
        };
    }

    let verifier = match server.password_hasher.hash(&password) {
        Ok(verifier) => verifier,
        Err(error) => {
            tracing::error!(%error, "password hashing failed during registration");
            return ServerMessage::RegisterResponse {
                success: false,
                message: Some(ErrorCode::InternalError.description().to_string()),
                error_code: Some(ErrorCode::InternalError),
                user_id: None,
            };
        }
    };

    let user_id = UserId::new_v4();
    match server.store.insert_user(user_id, &username, &verifier).await {
        Ok(user) => ServerMessage::RegisterResponse {
            success: true,
            message: None,
            error_code: None,
            user_id: Some(user.id),
        },
        Err(StoreError::UniqueViolation(_)) => ServerMessage::RegisterResponse {
            success: false,
            message: Some(ErrorCode::UsernameTaken.description().to_string()),
            error_code: Some(ErrorCode::UsernameTaken),
            user_id: None,
        },
        Err(error) => store_error_response(error, |message, error_code| ServerMessage::RegisterResponse {
            success: false,
            message: Some(message),
            error_code: Some(error_code),
            user_id: None,
        }),
    }
}

pub async fn login(server: &HubServer, conn_id: ConnId, username: String, password: String) -> ServerMessage {
    if let Err(error) = server
        .login_rate_limiter
        .check_rate_limit(&username.to_lowercase(), server.config.security.login_rate_limit.max_attempts)
    {
        return ServerMessage::LoginResponse {
            success: false,
            message: Some(error.to_string()),
            error_code: Some(ErrorCode::InvalidCredentials),
            profile: None,
        };
    }

    let user = match server
        .retry
        .retry_once_on_transient("fetch_user_by_name", || server.store.fetch_user_by_name(&username))
        .await
    {
        Ok(Some(user)) => user,
        Ok(None) => {
            return ServerMessage::LoginResponse {
                success: false,
                message: Some(ErrorCode::InvalidCredentials.description().to_string()),
                error_code: Some(ErrorCode::InvalidCredentials),
                profile: None,
            }
        }
        Err(error) => {
            return store_error_response(error, |message, error_code| ServerMessage::LoginResponse {
                success: false,
                message: Some(message),
                error_code: Some(error_code),
                profile: None,
            })
        }
    };

    if !server.password_hasher.verify(&password, &user.verifier) {
        return ServerMessage::LoginResponse {
            success: false,
            message: Some(ErrorCode::InvalidCredentials.description().to_string()),
            error_code: Some(ErrorCode::InvalidCredentials),
            profile: None,
        };
    }

    bind_session(server, conn_id, user.id).await;
    ServerMessage::LoginResponse {
        success: true,
        message: None,
        error_code: None,
        profile: Some(profile_of(&user)),
    }
}

pub async fn auto_login(server: &HubServer, conn_id: ConnId, user_id: UserId, username: String) -> ServerMessage {
    match server.retry.retry_once_on_transient("fetch_user", || server.store.fetch_user(user_id)).await {
        Ok(Some(user)) if user.username.to_lowercase() == username.to_lowercase() => {
            bind_session(server, conn_id, user.id).await;
            ServerMessage::AutoLoginResponse {
                success: true,
                message: None,
                error_code: None,
                profile: Some(profile_of(&user)),
            }
        }
        Ok(Some(_)) => ServerMessage::AutoLoginResponse {
            success: false,
            message: Some(ErrorCode::InvalidCredentials.description().to_string()),
            error_code: Some(ErrorCode::InvalidCredentials),
            profile: None,
        },
        Ok(None) => ServerMessage::AutoLoginResponse {
            success: false,
            message: Some(ErrorCode::UserNotFound.description().to_string()),
            error_code: Some(ErrorCode::UserNotFound),
            profile: None,
        },
        Err(error) => store_error_response(error, |message, error_code| ServerMessage::AutoLoginResponse {
            success: false,
            message: Some(message),
            error_code: Some(error_code),
            profile: None,
        }),
    }
}

async fn bind_session(server: &HubServer, conn_id: ConnId, user_id: UserId) {
    if let Some(evicted) = server.sessions.bind(conn_id, user_id).await {
        server
            .sessions
            .send_to(
                evicted,
                Arc::new(ServerMessage::LogoutForced {
                    reason: "logged in from another connection".to_string(),
                }),
            )
            .await;
    }
    server.metrics.session_bound();
}

pub async fn logout(server: &HubServer, conn_id: ConnId) -> ServerMessage {
    if let Some(user_id) = server.sessions.user_of(conn_id).await {
        server.queue.leave(user_id).await;
        server.sessions.unbind(conn_id).await;
        server.metrics.session_unbound();
    }
    ServerMessage::LogoutResponse { success: true }
}

pub async fn change_username(server: &HubServer, conn_id: ConnId, new_username: String) -> ServerMessage {
    let Some(user_id) = server.sessions.user_of(conn_id).await else {
        return auth_required(ServerMessage::ChangeUsernameResponse {
            success: false,
            message: None,
            error_code: None,
        });
    };
    if let Err(message) = validate_username_with_config(&new_username, &server.config.security) {
        return ServerMessage::ChangeUsernameResponse {
            success: false,
            message: Some(message),
            error_code: Some(ErrorCode::InvalidUsername),
        };
    }
    let patch = UserPatch {
        username: Some(new_username),
        ..Default::default()
    };
    match server.store.patch_user(user_id, patch).await {
        Ok(_) => ServerMessage::ChangeUsernameResponse {
            success: true,
            message: None,
            error_code: None,
        },
        Err(StoreError::UniqueViolation(_)) => ServerMessage::ChangeUsernameResponse {
            success: false,
            message: Some(ErrorCode::UsernameTaken.description().to_string()),
            error_code: Some(ErrorCode::UsernameTaken),
        },
        Err(error) => store_error_response(error, |message, error_code| ServerMessage::ChangeUsernameResponse {
            success: false,
            message: Some(message),
            error_code: Some(error_code),
        }),
    }
}

pub async fn update_user_data(
    server: &HubServer,
    conn_id: ConnId,
    rate: Option<i32>,
    match_history: Option<Vec<String>>,
    memos: Option<Value>,
    battle_records: Option<Value>,
    registered_decks: Option<Value>,
    current_match_id: Option<Option<MatchId>>,
) -> ServerMessage {
    let Some(user_id) = server.sessions.user_of(conn_id).await else {
        return auth_required(ServerMessage::UpdateUserDataResponse {
            success: false,
            message: None,
            error_code: None,
        });
    };
    let patch = UserPatch {
        rate,
        match_history: match_history.map(std::collections::VecDeque::from),
        memos,
        battle_records,
        registered_decks,
        current_match_id,
        ..Default::default()
    };
    match server.store.patch_user(user_id, patch).await {
        Ok(_) => ServerMessage::UpdateUserDataResponse {
            success: true,
            message: None,
            error_code: None,
        },
        Err(error) => store_error_response(error, |message, error_code| ServerMessage::UpdateUserDataResponse {
            success: false,
            message: Some(message),
            error_code: Some(error_code),
        }),
    }
}

pub async fn join_queue(server: &HubServer, conn_id: ConnId) -> ServerMessage {
    let Some(user_id) = server.sessions.user_of(conn_id).await else {
        return auth_required(ServerMessage::JoinQueueResponse {
            success: false,
            message: None,
            error_code: None,
        });
    };
    if !server.queue.enqueue(user_id).await {
        return ServerMessage::JoinQueueResponse {
            success: false,
            message: Some(ErrorCode::AlreadyInQueue.description().to_string()),
            error_code: Some(ErrorCode::AlreadyInQueue),
        };
    }
    server.metrics.set_queue_depth(server.queue.len().await as u64);

    if let Some((first, second)) = server.queue.try_pair(&server.sessions).await {
        match server.match_coordinator.create_match(first, second).await {
            Ok(_) => server.metrics.match_created(),
            Err(error) => tracing::error!(%error, "failed to create match after pairing"),
        }
    }
    if server.config.server.queue_notify_all {
        server.metrics.set_queue_depth(server.queue.len().await as u64);
        server.notifier.push_queue_count().await;
    }

    ServerMessage::JoinQueueResponse {
        success: true,
        message: None,
        error_code: None,
    }
}

pub async fn leave_queue(server: &HubServer, conn_id: ConnId) -> ServerMessage {
    if let Some(user_id) = server.sessions.user_of(conn_id).await {
        server.queue.leave(user_id).await;
        server.metrics.set_queue_depth(server.queue.len().await as u64);
        if server.config.server.queue_notify_all {
            server.notifier.push_queue_count().await;
        }
    }
    ServerMessage::LeaveQueueResponse { success: true }
}

pub async fn webrtc_signal(server: &HubServer, conn_id: ConnId, signal: Value) -> Option<ServerMessage> {
    match server.signaling.relay_to_opponent(conn_id, signal).await {
        Ok(()) => {
            server.metrics.signal_relayed();
            None
        }
        Err(error) => Some(signal_error_response(error)),
    }
}

pub async fn report_result(server: &HubServer, conn_id: ConnId, match_id: MatchId, result: ReportValue) -> ServerMessage {
    let Some(user_id) = server.sessions.user_of(conn_id).await else {
        return auth_required(ServerMessage::ReportResultResponse {
            success: false,
            message: None,
            error_code: None,
            status: None,
        });
    };
    match server.match_coordinator.report_result(user_id, match_id, result).await {
        Ok(status) => {
            if status == ReportStatus::Resolved {
                let fetched = server.retry.retry_once_on_transient("fetch_match", || server.store.fetch_match(match_id)).await;
                if let Ok(Some(m)) = fetched {
                    if let (Some(r1), Some(r2)) = (m.report1, m.report2) {
                        server.metrics.match_resolved(classify(r1, r2));
                    }
                }
            }
            ServerMessage::ReportResultResponse {
                success: true,
                message: None,
                error_code: None,
                status: Some(status),
            }
        }
        Err(error) => match_error_response(error),
    }
}

pub async fn clear_match_info(server: &HubServer, conn_id: ConnId) -> ServerMessage {
    if let Some(user_id) = server.sessions.user_of(conn_id).await {
        server.sessions.set_opponent(conn_id, None, None).await;
        let patch = UserPatch {
            current_match_id: Some(None),
            ..Default::default()
        };
        if let Err(error) = server.store.patch_user(user_id, patch).await {
            tracing::warn!(%error, "failed to clear current_match_id");
        }
    }
    ServerMessage::ClearMatchInfoResponse { success: true }
}

pub async fn get_ranking(server: &HubServer, limit: Option<usize>) -> ServerMessage {
    let limit = limit.unwrap_or(MIN_RANKING_LIMIT).clamp(MIN_RANKING_LIMIT, MAX_RANKING_LIMIT);
    match server.store.top_by_rating(limit).await {
        Ok(users) => ServerMessage::RankingResponse {
            entries: users
                .into_iter()
                .map(|user| RankingEntry {
                    username: user.username,
                    rate: user.rate,
                })
                .collect(),
        },
        Err(_) => ServerMessage::RankingResponse { entries: Vec::new() },
    }
}

pub async fn start_broadcast(server: &HubServer, conn_id: ConnId) -> ServerMessage {
    let Some(user_id) = server.sessions.user_of(conn_id).await else {
        return auth_required(ServerMessage::StartBroadcastResponse {
            success: false,
            message: None,
            error_code: None,
            room_id: None,
        });
    };
    let username = match server.retry.retry_once_on_transient("fetch_user", || server.store.fetch_user(user_id)).await {
        Ok(Some(user)) => user.username,
        _ => {
            return ServerMessage::StartBroadcastResponse {
                success: false,
                message: Some(ErrorCode::UserNotFound.description().to_string()),
                error_code: Some(ErrorCode::UserNotFound),
                room_id: None,
            }
        }
    };
    match server.spectate.start_broadcast(conn_id, username).await {
        Ok(room_id) => {
            server.metrics.spectate_room_opened();
            server.notifier.push_broadcast_list().await;
            ServerMessage::StartBroadcastResponse {
                success: true,
                message: None,
                error_code: None,
                room_id: Some(room_id),
            }
        }
        Err(error) => spectate_error_response(error, |message, error_code| ServerMessage::StartBroadcastResponse {
            success: false,
            message: Some(message),
            error_code: Some(error_code),
            room_id: None,
        }),
    }
}

pub async fn stop_broadcast(server: &HubServer, conn_id: ConnId, room_id: RoomId) -> ServerMessage {
    match server.spectate.stop_broadcast(&room_id, conn_id).await {
        Ok(()) => {
            server.metrics.spectate_room_closed();
            server.notifier.push_broadcast_list().await;
            ServerMessage::StopBroadcastResponse {
                success: true,
                message: None,
                error_code: None,
            }
        }
        Err(error) => spectate_error_response(error, |message, error_code| ServerMessage::StopBroadcastResponse {
            success: false,
            message: Some(message),
            error_code: Some(error_code),
        }),
    }
}

pub async fn join_spectate_room(server: &HubServer, conn_id: ConnId, room_id: RoomId) -> ServerMessage {
    match server.spectate.join(&room_id, conn_id).await {
        Ok(broadcaster_username) => ServerMessage::JoinSpectateRoomResponse {
            success: true,
            message: None,
            error_code: None,
            broadcaster_username: Some(broadcaster_username),
        },
        Err(error) => spectate_error_response(error, |message, error_code| ServerMessage::JoinSpectateRoomResponse {
            success: false,
            message: Some(message),
            error_code: Some(error_code),
            broadcaster_username: None,
        }),
    }
}

pub async fn leave_spectate_room(server: &HubServer, conn_id: ConnId, room_id: RoomId) -> ServerMessage {
    let _ = server.spectate.leave(&room_id, conn_id).await;
    ServerMessage::LeaveSpectateRoomResponse { success: true }
}

pub async fn spectate_signal(server: &HubServer, conn_id: ConnId, room_id: RoomId, signal: Value) -> Option<ServerMessage> {
    match server.signaling.broadcast_spectate_signal(&room_id, conn_id, signal).await {
        Ok(()) => {
            server.metrics.signal_relayed();
            None
        }
        Err(error) => Some(signal_error_response(error)),
    }
}

pub async fn webrtc_signal_to_spectator(
    server: &HubServer,
    conn_id: ConnId,
    room_id: RoomId,
    spectator_id: Uuid,
    signal: Value,
) -> Option<ServerMessage> {
    let spectator_conn: ConnId = spectator_id;
    match server
        .signaling
        .relay_to_spectator(&room_id, conn_id, spectator_conn, signal)
        .await
    {
        Ok(()) => {
            server.metrics.signal_relayed();
            None
        }
        Err(error) => Some(signal_error_response(error)),
    }
}

pub async fn webrtc_signal_to_broadcaster(
    server: &HubServer,
    conn_id: ConnId,
    room_id: RoomId,
    signal: Value,
) -> Option<ServerMessage> {
    match server.signaling.relay_to_broadcaster(&room_id, conn_id, signal).await {
        Ok(()) => {
            server.metrics.signal_relayed();
            None
        }
        Err(error) => Some(signal_error_response(error)),
    }
}

pub async fn get_broadcast_list(server: &HubServer) -> ServerMessage {
    let rooms: Vec<BroadcastListEntry> = server.spectate.list().await;
    ServerMessage::BroadcastListUpdate { rooms }
}

fn profile_of(user: &crate::store::User) -> LoginProfile {
    LoginProfile {
        user_id: user.id,
        username: user.username.clone(),
        rate: user.rate,
        match_history: user.match_history.iter().cloned().collect(),
        memos: user.memos.clone(),
        battle_records: user.battle_records.clone(),
        registered_decks: user.registered_decks.clone(),
    }
}

fn auth_required(mut reply: ServerMessage) -> ServerMessage {
    match &mut reply {
        ServerMessage::ChangeUsernameResponse { message, error_code, .. }
        | ServerMessage::UpdateUserDataResponse { message, error_code, .. }
        | ServerMessage::JoinQueueResponse { message, error_code, .. }
        | ServerMessage::StartBroadcastResponse { message, error_code, .. } => {
            *message = Some(ErrorCode::NotAuthenticated.description().to_string());
            *error_code = Some(ErrorCode::NotAuthenticated);
        }
        ServerMessage::ReportResultResponse { message, error_code, .. } => {
            *message = Some(ErrorCode::NotAuthenticated.description().to_string());
            *error_code = Some(ErrorCode::NotAuthenticated);
        }
        _ => {}
    }
    reply
}

fn store_error_response<T>(error: StoreError, build: impl FnOnce(String, ErrorCode) -> T) -> T {
    match error {
        StoreError::NotFound => build(ErrorCode::UserNotFound.description().to_string(), ErrorCode::UserNotFound),
        StoreError::UniqueViolation(_) => {
            build(ErrorCode::UsernameTaken.description().to_string(), ErrorCode::UsernameTaken)
        }
        StoreError::Transient(_) => build(
            ErrorCode::StorageUnavailable.description().to_string(),
            ErrorCode::StorageUnavailable,
        ),
    }
}

fn match_error_response(error: MatchError) -> ServerMessage {
    let error_code = match error {
        MatchError::NotFound => ErrorCode::MatchNotFound,
        MatchError::AlreadyResolved => ErrorCode::MatchAlreadyResolved,
        MatchError::NotInMatch => ErrorCode::NotInMatch,
        MatchError::DuplicateReport => ErrorCode::DuplicateReport,
        MatchError::Store(_) => ErrorCode::StorageUnavailable,
    };
    ServerMessage::ReportResultResponse {
        success: false,
        message: Some(error_code.description().to_string()),
        error_code: Some(error_code),
        status: None,
    }
}

fn spectate_error_response<T>(error: SpectateError, build: impl FnOnce(String, ErrorCode) -> T) -> T {
    let error_code = match error {
        SpectateError::AlreadyBroadcasting => ErrorCode::AlreadyBroadcasting,
        SpectateError::RoomNotFound => ErrorCode::RoomNotFound,
        SpectateError::NotRoomOwner => ErrorCode::NotRoomOwner,
        SpectateError::NotASpectator => ErrorCode::NotASpectator,
    };
    build(error_code.description().to_string(), error_code)
}

fn signal_error_response(error: SignalError) -> ServerMessage {
    let error_code = match error {
        SignalError::NoOpponent => ErrorCode::NoOpponent,
        SignalError::NotAuthenticated => ErrorCode::NotAuthenticated,
        SignalError::RoomNotFound => ErrorCode::RoomNotFound,
        SignalError::NotRoomOwner => ErrorCode::NotRoomOwner,
        SignalError::NotASpectator => ErrorCode::NotASpectator,
    };
    ServerMessage::Error {
        message: error_code.description().to_string(),
        error_code,
    }
}
