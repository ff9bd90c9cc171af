//! Per-connection accept loop: split the socket into a send half fed by an
//! mpsc channel and a receive half that feeds parsed frames into the hub,
//! enforcing the message-size cap and the pre-authentication timeout.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;

use crate::protocol::ErrorCode;
use crate::server::HubServer;

use super::sending::send_message;

pub(super) async fn handle_socket(socket: WebSocket, server: Arc<HubServer>, addr: SocketAddr) {
    let (mut sink, mut stream) = socket.split();
    let (tx, mut rx) = mpsc::channel(128);

    let Some(conn_id) = server.accept_connection(addr.ip(), tx).await else {
        tracing::warn!(%addr, "rejecting connection: per-IP limit reached");
        let _ = sink.close().await;
        return;
    };
    tracing::info!(%conn_id, %addr, "connection accepted");

    let send_task = tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            if send_message(&mut sink, conn_id, &message).await.is_err() {
                break;
            }
        }
        let _ = sink.close().await;
    });

    let auth_timeout = Duration::from_secs(server.config.websocket.auth_timeout_secs);
    let deadline = tokio::time::sleep(auth_timeout);
    tokio::pin!(deadline);
    let mut authenticated_or_attempted = false;

    loop {
        tokio::select! {
            frame = stream.next() => {
                let Some(frame) = frame else { break };
                let frame = match frame {
                    Ok(frame) => frame,
                    Err(error) => {
                        tracing::warn!(%conn_id, %error, "websocket read error");
                        break;
                    }
                };
                match frame {
                    Message::Text(text) => {
                        if text.len() > server.config.security.max_message_size {
                            tracing::warn!(%conn_id, size = text.len(), "dropping oversized frame");
                            server
                                .sessions
                                .send_to(
                                    conn_id,
                                    Arc::new(crate::protocol::ServerMessage::Error {
                                        message: ErrorCode::MessageTooLarge.description().to_string(),
                                        error_code: ErrorCode::MessageTooLarge,
                                    }),
                                )
                                .await;
                            continue;
                        }
                        if server.dispatch(conn_id, &text).await {
                            authenticated_or_attempted = true;
                        }
                    }
                    Message::Close(_) => break,
                    _ => {}
                }
            }
            () = &mut deadline, if !authenticated_or_attempted => {
                tracing::warn!(%conn_id, "closing connection: no login attempt before auth timeout");
                server
                    .sessions
                    .send_to(
                        conn_id,
                        Arc::new(crate::protocol::ServerMessage::Error {
                            message: ErrorCode::AuthTimeout.description().to_string(),
                            error_code: ErrorCode::AuthTimeout,
                        }),
                    )
                    .await;
                break;
            }
        }
    }

    send_task.abort();
    server.handle_disconnect(conn_id, addr.ip()).await;
    tracing::info!(%conn_id, "connection closed");
}
