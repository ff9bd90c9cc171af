//! Message serialization and send helper. One JSON text frame per
//! `ServerMessage`; there is no binary framing or batching in this hub.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use futures_util::stream::SplitSink;
use futures_util::SinkExt;

use crate::protocol::{ConnId, ServerMessage};

/// Serializes and writes one message. A serialization failure is a bug, not
/// a transport error, and is logged without tearing down the connection; a
/// write failure means the socket is gone and is propagated so the caller
/// stops its send loop.
pub(super) async fn send_message(
    sink: &mut SplitSink<WebSocket, Message>,
    conn_id: ConnId,
    message: &Arc<ServerMessage>,
) -> Result<(), axum::Error> {
    let payload = match serde_json::to_string(message.as_ref()) {
        Ok(payload) => payload,
        Err(error) => {
            tracing::error!(%conn_id, %error, "failed to serialize outgoing message");
            return Ok(());
        }
    };
    sink.send(Message::Text(payload.into())).await
}
