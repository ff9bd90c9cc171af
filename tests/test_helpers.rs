use std::net::SocketAddr;
use std::sync::Arc;

use card_hub_server::config::Config;
use card_hub_server::protocol::{ClientMessage, ServerMessage};
use card_hub_server::server::HubServer;
use card_hub_server::websocket::create_router;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

pub type ClientSink = SplitSink<WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>, Message>;
pub type ClientStream = SplitStream<WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>>;

/// Fast-cycling config suitable for tests: short auth timeout, generous
/// per-IP and rate-limit allowances so unrelated assertions never trip them.
#[allow(dead_code)]
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.port = 0;
    config.websocket.auth_timeout_secs = 5;
    config
}

/// Boots a real hub server bound to an ephemeral localhost port and returns
/// its address once the listener is accepting connections.
#[allow(dead_code)]
pub async fn start_test_server() -> SocketAddr {
    start_test_server_with_config(test_config()).await
}

#[allow(dead_code)]
pub async fn start_test_server_with_config(config: Config) -> SocketAddr {
    let server = HubServer::new(config).await.expect("failed to construct hub server");
    server.spawn_maintenance_tasks();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let router = create_router(server);

    tokio::spawn(async move {
        axum::serve(listener, router.into_make_service_with_connect_info::<SocketAddr>())
            .await
            .unwrap();
    });

    tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;
    addr
}

#[allow(dead_code)]
pub async fn connect_client(addr: SocketAddr) -> (ClientSink, ClientStream) {
    let url = format!("ws://{addr}/ws");
    let (ws_stream, _) = tokio::time::timeout(tokio::time::Duration::from_secs(5), connect_async(&url))
        .await
        .expect("websocket connect timed out")
        .expect("failed to connect");
    ws_stream.split()
}

#[allow(dead_code)]
pub async fn send(sink: &mut ClientSink, message: &ClientMessage) {
    let json = serde_json::to_string(message).unwrap();
    sink.send(Message::Text(json.into())).await.unwrap();
}

#[allow(dead_code)]
pub async fn recv(stream: &mut ClientStream) -> ServerMessage {
    let frame = tokio::time::timeout(tokio::time::Duration::from_secs(5), stream.next())
        .await
        .expect("timed out waiting for server message")
        .expect("connection closed")
        .expect("websocket frame error");
    let text = frame.into_text().expect("expected a text frame");
    serde_json::from_str(&text).expect("expected a valid ServerMessage")
}

/// Receives frames until one matching `pred` arrives, skipping interleaved
/// pushes (e.g. `queue_count_update`) that are not the response under test.
/// Only safe when the discarded frames carry nothing the caller still needs;
/// when two expected frames may arrive in either order, use `recv_n` instead.
#[allow(dead_code)]
pub async fn recv_until(stream: &mut ClientStream, pred: impl Fn(&ServerMessage) -> bool) -> ServerMessage {
    loop {
        let message = recv(stream).await;
        if pred(&message) {
            return message;
        }
    }
}

/// Reads exactly `n` frames without assuming their relative order; use when
/// two pushes may race (e.g. a coordinator event and its triggering
/// handler's own reply) and both are needed by the caller.
#[allow(dead_code)]
pub async fn recv_n(stream: &mut ClientStream, n: usize) -> Vec<ServerMessage> {
    let mut out = Vec::with_capacity(n);
    for _ in 0..n {
        out.push(recv(stream).await);
    }
    out
}

#[allow(dead_code)]
pub async fn register_and_login(sink: &mut ClientSink, stream: &mut ClientStream, username: &str, password: &str) -> card_hub_server::protocol::LoginProfile {
    send(sink, &ClientMessage::Register { username: username.to_string(), password: password.to_string() }).await;
    match recv(stream).await {
        ServerMessage::RegisterResponse { success, .. } => assert!(success, "registration should succeed for a fresh username"),
        other => panic!("expected RegisterResponse, got {other:?}"),
    }

    send(sink, &ClientMessage::Login { username: username.to_string(), password: password.to_string() }).await;
    match recv(stream).await {
        ServerMessage::LoginResponse { success: true, profile: Some(profile), .. } => profile,
        other => panic!("expected a successful LoginResponse, got {other:?}"),
    }
}
