//! HTTP route setup: WebSocket upgrade, liveness, and Prometheus metrics.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::connect_info::ConnectInfo;
use axum::extract::ws::WebSocketUpgrade;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;

use crate::metrics::render_prometheus_metrics;
use crate::server::HubServer;

use super::connection::handle_socket;

/// Create the Axum router with WebSocket support.
pub fn create_router(server: Arc<HubServer>) -> axum::Router {
    use tower_http::cors::{Any, CorsLayer};
    use tower_http::trace::TraceLayer;

    let cors_origins = server.config.security.cors_origins.clone();
    let cors = if cors_origins == "*" {
        CorsLayer::permissive()
    } else {
        let origins: Vec<_> = cors_origins
            .split(',')
            .filter_map(|s| s.trim().parse::<axum::http::HeaderValue>().ok())
            .collect();

        if origins.is_empty() {
            tracing::warn!("no valid CORS origins configured, using permissive CORS");
            CorsLayer::permissive()
        } else {
            CorsLayer::new()
                .allow_origin(origins)
                .allow_methods(Any)
                .allow_headers(Any)
        }
    };

    axum::Router::new()
        .route("/", get(liveness))
        .route("/ws", get(websocket_handler))
        .route("/metrics", get(prometheus_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(server)
}

async fn liveness() -> &'static str {
    "card-hub-server"
}

async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(server): State<Arc<HubServer>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, server, addr))
}

async fn prometheus_handler(State(server): State<Arc<HubServer>>) -> impl IntoResponse {
    render_prometheus_metrics(&server.metrics.snapshot())
}

/// Binds a TCP listener on `addr` and serves the router until the process
/// is terminated.
pub async fn run_server(addr: SocketAddr, server: Arc<HubServer>) -> anyhow::Result<()> {
    server.spawn_maintenance_tasks();
    let app = create_router(server);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "card hub listening");
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await?;
    Ok(())
}
