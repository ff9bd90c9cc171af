#![cfg_attr(not(test), deny(clippy::panic))]

use std::net::SocketAddr;

use clap::Parser;

use card_hub_server::config;
use card_hub_server::logging;
use card_hub_server::server::HubServer;
use card_hub_server::websocket;

/// Realtime session hub for a rated 1v1 card-game matching service.
#[derive(Parser, Debug)]
#[command(name = "card-hub-server")]
#[command(about = "Realtime matchmaking, match resolution, and WebRTC signaling hub")]
#[command(version)]
struct Cli {
    /// Validate configuration and exit without starting the server.
    #[arg(long, short = 'c', conflicts_with = "print_config")]
    validate_config: bool,

    /// Print the loaded configuration to stdout (as JSON) and exit.
    #[arg(long, conflicts_with = "validate_config")]
    print_config: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let cfg = config::load();

    if cli.print_config {
        let json = serde_json::to_string_pretty(&cfg)
            .map_err(|e| anyhow::anyhow!("failed to serialize config: {e}"))?;
        println!("{json}");
        return Ok(());
    }

    let validation_result = config::validate_config_security(&cfg);

    if cli.validate_config {
        match validation_result {
            Ok(()) => {
                println!("Configuration validation passed");
                println!();
                println!("Configuration summary:");
                println!("  Port: {}", cfg.port);
                println!("  Elo K-factor: {}", cfg.server.elo_k_factor);
                println!("  History cap: {}", cfg.server.history_cap);
                println!("  CORS origins: {}", cfg.security.cors_origins);
                println!("  Max connections: {}", cfg.websocket.max_connections);
                println!("  Auth timeout (s): {}", cfg.websocket.auth_timeout_secs);
                return Ok(());
            }
            Err(error) => {
                eprintln!("Configuration validation failed:\n{error}");
                std::process::exit(1);
            }
        }
    }
    validation_result?;

    logging::init_with_config(&cfg.logging);

    let addr = SocketAddr::from(([0, 0, 0, 0], cfg.port));
    tracing::info!(%addr, "starting card hub server");

    let server = HubServer::new(cfg).await?;
    websocket::run_server(addr, server).await
}
