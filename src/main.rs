//! RPC relay (v1)
//!
//! A rate-limited JSON-RPC relay built with Tokio and Axum.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client ──POST /api/rpc──▶ request id ─▶ rate limit ─▶ handler ──▶ primary endpoint
//!                                   │             │            │            │ failure
//!                                   │             ▼            │            ▼
//!                                   │          429 JSON        │       backup endpoints
//!                                   ▼                          ▼            │
//!                              trace span              400 / 500 JSON       ▼
//!     Client ◀───────────────────────────────────────────── upstream JSON or last status
//!
//!     Background: sweeper (stale windows) · config watcher (endpoints, quota) · signals
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use rpc_relay::config::{load_config, watcher::ConfigWatcher, RelayConfig};
use rpc_relay::http::HttpServer;
use rpc_relay::lifecycle::{signals, Shutdown};
use rpc_relay::net::tls::load_tls_config;
use rpc_relay::observability::{logging, metrics};

#[derive(Parser, Debug)]
#[command(author, version, about = "Rate-limited JSON-RPC relay", long_about = None)]
struct Args {
    /// Path to a TOML config file. Defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Reload endpoints and quota when the config file changes.
    #[arg(long)]
    watch: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => RelayConfig::default(),
    };

    logging::init(&config.observability.log_level);
    tracing::info!("rpc-relay v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        primary = %config.upstream.primary,
        backups = config.upstream.backups.len(),
        max_requests = config.rate_limit.max_requests,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let (_watcher, config_updates) = match (&args.config, args.watch) {
        (Some(path), true) => {
            let (watcher, rx) = ConfigWatcher::new(path);
            (Some(watcher.run()?), rx)
        }
        _ => {
            let (_, rx) = mpsc::unbounded_channel();
            (None, rx)
        }
    };

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    signals::spawn_signal_handler(shutdown.clone());

    let server = HttpServer::new(config.clone())?;

    match &config.listener.tls {
        Some(tls) => {
            let tls = load_tls_config(tls).await?;
            let addr: SocketAddr = config.listener.bind_address.parse()?;
            server
                .run_tls(addr, tls, config_updates, server_shutdown)
                .await?;
        }
        None => {
            let listener = TcpListener::bind(&config.listener.bind_address).await?;
            tracing::info!(address = %listener.local_addr()?, "Listening for connections");
            server.run(listener, config_updates, server_shutdown).await?;
        }
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
