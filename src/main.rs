//! Library-booking edge gateway.
//!
//! # Architecture Overview
//!
//! ```text
//!                     ┌──────────────────────────────────────────────────┐
//!                     │                     GATEWAY                      │
//!   Client Request    │  ┌─────────┐   ┌───────────┐   ┌─────────────┐   │
//!   ──────────────────┼─▶│  http   │──▶│ auth gate │──▶│ route table │   │
//!                     │  │ server  │   │  (401)    │   │   (404)     │   │
//!                     │  └─────────┘   └───────────┘   └──────┬──────┘   │
//!                     │                                       ▼          │
//!   Client Response   │                               ┌─────────────┐    │
//!   ◀─────────────────┼───────────────────────────────│  upstream   │◀───┼── Backend
//!                     │                               │ (502 / 503) │    │   service
//!                     │                               └─────────────┘    │
//!                     └──────────────────────────────────────────────────┘
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use library_gateway::config::{load_config, load_default_config};
use library_gateway::lifecycle::{wait_for_signal, Shutdown};
use library_gateway::observability::{logging::init_logging, metrics::init_metrics};
use library_gateway::GatewayServer;

#[derive(Parser)]
#[command(name = "library-gateway")]
#[command(about = "Edge gateway for the library-booking services", long_about = None)]
struct Args {
    /// TOML configuration file; built-in defaults when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => load_default_config()?,
    };

    init_logging(&config.observability)?;

    tracing::info!("library-gateway v{} starting", env!("CARGO_PKG_VERSION"));

    if config.auth.uses_default_secret() {
        tracing::warn!("Using the built-in JWT secret; set JWT_SECRET or auth.jwt_secret");
    }

    tracing::info!(
        config_file = ?args.config,
        bind_address = %config.listener.bind_address,
        public_paths = config.auth.public_paths.len(),
        upstream_timeout_secs = config.timeouts.upstream_secs,
        "Configuration loaded"
    );
    for route in config.routes.iter() {
        tracing::info!(
            route = %route.name,
            prefix = %route.path_prefix,
            backend = %route.backend,
            strip_prefix = route.strip_prefix,
            "Route registered"
        );
    }

    if config.observability.metrics_enabled {
        let addr: SocketAddr = config.observability.metrics_address.parse()?;
        init_metrics(addr)?;
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    let local_addr = listener.local_addr()?;
    tracing::info!(address = %local_addr, "Listening for connections");

    let server = GatewayServer::new(config)?;

    let shutdown = Shutdown::new();
    let signal = shutdown.subscribe();
    tokio::spawn(async move {
        wait_for_signal().await;
        shutdown.trigger();
    });

    server.run(listener, signal).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
