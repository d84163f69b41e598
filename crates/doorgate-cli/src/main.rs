//! doorgate gateway binary.
//!
//! # Usage
//!
//! ```bash
//! # Defaults from DOORGATE_* environment variables
//! doorgate
//!
//! # Override the bind address and log poll interval
//! doorgate --bind 0.0.0.0:8000 --poll-interval-ms 250
//! ```
//!
//! Controllers are served by the in-memory emulator, so the gateway runs
//! without hardware attached.

use anyhow::Context;
use clap::Parser;
use doorgate_driver::mock::MockConnector;
use doorgate_server::{AppState, GatewayConfig};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Door controller gateway
#[derive(Parser, Debug)]
#[command(name = "doorgate")]
#[command(about = "HTTP and WebSocket gateway for door controllers")]
#[command(version)]
struct Args {
    /// Address to bind to (overrides DOORGATE_BIND)
    #[arg(short, long)]
    bind: Option<SocketAddr>,

    /// Delay between realtime log fetches (overrides DOORGATE_POLL_INTERVAL_MS)
    #[arg(long)]
    poll_interval_ms: Option<u64>,

    /// Communication password the emulated controllers require
    #[arg(long)]
    controller_password: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("doorgate=info,tower_http=info"));
    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    let mut config = GatewayConfig::from_env().context("invalid configuration")?;
    if let Some(bind) = args.bind {
        config.bind = bind;
    }
    if let Some(ms) = args.poll_interval_ms.filter(|ms| *ms > 0) {
        config.streamer.poll_interval = Duration::from_millis(ms);
    }

    let connector = MockConnector::new();
    if let Some(password) = args.controller_password {
        connector.require_password(password);
    }
    let state = Arc::new(AppState::with_connector(Arc::new(connector), config.streamer));

    let listener = TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("failed to bind {}", config.bind))?;

    doorgate_server::serve(listener, state, shutdown_signal()).await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown requested");
}
