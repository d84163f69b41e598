//! HTTP and WebSocket surface of the doorgate gateway.
//!
//! [`create_router`] wires the device command routes and the realtime log
//! WebSocket onto a shared [`ConnectionManager`](doorgate_session::ConnectionManager).
//! [`serve`] runs the router on a bound listener until the shutdown future
//! resolves, then closes every open session.

pub mod api;
pub mod app_state;
pub mod config;
pub mod routes;

pub use app_state::{AppState, SharedState};
pub use config::{ConfigError, GatewayConfig};
pub use routes::create_router;

use std::future::Future;
use tokio::net::TcpListener;
use tracing::info;

/// Serve the gateway on `listener` until `shutdown` resolves.
pub async fn serve(
    listener: TcpListener,
    state: SharedState,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    let manager = state.manager.clone();
    info!("doorgate listening on {}", listener.local_addr()?);

    axum::serve(listener, create_router(state))
        .with_graceful_shutdown(shutdown)
        .await?;

    manager.shutdown().await;
    info!("doorgate stopped");
    Ok(())
}
