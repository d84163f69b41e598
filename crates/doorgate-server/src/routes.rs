use axum::Router;
use axum::routing::{delete, get, post};
use tower_http::trace::TraceLayer;

use crate::api::{devices, stream};
use crate::app_state::SharedState;

/// Build the complete Axum router with all routes and shared state.
pub fn create_router(state: SharedState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/devices", get(devices::list_sessions))
        .route("/devices/connect", post(devices::connect))
        .route("/devices/{handle}/disconnect", post(devices::disconnect))
        .route("/devices/{handle}/restart", post(devices::restart))
        .route("/devices/{handle}/tests/relay/unlock", post(devices::unlock_relay))
        .route(
            "/devices/{handle}/data",
            get(devices::get_table)
                .post(devices::set_table)
                .delete(devices::delete_rows),
        )
        .route("/devices/{handle}/data/all", delete(devices::delete_all_rows))
        .route(
            "/devices/{handle}/users",
            get(devices::list_users).post(devices::add_users),
        )
        .route(
            "/devices/{handle}/users/{pin}",
            get(devices::get_user)
                .put(devices::update_user)
                .delete(devices::delete_user),
        )
        .route("/devices/{handle}/realtimelogs", get(stream::realtime_logs))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check handler. Returns 200 OK with the gateway version.
async fn health() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "status": "ok",
        "version": doorgate_core::VERSION,
    }))
}
