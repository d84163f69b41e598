//! Device command handlers.
//!
//! Each handler parses the path handle, forwards to the connection manager,
//! and wraps the result in the gateway's JSON envelope.

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use doorgate_core::{
    ConnectionParameters, RelayPulse, TableName, TableRow, User,
    constants::{DEFAULT_UNLOCK_RELAY, DEFAULT_UNLOCK_SECONDS},
    records::validate_pin,
};
use doorgate_session::SessionInfo;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::api::{ApiResult, error::ApiError, parse_handle};
use crate::app_state::SharedState;

fn parse_pin(pin: &str) -> ApiResult<&str> {
    validate_pin(pin)?;
    Ok(pin)
}

fn success() -> Json<Value> {
    Json(json!({ "status": "success" }))
}

/// Query string of `GET /devices/{handle}/data`.
#[derive(Debug, Deserialize)]
pub struct TableQuery {
    pub tablename: TableName,
}

/// Body of `POST /devices/{handle}/data`.
#[derive(Debug, Deserialize)]
pub struct SetTableRequest {
    pub tablename: TableName,
    pub data: Vec<TableRow>,
}

/// Body of `DELETE /devices/{handle}/data`.
#[derive(Debug, Deserialize)]
pub struct DeleteRowsRequest {
    pub tablename: TableName,
    #[serde(default)]
    pub filter: TableRow,
}

/// Optional body of the relay unlock test.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct UnlockRequest {
    pub relay: u8,
    pub seconds: u32,
}

impl Default for UnlockRequest {
    fn default() -> Self {
        Self {
            relay: DEFAULT_UNLOCK_RELAY,
            seconds: u32::from(DEFAULT_UNLOCK_SECONDS),
        }
    }
}

/// GET /devices - List open sessions.
pub async fn list_sessions(State(state): State<SharedState>) -> Json<Vec<SessionInfo>> {
    Json(state.manager.sessions().await)
}

/// POST /devices/connect - Open a controller connection.
pub async fn connect(
    State(state): State<SharedState>,
    Json(params): Json<ConnectionParameters>,
) -> ApiResult<Json<Value>> {
    let handle = state.manager.connect(params).await?;
    Ok(Json(json!({ "status": "success", "handle": handle })))
}

/// POST /devices/{handle}/disconnect - Close a connection. Idempotent.
///
/// Handle 0 is never connected, so it is answered like any other unknown
/// handle. Only a non-numeric handle is rejected.
pub async fn disconnect(
    State(state): State<SharedState>,
    Path(raw): Path<String>,
) -> ApiResult<Json<Value>> {
    let was_connected = match parse_handle(&raw) {
        Ok(handle) => state.manager.disconnect(handle).await,
        Err(_) if raw.trim().parse::<u64>() == Ok(0) => false,
        Err(e) => return Err(e),
    };
    Ok(Json(json!({ "status": "success", "disconnected": was_connected })))
}

/// POST /devices/{handle}/restart
pub async fn restart(
    State(state): State<SharedState>,
    Path(handle): Path<String>,
) -> ApiResult<Json<Value>> {
    let handle = parse_handle(&handle)?;
    state.manager.restart(handle).await?;
    Ok(success())
}

/// POST /devices/{handle}/tests/relay/unlock - Pulse the lock relay.
pub async fn unlock_relay(
    State(state): State<SharedState>,
    Path(handle): Path<String>,
    body: Option<Json<UnlockRequest>>,
) -> ApiResult<Json<Value>> {
    let handle = parse_handle(&handle)?;
    let req = body.map(|Json(req)| req).unwrap_or_default();
    let pulse = RelayPulse::new(req.relay, req.seconds)?;
    state.manager.unlock_relay(handle, pulse).await?;
    Ok(success())
}

/// GET /devices/{handle}/data?tablename=T
pub async fn get_table(
    State(state): State<SharedState>,
    Path(handle): Path<String>,
    Query(query): Query<TableQuery>,
) -> ApiResult<Json<Vec<TableRow>>> {
    let handle = parse_handle(&handle)?;
    Ok(Json(state.manager.get_table(handle, query.tablename).await?))
}

/// POST /devices/{handle}/data
pub async fn set_table(
    State(state): State<SharedState>,
    Path(handle): Path<String>,
    Json(req): Json<SetTableRequest>,
) -> ApiResult<Json<Value>> {
    let handle = parse_handle(&handle)?;
    state.manager.set_table(handle, req.tablename, req.data).await?;
    Ok(success())
}

/// DELETE /devices/{handle}/data - Delete the rows matching a filter.
pub async fn delete_rows(
    State(state): State<SharedState>,
    Path(handle): Path<String>,
    Json(req): Json<DeleteRowsRequest>,
) -> ApiResult<Json<Value>> {
    let handle = parse_handle(&handle)?;
    let deleted = state
        .manager
        .delete_table_rows(handle, req.tablename, req.filter)
        .await?;
    Ok(Json(json!({ "status": "success", "deleted": deleted })))
}

/// DELETE /devices/{handle}/data/all - Empty every table.
pub async fn delete_all_rows(
    State(state): State<SharedState>,
    Path(handle): Path<String>,
) -> ApiResult<Json<Value>> {
    let handle = parse_handle(&handle)?;
    let deleted = state.manager.delete_all_table_rows(handle).await?;
    Ok(Json(json!({ "status": "success", "deleted": deleted })))
}

/// GET /devices/{handle}/users
pub async fn list_users(
    State(state): State<SharedState>,
    Path(handle): Path<String>,
) -> ApiResult<Json<Vec<User>>> {
    let handle = parse_handle(&handle)?;
    Ok(Json(state.manager.list_users(handle).await?))
}

/// POST /devices/{handle}/users
pub async fn add_users(
    State(state): State<SharedState>,
    Path(handle): Path<String>,
    Json(users): Json<Vec<User>>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let handle = parse_handle(&handle)?;
    for user in &users {
        user.validate()?;
    }
    let added = users.len();
    state.manager.add_users(handle, users).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "status": "success", "added": added })),
    ))
}

/// GET /devices/{handle}/users/{pin}
pub async fn get_user(
    State(state): State<SharedState>,
    Path((handle, pin)): Path<(String, String)>,
) -> ApiResult<Json<User>> {
    let handle = parse_handle(&handle)?;
    let pin = parse_pin(&pin)?;
    state
        .manager
        .get_user(handle, pin)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("No user with pin {pin}")))
}

/// PUT /devices/{handle}/users/{pin}
pub async fn update_user(
    State(state): State<SharedState>,
    Path((handle, pin)): Path<(String, String)>,
    Json(user): Json<User>,
) -> ApiResult<Json<Value>> {
    let handle = parse_handle(&handle)?;
    let pin = parse_pin(&pin)?;
    user.validate()?;
    state.manager.update_user(handle, pin, user).await?;
    Ok(success())
}

/// DELETE /devices/{handle}/users/{pin}
pub async fn delete_user(
    State(state): State<SharedState>,
    Path((handle, pin)): Path<(String, String)>,
) -> ApiResult<Json<Value>> {
    let handle = parse_handle(&handle)?;
    let pin = parse_pin(&pin)?;
    if state.manager.delete_user(handle, pin).await? {
        Ok(success())
    } else {
        Err(ApiError::NotFound(format!("No user with pin {pin}")))
    }
}
