//! Realtime log streaming over WebSocket.
//!
//! `GET /devices/{handle}/realtimelogs` upgrades to a WebSocket and sends one
//! JSON [`LogLine`](doorgate_driver::LogLine) per text frame. When the
//! session closes or the client falls too far behind, the server sends a
//! close frame whose reason says which. Closing the socket from the client
//! side detaches the subscription.

use axum::extract::ws::{CloseFrame, Message, WebSocket, close_code};
use axum::extract::{Path, State, WebSocketUpgrade};
use axum::response::Response;
use doorgate_session::{CloseReason, Subscription};
use futures::{SinkExt, StreamExt};
use tracing::{debug, error};

use crate::api::{ApiResult, parse_handle};
use crate::app_state::SharedState;

/// GET /devices/{handle}/realtimelogs - WebSocket log tail.
///
/// The subscription is taken before upgrading, so an unknown handle is
/// answered with a plain 400 error instead of a WebSocket.
pub async fn realtime_logs(
    ws: WebSocketUpgrade,
    State(state): State<SharedState>,
    Path(handle): Path<String>,
) -> ApiResult<Response> {
    let handle = parse_handle(&handle)?;
    let subscription = state.manager.subscribe(handle).await?;
    Ok(ws.on_upgrade(move |socket| forward_logs(socket, subscription)))
}

fn close_frame(reason: Option<CloseReason>) -> CloseFrame {
    let reason = match reason {
        Some(CloseReason::Lagged) => "subscriber lagged",
        Some(CloseReason::SessionClosed) => "session closed",
        Some(CloseReason::Detached) | None => "stream ended",
    };
    CloseFrame {
        code: close_code::NORMAL,
        reason: reason.into(),
    }
}

async fn forward_logs(socket: WebSocket, mut subscription: Subscription) {
    let handle = subscription.handle();
    let (mut sender, mut receiver) = socket.split();
    debug!(handle = %handle, "WebSocket log stream opened");

    loop {
        tokio::select! {
            line = subscription.recv() => {
                let Some(line) = line else {
                    let frame = close_frame(subscription.close_reason());
                    let _ = sender.send(Message::Close(Some(frame))).await;
                    break;
                };
                let json = match serde_json::to_string(&line) {
                    Ok(j) => j,
                    Err(e) => {
                        error!("Failed to serialize log line: {e}");
                        continue;
                    }
                };
                if sender.send(Message::Text(json.into())).await.is_err() {
                    break;
                }
            }
            msg = receiver.next() => match msg {
                Some(Ok(Message::Close(_))) | None => break,
                Some(Err(e)) => {
                    debug!(handle = %handle, error = %e, "WebSocket receive failed");
                    break;
                }
                // Client messages carry no meaning on this stream.
                Some(Ok(_)) => {}
            },
        }
    }

    debug!(handle = %handle, "WebSocket log stream closed");
}
