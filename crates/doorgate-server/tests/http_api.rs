//! HTTP API tests driven through the router with `oneshot`.

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use doorgate_driver::mock::{MockConnector, MockControllerHandle};
use doorgate_driver::DriverError;
use doorgate_server::{AppState, SharedState, create_router};
use doorgate_session::StreamerConfig;
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt;

struct TestGateway {
    state: SharedState,
    connector: Arc<MockConnector>,
}

impl TestGateway {
    fn new() -> Self {
        let connector = Arc::new(MockConnector::new());
        let state = Arc::new(AppState::with_connector(
            connector.clone(),
            StreamerConfig::default(),
        ));
        Self { state, connector }
    }

    async fn request(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let req = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(serde_json::to_vec(&body).unwrap()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let resp = create_router(Arc::clone(&self.state))
            .oneshot(req)
            .await
            .unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }

    async fn connect(&self) -> u64 {
        let (status, json) = self
            .request(
                Method::POST,
                "/devices/connect",
                Some(json!({ "protocol": "TCP", "ip_address": "192.168.10.201", "port": 4370 })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "success");
        json["handle"].as_u64().unwrap()
    }

    fn controller(&self, handle: u64) -> MockControllerHandle {
        self.connector.controller(handle).unwrap()
    }
}

#[tokio::test]
async fn health_returns_ok() {
    let gw = TestGateway::new();
    let (status, json) = gw.request(Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert_eq!(json["version"], doorgate_core::VERSION);
}

#[tokio::test]
async fn connect_and_list_sessions() {
    let gw = TestGateway::new();
    let handle = gw.connect().await;

    let (status, json) = gw.request(Method::GET, "/devices", None).await;
    assert_eq!(status, StatusCode::OK);
    let sessions = json.as_array().unwrap();
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0]["handle"], handle);
    assert_eq!(sessions[0]["address"], "192.168.10.201");
    assert_eq!(sessions[0]["stream_state"], "idle");
    assert!(sessions[0]["uptime_secs"].as_i64().unwrap() >= 0);
    assert!(sessions[0].get("password").is_none());
}

#[tokio::test]
async fn connect_failure_is_reported() {
    let gw = TestGateway::new();
    gw.connector.mark_unreachable("10.0.0.250");

    let (status, json) = gw
        .request(
            Method::POST,
            "/devices/connect",
            Some(json!({ "address": "10.0.0.250" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["status"], "error");
    assert!(json["message"].as_str().unwrap().contains("-307"));
}

#[tokio::test]
async fn zero_handle_is_bad_gateway() {
    let gw = TestGateway::new();
    gw.connector.script_handles([0]);

    let (status, json) = gw
        .request(Method::POST, "/devices/connect", Some(json!({})))
        .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(json["status"], "error");
}

#[tokio::test]
async fn unknown_handle_is_rejected() {
    let gw = TestGateway::new();
    let (status, json) = gw.request(Method::POST, "/devices/999/restart", None).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        json["message"],
        "No connected device found with the handle: 999; maybe try /connect first?"
    );
}

#[tokio::test]
async fn malformed_handle_is_rejected() {
    let gw = TestGateway::new();
    for uri in ["/devices/abc/restart", "/devices/0/restart"] {
        let (status, json) = gw.request(Method::POST, uri, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["status"], "error");
    }
}

#[tokio::test]
async fn restart_and_relay_unlock() {
    let gw = TestGateway::new();
    let handle = gw.connect().await;

    let (status, _) = gw
        .request(Method::POST, &format!("/devices/{handle}/restart"), None)
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = gw
        .request(Method::POST, &format!("/devices/{handle}/tests/relay/unlock"), None)
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = gw
        .request(
            Method::POST,
            &format!("/devices/{handle}/tests/relay/unlock"),
            Some(json!({ "relay": 2, "seconds": 10 })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = gw
        .request(
            Method::POST,
            &format!("/devices/{handle}/tests/relay/unlock"),
            Some(json!({ "seconds": 0 })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let controller = gw.controller(handle);
    assert_eq!(controller.restart_count(), 1);
    assert_eq!(controller.relay_activations(), vec![(1, 5), (2, 10)]);
}

#[tokio::test]
async fn driver_error_is_sdk_error() {
    let gw = TestGateway::new();
    let handle = gw.connect().await;
    gw.controller(handle).fail_next(DriverError::from_code(-14));

    let (status, json) = gw
        .request(Method::POST, &format!("/devices/{handle}/restart"), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        json["message"],
        "SDKError: The communication password is not correct (code -14)"
    );
}

#[tokio::test]
async fn user_lifecycle() {
    let gw = TestGateway::new();
    let handle = gw.connect().await;
    let users = format!("/devices/{handle}/users");

    let (status, json) = gw.request(Method::GET, &users, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, json!([]));

    let (status, _) = gw
        .request(
            Method::POST,
            &users,
            Some(json!([{
                "CardNo": "15540203", "Pin": "1", "Password": "123", "Group": "0",
                "StartTime": "0", "EndTime": "0", "SuperAuthorize": "1"
            }])),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, json) = gw.request(Method::GET, &format!("{users}/1"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["CardNo"], "15540203");
    assert_eq!(json["SuperAuthorize"], "1");

    let (status, _) = gw
        .request(
            Method::PUT,
            &format!("{users}/1"),
            Some(json!({ "Pin": "1", "CardNo": "999" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let (_, json) = gw.request(Method::GET, &format!("{users}/1"), None).await;
    assert_eq!(json["CardNo"], "999");

    let (status, _) = gw.request(Method::DELETE, &format!("{users}/1"), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = gw.request(Method::DELETE, &format!("{users}/1"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, json) = gw.request(Method::GET, &format!("{users}/1"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["status"], "error");
}

#[tokio::test]
async fn invalid_user_is_rejected() {
    let gw = TestGateway::new();
    let handle = gw.connect().await;

    let (status, _) = gw
        .request(
            Method::POST,
            &format!("/devices/{handle}/users"),
            Some(json!([{ "Pin": "x1" }])),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = gw
        .request(Method::GET, &format!("/devices/{handle}/users/abc"), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn table_data_round_trip() {
    let gw = TestGateway::new();
    let handle = gw.connect().await;
    let data = format!("/devices/{handle}/data");

    let (status, _) = gw
        .request(
            Method::POST,
            &data,
            Some(json!({
                "tablename": "holiday",
                "data": [
                    { "Holiday": "20240101", "HolidayType": "1", "Loop": "1" },
                    { "Holiday": "20240501", "HolidayType": "2", "Loop": "1" }
                ]
            })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, json) = gw
        .request(Method::GET, &format!("{data}?tablename=holiday"), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json.as_array().unwrap().len(), 2);
    assert_eq!(json[0]["Holiday"], "20240101");

    let (status, json) = gw
        .request(
            Method::DELETE,
            &data,
            Some(json!({ "tablename": "holiday", "filter": { "HolidayType": "2" } })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["deleted"], 1);

    let (status, json) = gw
        .request(Method::DELETE, &format!("{data}/all"), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["deleted"], 1);
}

#[tokio::test]
async fn disconnect_is_idempotent() {
    let gw = TestGateway::new();
    let handle = gw.connect().await;
    let uri = format!("/devices/{handle}/disconnect");

    let (status, json) = gw.request(Method::POST, &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["disconnected"], true);
    assert!(gw.controller(handle).is_closed());

    let (status, json) = gw.request(Method::POST, &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["disconnected"], false);

    let (status, _) = gw
        .request(Method::GET, &format!("/devices/{handle}/users"), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn disconnect_of_zero_or_unknown_handle_is_noop() {
    let gw = TestGateway::new();
    for uri in ["/devices/0/disconnect", "/devices/999/disconnect"] {
        let (status, json) = gw.request(Method::POST, uri, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["disconnected"], false);
    }

    let (status, json) = gw.request(Method::POST, "/devices/abc/disconnect", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["status"], "error");
}
