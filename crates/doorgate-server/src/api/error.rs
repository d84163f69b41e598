use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use doorgate_core::CoreError;
use doorgate_session::GatewayError;
use serde_json::json;

/// Error returned by API handlers.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        Self::BadRequest(err.to_string())
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Gateway(err) if err.is_client_error() => StatusCode::BAD_REQUEST,
            Self::Gateway(_) => StatusCode::BAD_GATEWAY,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("request failed: {}", self);
        }
        (
            status,
            Json(json!({ "status": "error", "message": self.to_string() })),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use doorgate_core::Handle;
    use rstest::rstest;

    #[rstest]
    #[case(ApiError::Gateway(GatewayError::DeviceNotConnected(Handle::new(3).unwrap())), 400)]
    #[case(ApiError::Gateway(GatewayError::ConnectionFailed("offline".into())), 400)]
    #[case(ApiError::Gateway(GatewayError::Driver { code: -14, message: "pw".into() }), 400)]
    #[case(ApiError::Gateway(GatewayError::ContractViolation("zero".into())), 502)]
    #[case(ApiError::BadRequest("bad".into()), 400)]
    #[case(ApiError::NotFound("missing".into()), 404)]
    fn status_mapping(#[case] err: ApiError, #[case] expected: u16) {
        assert_eq!(err.status().as_u16(), expected);
    }

    #[tokio::test]
    async fn body_carries_message() {
        let err = ApiError::Gateway(GatewayError::Driver {
            code: -14,
            message: "The communication password is not correct".into(),
        });
        let resp = err.into_response();
        let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], "error");
        assert_eq!(
            json["message"],
            "SDKError: The communication password is not correct (code -14)"
        );
    }
}
