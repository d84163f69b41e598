//! Session failures and their translation into gateway error kinds.
//!
//! Sessions return [`SessionError`] and pass driver failures through
//! untouched. The handle-addressed command API converts everything into the
//! closed set of [`GatewayError`] kinds that API callers see.

use doorgate_core::{CoreError, Handle};
use doorgate_driver::DriverError;
use thiserror::Error;

/// Failure of a command issued on a [`Session`](crate::Session).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error(transparent)]
    Driver(#[from] DriverError),

    /// The blocking driver call panicked or was cancelled.
    #[error("Driver call aborted: {0}")]
    Aborted(String),

    /// The session was disconnected or replaced.
    #[error("Session is closed")]
    Closed,
}

/// Error kinds reported to gateway callers.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    #[error("No connected device found with the handle: {0}; maybe try /connect first?")]
    DeviceNotConnected(Handle),

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("SDKError: {message} (code {code})")]
    Driver { code: i32, message: String },

    #[error("Contract violation: {0}")]
    ContractViolation(String),
}

impl GatewayError {
    /// Translate a session failure for the session bound to `handle`.
    pub fn from_session(handle: Handle, err: SessionError) -> Self {
        match err {
            SessionError::Driver(e) => e.into(),
            SessionError::Closed => Self::DeviceNotConnected(handle),
            SessionError::Aborted(detail) => Self::ContractViolation(detail),
        }
    }

    /// Translate a failure to open a connection.
    pub fn connection_failed(err: impl std::fmt::Display) -> Self {
        Self::ConnectionFailed(err.to_string())
    }

    /// Whether the caller can fix the request (as opposed to a gateway fault).
    pub fn is_client_error(&self) -> bool {
        !matches!(self, Self::ContractViolation(_))
    }
}

impl From<DriverError> for GatewayError {
    fn from(err: DriverError) -> Self {
        Self::Driver {
            code: err.code,
            message: err.message,
        }
    }
}

impl From<CoreError> for GatewayError {
    fn from(err: CoreError) -> Self {
        Self::ConnectionFailed(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, GatewayError>;

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn handle(raw: u64) -> Handle {
        Handle::new(raw).unwrap()
    }

    #[test]
    fn test_device_not_connected_message() {
        let err = GatewayError::DeviceNotConnected(handle(999));
        assert_eq!(
            err.to_string(),
            "No connected device found with the handle: 999; maybe try /connect first?"
        );
    }

    #[test]
    fn test_driver_error_kept_verbatim() {
        let err: GatewayError = DriverError::new(-14, "bad password").into();
        assert_eq!(
            err,
            GatewayError::Driver {
                code: -14,
                message: "bad password".to_string()
            }
        );
        assert_eq!(err.to_string(), "SDKError: bad password (code -14)");
    }

    #[rstest]
    #[case(SessionError::Closed, GatewayError::DeviceNotConnected(handle(5)))]
    #[case(
        SessionError::Driver(DriverError::new(-2, "timeout")),
        GatewayError::Driver { code: -2, message: "timeout".to_string() }
    )]
    #[case(
        SessionError::Aborted("panicked".to_string()),
        GatewayError::ContractViolation("panicked".to_string())
    )]
    fn test_session_translation(#[case] input: SessionError, #[case] expected: GatewayError) {
        assert_eq!(GatewayError::from_session(handle(5), input), expected);
    }

    #[test]
    fn test_invalid_parameters_fail_connection() {
        let err: GatewayError = CoreError::InvalidParameters("port must be positive".into()).into();
        assert!(matches!(err, GatewayError::ConnectionFailed(_)));
        assert!(err.is_client_error());
        assert!(!GatewayError::ContractViolation("x".into()).is_client_error());
    }
}
