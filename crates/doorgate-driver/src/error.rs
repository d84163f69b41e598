//! Error type reported by controller drivers.
//!
//! Controller SDKs report failures as a negative integer code plus an
//! optional message. [`DriverError`] keeps both verbatim so the gateway can
//! hand them to API callers unchanged. Codes the SDK documents are described
//! by [`describe_code`].

/// Result type alias for driver operations.
pub type Result<T> = std::result::Result<T, DriverError>;

/// SDK error code for an unsupported command.
pub const CODE_UNSUPPORTED: i32 = -1;
/// SDK error code for a command that ran past its timeout.
pub const CODE_TIMEOUT: i32 = -2;
/// SDK error code for a caller buffer that is too small.
pub const CODE_BUFFER_TOO_SMALL: i32 = -4;
/// SDK error code for a wrong communication password.
pub const CODE_BAD_PASSWORD: i32 = -14;
/// SDK error code for a field missing from a table definition.
pub const CODE_UNKNOWN_FIELD: i32 = -101;
/// SDK error code for an invalid argument.
pub const CODE_INVALID_PARAMETER: i32 = -105;
/// SDK error code for a failed connection attempt.
pub const CODE_CONNECT_FAILED: i32 = -307;
/// Code used when a call is issued on a connection that is already closed.
pub const CODE_NOT_CONNECTED: i32 = -10054;

/// Error returned by a driver call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message} (code {code})")]
pub struct DriverError {
    /// Raw SDK error code.
    pub code: i32,
    /// Human-readable description.
    pub message: String,
}

impl DriverError {
    /// Create an error with an explicit message.
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Create an error whose message is the SDK's description of `code`.
    pub fn from_code(code: i32) -> Self {
        Self::new(code, describe_code(code))
    }

    /// Connection could not be established.
    pub fn connect_failed(message: impl Into<String>) -> Self {
        Self::new(CODE_CONNECT_FAILED, message)
    }

    /// The connection backing this driver is closed.
    pub fn not_connected() -> Self {
        Self::from_code(CODE_NOT_CONNECTED)
    }

    /// An argument was rejected before reaching the device.
    pub fn invalid_parameter(message: impl Into<String>) -> Self {
        Self::new(CODE_INVALID_PARAMETER, message)
    }
}

/// Describe a controller SDK error code.
///
/// Unknown codes get a generic description that still carries the number.
pub fn describe_code(code: i32) -> String {
    let text = match code {
        CODE_UNSUPPORTED => "The command is not supported",
        CODE_TIMEOUT => "The command execution time exceeds the specified time",
        -3 => "The data in the buffer is not as required",
        CODE_BUFFER_TOO_SMALL => "The buffer space is not sufficient",
        -5 => "Error in reading data",
        -6 => "Error in writing data",
        -7 => "Failed to read the data",
        -8 => "Failed to write the data",
        -12 => "Failed to obtain the system error",
        -13 => "Connection was reset by the device",
        CODE_BAD_PASSWORD => "The communication password is not correct",
        -99 => "Unknown error",
        -100 => "The table structure does not exist",
        CODE_UNKNOWN_FIELD => "The specified field does not exist in the table structure",
        -102 => "The total number of fields is not consistent",
        -103 => "The database sorting is in error",
        -104 => "Memory allocation failed",
        CODE_INVALID_PARAMETER => "The parameter is invalid",
        -201 => "The library cannot be loaded",
        -203 => "Failed to call the library",
        -301 => "Failed to get the TCP/IP version",
        -302 => "Incorrect TCP/IP version number",
        -303 => "Failed to create the socket",
        -304 => "Failed to connect the socket",
        -305 => "Failed to bind the socket",
        -306 => "The socket is not listening",
        CODE_CONNECT_FAILED => "Connection attempt failed",
        CODE_NOT_CONNECTED => "Connection was closed",
        _ => return format!("Unknown SDK error {code}"),
    };
    text.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(-14, "The communication password is not correct")]
    #[case(-307, "Connection attempt failed")]
    #[case(-2, "The command execution time exceeds the specified time")]
    fn test_known_codes(#[case] code: i32, #[case] expected: &str) {
        assert_eq!(describe_code(code), expected);
        assert_eq!(DriverError::from_code(code).message, expected);
    }

    #[test]
    fn test_unknown_code_keeps_number() {
        assert_eq!(describe_code(-4242), "Unknown SDK error -4242");
    }

    #[test]
    fn test_display_carries_code() {
        let err = DriverError::new(-14, "bad password");
        assert_eq!(err.to_string(), "bad password (code -14)");
    }
}
