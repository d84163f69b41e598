use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    // Connection parameter errors
    #[error("Invalid connection parameters: {0}")]
    InvalidParameters(String),

    #[error("Unknown protocol: {0}")]
    UnknownProtocol(String),

    // Identifier errors
    #[error("Invalid handle: {0}")]
    InvalidHandle(String),

    #[error("Unknown table name: {0}")]
    UnknownTable(String),

    // Record errors
    #[error("Missing field {field} in {table} row")]
    MissingField { table: &'static str, field: &'static str },

    #[error("Invalid value for {field}: {value}")]
    InvalidField { field: &'static str, value: String },

    #[error("Relay duration must be 1-255 seconds, got {0}")]
    InvalidRelayDuration(u32),
}

pub type Result<T> = std::result::Result<T, CoreError>;
