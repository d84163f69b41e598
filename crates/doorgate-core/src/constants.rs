//! Constants shared by the gateway crates.
//!
//! Defaults mirror the factory settings of the ZK-family door controllers the
//! gateway fronts (C3/inBio panels). Keeping them here gives the HTTP layer,
//! the emulated controller, and the tests one source for every magic number.
//!
//! # Usage
//!
//! ```
//! use doorgate_core::constants::*;
//!
//! assert_eq!(DEFAULT_PORT, 4370);
//! assert!(MAX_RELAY_SECONDS >= u32::from(DEFAULT_UNLOCK_SECONDS));
//! ```

// ============================================================================
// Connection Defaults
// ============================================================================

/// Default transport protocol for a controller connection.
pub const DEFAULT_PROTOCOL: &str = "TCP";

/// Factory IP address of a freshly installed controller.
pub const DEFAULT_ADDRESS: &str = "192.168.10.201";

/// Default TCP port of the controller's pull interface.
pub const DEFAULT_PORT: u16 = 4370;

/// Default connection timeout in milliseconds.
///
/// # Examples
///
/// ```
/// use doorgate_core::constants::DEFAULT_TIMEOUT_MS;
/// use std::time::Duration;
///
/// let timeout = Duration::from_millis(DEFAULT_TIMEOUT_MS as u64);
/// assert_eq!(timeout.as_secs(), 4);
/// ```
pub const DEFAULT_TIMEOUT_MS: u32 = 4000;

// ============================================================================
// Relay Control
// ============================================================================

/// Relay switched by the "test relay unlock" operation (door 1 lock relay).
pub const DEFAULT_UNLOCK_RELAY: u8 = 1;

/// Seconds the lock relay stays energized during a test unlock.
pub const DEFAULT_UNLOCK_SECONDS: u8 = 5;

/// Shortest relay activation the controller accepts.
pub const MIN_RELAY_SECONDS: u32 = 1;

/// Longest relay activation the controller accepts (single byte on the wire).
pub const MAX_RELAY_SECONDS: u32 = 255;

// ============================================================================
// Table Access
// ============================================================================

/// Upper bound of rows fetched per table by bulk operations.
///
/// Controller tables are bounded by device memory, so this caps the number of
/// driver round-trips a delete-all can issue.
pub const MAX_ROWS_PER_TABLE: usize = 10_000;

// ============================================================================
// Realtime Log
// ============================================================================

/// Default number of bytes requested per realtime log fetch.
pub const DEFAULT_LOG_CHUNK_BYTES: usize = 4096;

/// Timestamp format used by realtime log records.
pub const LOG_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Number of comma separated fields in a realtime log record.
pub const LOG_FIELD_COUNT: usize = 7;
