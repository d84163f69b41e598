//! Realtime event log records.
//!
//! Controllers report door events as newline separated text records:
//!
//! ```text
//! 2024-03-18 08:15:02,1,15540203,1,0,0,4
//! ```
//!
//! The fields are time, pin, card number, door, event type, entry/exit flag,
//! and verify mode. Each fetch returns whole records, so a chunk can be split
//! into lines without carrying state between fetches.

use chrono::NaiveDateTime;
use doorgate_core::constants::{LOG_FIELD_COUNT, LOG_TIME_FORMAT};
use serde::{Deserialize, Serialize};

/// One realtime log record as delivered to subscribers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogLine {
    /// Record text exactly as the controller sent it, without the line ending.
    pub raw: String,
    /// Parsed event, when the record has the expected shape.
    pub event: Option<DeviceEvent>,
}

impl LogLine {
    pub fn parse(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let event = DeviceEvent::parse(&raw);
        LogLine { raw, event }
    }
}

/// Structured view of a realtime log record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceEvent {
    pub time: NaiveDateTime,
    pub pin: String,
    pub card: String,
    pub door: u8,
    pub event_type: u16,
    pub entry_exit: u8,
    pub verify_mode: u8,
}

impl DeviceEvent {
    /// Parse a record, returning `None` when any field is malformed.
    pub fn parse(line: &str) -> Option<Self> {
        let fields: Vec<&str> = line.split(',').map(str::trim).collect();
        if fields.len() != LOG_FIELD_COUNT {
            return None;
        }

        Some(DeviceEvent {
            time: NaiveDateTime::parse_from_str(fields[0], LOG_TIME_FORMAT).ok()?,
            pin: fields[1].to_string(),
            card: fields[2].to_string(),
            door: fields[3].parse().ok()?,
            event_type: fields[4].parse().ok()?,
            entry_exit: fields[5].parse().ok()?,
            verify_mode: fields[6].parse().ok()?,
        })
    }
}

/// Split a fetched chunk into log lines.
///
/// Accepts `\r\n` and `\n` line endings and skips blank lines. Invalid UTF-8
/// is replaced rather than rejected.
pub fn split_chunk(chunk: &[u8]) -> Vec<LogLine> {
    String::from_utf8_lossy(chunk)
        .split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .filter(|line| !line.trim().is_empty())
        .map(LogLine::parse)
        .collect()
}
