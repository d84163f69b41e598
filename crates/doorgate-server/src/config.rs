//! Gateway configuration from environment variables.

use doorgate_session::StreamerConfig;
use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_BIND: &str = "127.0.0.1:8000";

/// Errors that can occur during configuration loading.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("DOORGATE_BIND is not a valid socket address: {0}")]
    InvalidBind(String),

    #[error("{name} must be a positive integer, got {value:?}")]
    InvalidNumber { name: &'static str, value: String },
}

/// Gateway configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayConfig {
    pub bind: SocketAddr,
    pub streamer: StreamerConfig,
}

impl GatewayConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// Environment variables:
    /// - DOORGATE_BIND: socket address to bind (default: 127.0.0.1:8000)
    /// - DOORGATE_POLL_INTERVAL_MS: delay between log fetches (default: 500)
    /// - DOORGATE_MAX_BACKOFF_MS: ceiling for fetch retry delay (default: 8000)
    /// - DOORGATE_LOG_CHUNK_BYTES: bytes requested per log fetch (default: 4096)
    /// - DOORGATE_SUBSCRIBER_CAPACITY: lines buffered per subscriber (default: 256)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let bind_str = lookup("DOORGATE_BIND").unwrap_or_else(|| DEFAULT_BIND.to_string());
        let bind: SocketAddr = bind_str
            .parse()
            .map_err(|_| ConfigError::InvalidBind(bind_str))?;

        let defaults = StreamerConfig::default();
        let number = |name: &'static str, default: u64| -> Result<u64, ConfigError> {
            match lookup(name) {
                None => Ok(default),
                Some(value) => match value.trim().parse::<u64>() {
                    Ok(n) if n > 0 => Ok(n),
                    _ => Err(ConfigError::InvalidNumber { name, value }),
                },
            }
        };

        let streamer = StreamerConfig {
            poll_interval: Duration::from_millis(number(
                "DOORGATE_POLL_INTERVAL_MS",
                defaults.poll_interval.as_millis() as u64,
            )?),
            max_backoff: Duration::from_millis(number(
                "DOORGATE_MAX_BACKOFF_MS",
                defaults.max_backoff.as_millis() as u64,
            )?),
            chunk_size: number("DOORGATE_LOG_CHUNK_BYTES", defaults.chunk_size as u64)? as usize,
            subscriber_capacity: number(
                "DOORGATE_SUBSCRIBER_CAPACITY",
                defaults.subscriber_capacity as u64,
            )? as usize,
        };

        Ok(Self { bind, streamer })
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 8000)),
            streamer: StreamerConfig::default(),
        }
    }
}
