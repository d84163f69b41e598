use crate::{
    Result,
    constants::{DEFAULT_ADDRESS, DEFAULT_PORT, DEFAULT_TIMEOUT_MS, MAX_RELAY_SECONDS, MIN_RELAY_SECONDS},
    error::CoreError,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Session handle assigned by the controller driver at connect time.
///
/// Handles are opaque to callers. Zero is never a valid handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Handle(u64);

impl Handle {
    /// Wrap a raw driver handle.
    ///
    /// # Errors
    /// Returns `CoreError::InvalidHandle` for zero.
    pub fn new(raw: u64) -> Result<Self> {
        if raw == 0 {
            return Err(CoreError::InvalidHandle("handle must be non-zero".to_string()));
        }
        Ok(Handle(raw))
    }

    #[must_use]
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for Handle {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        let raw: u64 = s
            .trim()
            .parse()
            .map_err(|_| CoreError::InvalidHandle(s.to_string()))?;
        Handle::new(raw)
    }
}

/// Link used to reach a controller.
///
/// Deserializes case-insensitively; serializes as `"TCP"` or `"RS485"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String")]
pub enum Protocol {
    #[default]
    #[serde(rename = "TCP")]
    Tcp,
    #[serde(rename = "RS485")]
    Rs485,
}

impl Protocol {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Tcp => "TCP",
            Protocol::Rs485 => "RS485",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Protocol {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "TCP" => Ok(Protocol::Tcp),
            "RS485" => Ok(Protocol::Rs485),
            _ => Err(CoreError::UnknownProtocol(s.to_string())),
        }
    }
}

impl TryFrom<String> for Protocol {
    type Error = CoreError;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

/// Parameters used to open a controller connection.
///
/// Accepts the legacy JSON field names `ip_address` and `passwd`. The
/// password is never serialized and is redacted from `Debug` output.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionParameters {
    pub protocol: Protocol,
    #[serde(alias = "ip_address")]
    pub address: String,
    pub port: u16,
    /// Timeout in milliseconds.
    pub timeout: u32,
    #[serde(alias = "passwd", skip_serializing)]
    pub password: String,
}

impl Default for ConnectionParameters {
    fn default() -> Self {
        Self {
            protocol: Protocol::Tcp,
            address: DEFAULT_ADDRESS.to_string(),
            port: DEFAULT_PORT,
            timeout: DEFAULT_TIMEOUT_MS,
            password: String::new(),
        }
    }
}

impl ConnectionParameters {
    /// TCP parameters for `address:port` with default timeout and no password.
    #[must_use]
    pub fn tcp(address: impl Into<String>, port: u16) -> Self {
        Self {
            address: address.into(),
            port,
            ..Self::default()
        }
    }

    /// Check the invariants a driver relies on.
    ///
    /// # Errors
    /// Returns `CoreError::InvalidParameters` for an empty address, a zero
    /// port, or a zero timeout.
    pub fn validate(&self) -> Result<()> {
        if self.address.trim().is_empty() {
            return Err(CoreError::InvalidParameters("address must not be empty".to_string()));
        }
        if self.port == 0 {
            return Err(CoreError::InvalidParameters("port must be positive".to_string()));
        }
        if self.timeout == 0 {
            return Err(CoreError::InvalidParameters("timeout must be positive".to_string()));
        }
        Ok(())
    }

    /// Password-free view suitable for logs and listings.
    #[must_use]
    pub fn summary(&self) -> ConnectionSummary {
        ConnectionSummary {
            protocol: self.protocol,
            address: self.address.clone(),
            port: self.port,
        }
    }
}

impl fmt::Debug for ConnectionParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionParameters")
            .field("protocol", &self.protocol)
            .field("address", &self.address)
            .field("port", &self.port)
            .field("timeout", &self.timeout)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Where a session is connected, without credentials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionSummary {
    pub protocol: Protocol,
    pub address: String,
    pub port: u16,
}

impl fmt::Display for ConnectionSummary {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}://{}:{}", self.protocol, self.address, self.port)
    }
}

/// Controller data tables.
///
/// Table names are matched case-insensitively on input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum TableName {
    User,
    UserAuthorize,
    Holiday,
    Timezone,
    Transaction,
    FirstCard,
    MultimCard,
    InOutFun,
    TemplateV10,
}

impl TableName {
    /// Every table, in the order bulk operations visit them.
    pub const ALL: [TableName; 9] = [
        TableName::User,
        TableName::UserAuthorize,
        TableName::Holiday,
        TableName::Timezone,
        TableName::Transaction,
        TableName::FirstCard,
        TableName::MultimCard,
        TableName::InOutFun,
        TableName::TemplateV10,
    ];

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            TableName::User => "user",
            TableName::UserAuthorize => "userauthorize",
            TableName::Holiday => "holiday",
            TableName::Timezone => "timezone",
            TableName::Transaction => "transaction",
            TableName::FirstCard => "firstcard",
            TableName::MultimCard => "multimcard",
            TableName::InOutFun => "inoutfun",
            TableName::TemplateV10 => "templatev10",
        }
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TableName {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        let lower = s.trim().to_ascii_lowercase();
        TableName::ALL
            .into_iter()
            .find(|t| t.as_str() == lower)
            .ok_or_else(|| CoreError::UnknownTable(s.to_string()))
    }
}

impl TryFrom<String> for TableName {
    type Error = CoreError;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

/// Relay activation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelayPulse {
    relay: u8,
    seconds: u8,
}

impl RelayPulse {
    /// # Errors
    /// Returns `CoreError::InvalidRelayDuration` when `seconds` is outside 1-255.
    pub fn new(relay: u8, seconds: u32) -> Result<Self> {
        if !(MIN_RELAY_SECONDS..=MAX_RELAY_SECONDS).contains(&seconds) {
            return Err(CoreError::InvalidRelayDuration(seconds));
        }
        Ok(RelayPulse {
            relay,
            seconds: seconds as u8,
        })
    }

    #[must_use]
    pub fn relay(&self) -> u8 {
        self.relay
    }

    #[must_use]
    pub fn seconds(&self) -> u8 {
        self.seconds
    }
}

impl Default for RelayPulse {
    fn default() -> Self {
        RelayPulse {
            relay: crate::constants::DEFAULT_UNLOCK_RELAY,
            seconds: crate::constants::DEFAULT_UNLOCK_SECONDS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("1", 1)]
    #[case("234124", 234124)]
    #[case(" 42 ", 42)]
    fn test_handle_valid(#[case] input: &str, #[case] expected: u64) {
        let handle: Handle = input.parse().unwrap();
        assert_eq!(handle.as_u64(), expected);
    }

    #[rstest]
    #[case("0")]
    #[case("-5")]
    #[case("abc")]
    #[case("")]
    fn test_handle_invalid(#[case] input: &str) {
        let result: Result<Handle> = input.parse();
        assert!(matches!(result, Err(CoreError::InvalidHandle(_))));
    }

    #[test]
    fn test_handle_serializes_as_number() {
        let handle = Handle::new(77).unwrap();
        assert_eq!(serde_json::to_string(&handle).unwrap(), "77");
    }

    #[test]
    fn test_default_parameters() {
        let params = ConnectionParameters::default();
        assert_eq!(params.protocol, Protocol::Tcp);
        assert_eq!(params.address, "192.168.10.201");
        assert_eq!(params.port, 4370);
        assert_eq!(params.timeout, 4000);
        assert!(params.password.is_empty());
        assert!(params.validate().is_ok());
    }

    #[test]
    fn test_parameters_accept_legacy_field_names() {
        let json = r#"{"protocol":"TCP","ip_address":"10.1.1.1","port":4370,"passwd":"x"}"#;
        let params: ConnectionParameters = serde_json::from_str(json).unwrap();
        assert_eq!(params.address, "10.1.1.1");
        assert_eq!(params.password, "x");
        assert_eq!(params.timeout, 4000);
    }

    #[test]
    fn test_password_never_leaks() {
        let mut params = ConnectionParameters::default();
        params.password = "hunter2".to_string();
        let json = serde_json::to_string(&params).unwrap();
        let debug = format!("{params:?}");
        assert!(!json.contains("hunter2"));
        assert!(!debug.contains("hunter2"));
    }

    #[rstest]
    #[case(ConnectionParameters::tcp("", 4370))]
    #[case(ConnectionParameters::tcp("   ", 4370))]
    #[case(ConnectionParameters::tcp("10.0.0.1", 0))]
    #[case(ConnectionParameters { timeout: 0, ..ConnectionParameters::default() })]
    fn test_parameters_invalid(#[case] params: ConnectionParameters) {
        assert!(matches!(params.validate(), Err(CoreError::InvalidParameters(_))));
    }

    #[rstest]
    #[case("tcp", Protocol::Tcp)]
    #[case("RS485", Protocol::Rs485)]
    fn test_protocol_parse(#[case] input: &str, #[case] expected: Protocol) {
        assert_eq!(input.parse::<Protocol>().unwrap(), expected);
    }

    #[test]
    fn test_unknown_protocol() {
        assert!(matches!("udp".parse::<Protocol>(), Err(CoreError::UnknownProtocol(_))));
        assert!(serde_json::from_str::<Protocol>(r#""udp""#).is_err());
    }

    #[test]
    fn test_parameters_protocol_any_case() {
        let params: ConnectionParameters = serde_json::from_str(r#"{"protocol":"rs485"}"#).unwrap();
        assert_eq!(params.protocol, Protocol::Rs485);
        assert!(serde_json::to_string(&params).unwrap().contains(r#""protocol":"RS485""#));
    }

    #[rstest]
    #[case("user", TableName::User)]
    #[case("USERAUTHORIZE", TableName::UserAuthorize)]
    #[case("templatev10", TableName::TemplateV10)]
    #[case("inoutfun", TableName::InOutFun)]
    fn test_table_name_parse(#[case] input: &str, #[case] expected: TableName) {
        assert_eq!(input.parse::<TableName>().unwrap(), expected);
    }

    #[test]
    fn test_table_name_wire_form_matches_display() {
        for table in TableName::ALL {
            let json = serde_json::to_string(&table).unwrap();
            assert_eq!(json, format!("\"{table}\""));
        }
    }

    #[test]
    fn test_table_name_unknown() {
        assert!(matches!("doors".parse::<TableName>(), Err(CoreError::UnknownTable(_))));
        assert!(serde_json::from_str::<TableName>(r#""doors""#).is_err());
    }

    #[rstest]
    #[case(r#""Holiday""#, TableName::Holiday)]
    #[case(r#""firstcard""#, TableName::FirstCard)]
    fn test_table_name_deserialize_any_case(#[case] json: &str, #[case] expected: TableName) {
        assert_eq!(serde_json::from_str::<TableName>(json).unwrap(), expected);
    }

    #[rstest]
    #[case(1)]
    #[case(5)]
    #[case(255)]
    fn test_relay_pulse_valid(#[case] seconds: u32) {
        let pulse = RelayPulse::new(1, seconds).unwrap();
        assert_eq!(u32::from(pulse.seconds()), seconds);
    }

    #[rstest]
    #[case(0)]
    #[case(256)]
    fn test_relay_pulse_invalid(#[case] seconds: u32) {
        assert_eq!(
            RelayPulse::new(1, seconds),
            Err(CoreError::InvalidRelayDuration(seconds))
        );
    }

    #[test]
    fn test_relay_pulse_default() {
        let pulse = RelayPulse::default();
        assert_eq!((pulse.relay(), pulse.seconds()), (1, 5));
    }
}
