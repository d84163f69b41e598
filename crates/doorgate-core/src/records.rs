//! Controller table records.
//!
//! Every field stored on a controller is textual, so a [`TableRow`] is an
//! ordered map of field name to string value. [`User`] is the typed view of a
//! row of the `user` table; its JSON field names match the controller's
//! column names.

use crate::{Result, error::CoreError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One row of a controller table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TableRow(BTreeMap<String, String>);

impl TableRow {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style field insertion.
    #[must_use]
    pub fn with(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(field.into(), value.into());
        self
    }

    #[must_use]
    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// True when every field of `filter` is present here with the same value.
    ///
    /// An empty filter matches every row.
    #[must_use]
    pub fn matches(&self, filter: &TableRow) -> bool {
        filter
            .fields()
            .all(|(field, value)| self.get(field) == Some(value))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for TableRow {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        TableRow(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// A controller user record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct User {
    #[serde(default)]
    pub card_no: String,
    pub pin: String,
    #[serde(default)]
    pub password: String,
    #[serde(default = "zero")]
    pub group: String,
    #[serde(default = "zero")]
    pub start_time: String,
    #[serde(default = "zero")]
    pub end_time: String,
    #[serde(default = "zero")]
    pub super_authorize: String,
}

fn zero() -> String {
    "0".to_string()
}

const USER_TABLE: &str = "user";

impl User {
    /// A user with only a pin and card number set.
    #[must_use]
    pub fn new(pin: impl Into<String>, card_no: impl Into<String>) -> Self {
        User {
            card_no: card_no.into(),
            pin: pin.into(),
            password: String::new(),
            group: zero(),
            start_time: zero(),
            end_time: zero(),
            super_authorize: zero(),
        }
    }

    /// Reject records the controller would refuse.
    ///
    /// # Errors
    /// `Pin` must be a non-empty decimal number and `CardNo`, when present,
    /// must be decimal as well.
    pub fn validate(&self) -> Result<()> {
        validate_pin(&self.pin)?;
        if !self.card_no.is_empty() && !self.card_no.bytes().all(|b| b.is_ascii_digit()) {
            return Err(CoreError::InvalidField {
                field: "CardNo",
                value: self.card_no.clone(),
            });
        }
        Ok(())
    }

    #[must_use]
    pub fn to_row(&self) -> TableRow {
        TableRow::new()
            .with("CardNo", &self.card_no)
            .with("Pin", &self.pin)
            .with("Password", &self.password)
            .with("Group", &self.group)
            .with("StartTime", &self.start_time)
            .with("EndTime", &self.end_time)
            .with("SuperAuthorize", &self.super_authorize)
    }

    /// Read a user out of a `user` table row.
    ///
    /// # Errors
    /// Returns `CoreError::MissingField` when the row has no `Pin`.
    pub fn from_row(row: &TableRow) -> Result<Self> {
        let pin = row.get("Pin").ok_or(CoreError::MissingField {
            table: USER_TABLE,
            field: "Pin",
        })?;
        let field = |name: &str, default: &str| row.get(name).unwrap_or(default).to_string();
        Ok(User {
            card_no: field("CardNo", ""),
            pin: pin.to_string(),
            password: field("Password", ""),
            group: field("Group", "0"),
            start_time: field("StartTime", "0"),
            end_time: field("EndTime", "0"),
            super_authorize: field("SuperAuthorize", "0"),
        })
    }
}

/// Check a user pin as used in paths and filters.
///
/// # Errors
/// Returns `CoreError::InvalidField` unless `pin` is a non-empty decimal number.
pub fn validate_pin(pin: &str) -> Result<()> {
    if pin.is_empty() || !pin.bytes().all(|b| b.is_ascii_digit()) {
        return Err(CoreError::InvalidField {
            field: "Pin",
            value: pin.to_string(),
        });
    }
    Ok(())
}
