//! Driver boundary.
//!
//! A [`Driver`] is bound to one open controller connection. Every method is
//! synchronous and may block for up to the connection timeout, so callers on
//! an async runtime run them on a blocking thread. Implementations must be
//! `Send + Sync`: one caller may be issuing a command while another is
//! fetching the realtime log on the same connection.
//!
//! A [`Connector`] opens drivers and reports the raw handle the SDK assigned
//! to the connection.

use crate::error::Result;
use bytes::Bytes;
use doorgate_core::{ConnectionParameters, TableName, TableRow, User};
use std::sync::Arc;

/// Operations available on one open controller connection.
pub trait Driver: Send + Sync {
    /// Close the connection. Closing twice is not an error.
    fn close(&self) -> Result<()>;

    /// Reboot the controller.
    fn restart(&self) -> Result<()>;

    /// Energize `relay` for `seconds`.
    fn switch_relay(&self, relay: u8, seconds: u8) -> Result<()>;

    /// Read every row of a table.
    fn get_table(&self, table: TableName) -> Result<Vec<TableRow>>;

    /// Insert or replace rows of a table.
    fn set_table(&self, table: TableName, rows: &[TableRow]) -> Result<()>;

    /// Delete the rows matching `filter`, returning how many were removed.
    fn delete_rows(&self, table: TableName, filter: &TableRow) -> Result<usize>;

    fn get_user(&self, pin: &str) -> Result<Option<User>>;

    fn list_users(&self) -> Result<Vec<User>>;

    fn add_users(&self, users: &[User]) -> Result<()>;

    /// Replace the user stored under `pin`.
    fn update_user(&self, pin: &str, user: &User) -> Result<()>;

    /// Delete the user stored under `pin`, returning whether it existed.
    fn delete_user(&self, pin: &str) -> Result<bool>;

    /// Fetch the next batch of realtime log records.
    ///
    /// Returns at most `max_bytes` bytes of whole, newline separated records.
    /// An empty chunk means no new events. A record that cannot fit in
    /// `max_bytes` fails with `CODE_BUFFER_TOO_SMALL` and is not consumed.
    fn fetch_log_chunk(&self, max_bytes: usize) -> Result<Bytes>;
}

/// Opens drivers.
pub trait Connector: Send + Sync {
    /// Open a connection, returning the SDK handle and the bound driver.
    fn open(&self, params: &ConnectionParameters) -> Result<(u64, Arc<dyn Driver>)>;
}
