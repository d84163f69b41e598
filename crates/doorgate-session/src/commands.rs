//! Handle-addressed command API.
//!
//! Each operation looks the session up, forwards to it, and translates any
//! failure into a [`GatewayError`]. Transports call these and never see
//! driver or session error types.

use crate::error::{GatewayError, Result};
use crate::manager::ConnectionManager;
use crate::streamer::Subscription;
use doorgate_core::{Handle, RelayPulse, TableName, TableRow, User};

impl ConnectionManager {
    pub async fn restart(&self, handle: Handle) -> Result<()> {
        let session = self.lookup(handle).await?;
        session
            .restart()
            .await
            .map_err(|e| GatewayError::from_session(handle, e))
    }

    pub async fn unlock_relay(&self, handle: Handle, pulse: RelayPulse) -> Result<()> {
        let session = self.lookup(handle).await?;
        session
            .unlock_relay(pulse)
            .await
            .map_err(|e| GatewayError::from_session(handle, e))
    }

    pub async fn get_table(&self, handle: Handle, table: TableName) -> Result<Vec<TableRow>> {
        let session = self.lookup(handle).await?;
        session
            .get_table(table)
            .await
            .map_err(|e| GatewayError::from_session(handle, e))
    }

    pub async fn set_table(&self, handle: Handle, table: TableName, rows: Vec<TableRow>) -> Result<()> {
        let session = self.lookup(handle).await?;
        session
            .set_table(table, rows)
            .await
            .map_err(|e| GatewayError::from_session(handle, e))
    }

    pub async fn delete_table_rows(
        &self,
        handle: Handle,
        table: TableName,
        filter: TableRow,
    ) -> Result<usize> {
        let session = self.lookup(handle).await?;
        session
            .delete_table_rows(table, filter)
            .await
            .map_err(|e| GatewayError::from_session(handle, e))
    }

    pub async fn delete_all_table_rows(&self, handle: Handle) -> Result<usize> {
        let session = self.lookup(handle).await?;
        session
            .delete_all_table_rows()
            .await
            .map_err(|e| GatewayError::from_session(handle, e))
    }

    pub async fn get_user(&self, handle: Handle, pin: &str) -> Result<Option<User>> {
        let session = self.lookup(handle).await?;
        session
            .get_user(pin.to_string())
            .await
            .map_err(|e| GatewayError::from_session(handle, e))
    }

    pub async fn list_users(&self, handle: Handle) -> Result<Vec<User>> {
        let session = self.lookup(handle).await?;
        session
            .list_users()
            .await
            .map_err(|e| GatewayError::from_session(handle, e))
    }

    pub async fn add_users(&self, handle: Handle, users: Vec<User>) -> Result<()> {
        let session = self.lookup(handle).await?;
        session
            .add_users(users)
            .await
            .map_err(|e| GatewayError::from_session(handle, e))
    }

    pub async fn update_user(&self, handle: Handle, pin: &str, user: User) -> Result<()> {
        let session = self.lookup(handle).await?;
        session
            .update_user(pin.to_string(), user)
            .await
            .map_err(|e| GatewayError::from_session(handle, e))
    }

    pub async fn delete_user(&self, handle: Handle, pin: &str) -> Result<bool> {
        let session = self.lookup(handle).await?;
        session
            .delete_user(pin.to_string())
            .await
            .map_err(|e| GatewayError::from_session(handle, e))
    }

    /// Attach a realtime log subscriber to the session bound to `handle`.
    pub async fn subscribe(&self, handle: Handle) -> Result<Subscription> {
        let session = self.lookup(handle).await?;
        session
            .subscribe()
            .map_err(|e| GatewayError::from_session(handle, e))
    }
}
