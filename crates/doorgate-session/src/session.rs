use crate::error::SessionError;
use crate::streamer::{EventStreamer, StreamerConfig, Subscription};
use chrono::{DateTime, Utc};
use doorgate_core::{
    ConnectionSummary, Handle, RelayPulse, TableName, TableRow, User,
    constants::MAX_ROWS_PER_TABLE,
};
use doorgate_driver::Driver;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;
use tracing::{debug, error, warn};

/// One open controller connection.
///
/// Commands are serialized: at most one driver command is in flight per
/// session. The realtime log fetch loop does not take part in that
/// serialization, so streaming continues while commands run.
pub struct Session {
    handle: Handle,
    summary: ConnectionSummary,
    connected_at: DateTime<Utc>,
    driver: Arc<dyn Driver>,
    command_lock: Mutex<()>,
    closed: AtomicBool,
    streamer: EventStreamer,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("handle", &self.handle)
            .field("summary", &self.summary)
            .field("connected_at", &self.connected_at)
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl Session {
    pub fn new(
        handle: Handle,
        summary: ConnectionSummary,
        driver: Arc<dyn Driver>,
        config: StreamerConfig,
    ) -> Self {
        let streamer = EventStreamer::new(handle, Arc::clone(&driver), config);
        Self {
            handle,
            summary,
            connected_at: Utc::now(),
            driver,
            command_lock: Mutex::new(()),
            closed: AtomicBool::new(false),
            streamer,
        }
    }

    pub fn handle(&self) -> Handle {
        self.handle
    }

    pub fn summary(&self) -> &ConnectionSummary {
        &self.summary
    }

    pub fn connected_at(&self) -> DateTime<Utc> {
        self.connected_at
    }

    pub fn uptime(&self) -> chrono::Duration {
        Utc::now() - self.connected_at
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub fn streamer(&self) -> &EventStreamer {
        &self.streamer
    }

    /// Run one driver command on the blocking pool.
    async fn call<T, F>(&self, op: &'static str, f: F) -> Result<T, SessionError>
    where
        T: Send + 'static,
        F: FnOnce(&dyn Driver) -> doorgate_driver::Result<T> + Send + 'static,
    {
        if self.is_closed() {
            return Err(SessionError::Closed);
        }
        let _guard = self.command_lock.lock().await;
        // Closed while we waited for the previous command.
        if self.is_closed() {
            return Err(SessionError::Closed);
        }

        let driver = Arc::clone(&self.driver);
        match tokio::task::spawn_blocking(move || f(driver.as_ref())).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => {
                debug!(handle = %self.handle, op, error = %e, "Driver command failed");
                Err(SessionError::Driver(e))
            }
            Err(e) => {
                error!(handle = %self.handle, op, error = %e, "Driver command aborted");
                Err(SessionError::Aborted(e.to_string()))
            }
        }
    }

    pub async fn restart(&self) -> Result<(), SessionError> {
        self.call("restart", |d| d.restart()).await
    }

    /// Energize a relay, e.g. the door lock relay for a test unlock.
    pub async fn unlock_relay(&self, pulse: RelayPulse) -> Result<(), SessionError> {
        self.call("unlock_relay", move |d| {
            d.switch_relay(pulse.relay(), pulse.seconds())
        })
        .await
    }

    pub async fn get_table(&self, table: TableName) -> Result<Vec<TableRow>, SessionError> {
        self.call("get_table", move |d| d.get_table(table)).await
    }

    pub async fn set_table(&self, table: TableName, rows: Vec<TableRow>) -> Result<(), SessionError> {
        self.call("set_table", move |d| d.set_table(table, &rows)).await
    }

    /// Delete rows matching `filter`, returning how many were removed.
    pub async fn delete_table_rows(
        &self,
        table: TableName,
        filter: TableRow,
    ) -> Result<usize, SessionError> {
        self.call("delete_table_rows", move |d| d.delete_rows(table, &filter))
            .await
    }

    /// Empty every table, one delete per row.
    ///
    /// Runs as a single command, so nothing else interleaves on this session.
    pub async fn delete_all_table_rows(&self) -> Result<usize, SessionError> {
        self.call("delete_all_table_rows", |d| {
            let mut deleted = 0;
            for table in TableName::ALL {
                let rows = d.get_table(table)?;
                for row in rows.iter().take(MAX_ROWS_PER_TABLE) {
                    deleted += d.delete_rows(table, row)?;
                }
            }
            Ok(deleted)
        })
        .await
    }

    pub async fn get_user(&self, pin: String) -> Result<Option<User>, SessionError> {
        self.call("get_user", move |d| d.get_user(&pin)).await
    }

    pub async fn list_users(&self) -> Result<Vec<User>, SessionError> {
        self.call("list_users", |d| d.list_users()).await
    }

    pub async fn add_users(&self, users: Vec<User>) -> Result<(), SessionError> {
        self.call("add_users", move |d| d.add_users(&users)).await
    }

    pub async fn update_user(&self, pin: String, user: User) -> Result<(), SessionError> {
        self.call("update_user", move |d| d.update_user(&pin, &user))
            .await
    }

    /// Delete a user, returning whether it existed.
    pub async fn delete_user(&self, pin: String) -> Result<bool, SessionError> {
        self.call("delete_user", move |d| d.delete_user(&pin)).await
    }

    /// Attach a realtime log subscriber.
    pub fn subscribe(&self) -> Result<Subscription, SessionError> {
        if self.is_closed() {
            return Err(SessionError::Closed);
        }
        self.streamer.subscribe()
    }

    /// Stop serving this session without touching the driver.
    ///
    /// Used when the driver hands the same handle to a newer connection.
    pub(crate) fn retire(&self) {
        self.closed.store(true, Ordering::Release);
        self.streamer.stop();
    }

    /// Stop streaming, wait for the running command, and close the driver.
    pub(crate) async fn close(&self) {
        self.retire();
        let _guard = self.command_lock.lock().await;

        let driver = Arc::clone(&self.driver);
        match tokio::task::spawn_blocking(move || driver.close()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(handle = %self.handle, error = %e, "Driver close failed"),
            Err(e) => error!(handle = %self.handle, error = %e, "Driver close aborted"),
        }
    }
}
