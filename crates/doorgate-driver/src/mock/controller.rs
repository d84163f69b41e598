//! Emulated door controller.
//!
//! Keeps controller tables in memory and serves realtime log chunks pushed
//! through a [`MockControllerHandle`]. Tests use the handle to feed events,
//! inject SDK failures and inspect what the gateway asked the controller to do.

use crate::{
    DriverError, Result,
    error::{CODE_BUFFER_TOO_SMALL, CODE_UNKNOWN_FIELD},
    traits::Driver,
};
use bytes::Bytes;
use doorgate_core::{TableName, TableRow, User, records::validate_pin};
use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, mpsc};
use std::time::Duration;

/// How long a log fetch waits for a pushed chunk before reporting "no events".
pub const FETCH_WAIT: Duration = Duration::from_millis(20);

#[derive(Debug, Default)]
struct State {
    tables: BTreeMap<TableName, Vec<TableRow>>,
    closed: bool,
    restarts: usize,
    relay_activations: Vec<(u8, u8)>,
    command_failures: VecDeque<DriverError>,
    fetch_failures: VecDeque<DriverError>,
    fetch_count: usize,
    fetch_stall: Option<Duration>,
}

/// Emulated controller connection.
///
/// # Examples
///
/// ```
/// use doorgate_driver::{Driver, mock::MockController};
///
/// let (controller, handle) = MockController::new();
/// handle.push_log_line("2024-03-18 08:15:02,1,15540203,1,0,0,4");
///
/// let chunk = controller.fetch_log_chunk(4096).unwrap();
/// assert!(chunk.starts_with(b"2024-03-18"));
/// ```
#[derive(Debug)]
pub struct MockController {
    state: Arc<Mutex<State>>,
    log_rx: Mutex<LogQueue>,
}

#[derive(Debug)]
struct LogQueue {
    rx: mpsc::Receiver<Bytes>,
    pending: Option<Bytes>,
}

impl MockController {
    /// Create a controller with empty tables.
    pub fn new() -> (Self, MockControllerHandle) {
        let (log_tx, rx) = mpsc::channel();
        let state = Arc::new(Mutex::new(State::default()));

        let controller = Self {
            state: Arc::clone(&state),
            log_rx: Mutex::new(LogQueue { rx, pending: None }),
        };
        let handle = MockControllerHandle { state, log_tx };

        (controller, handle)
    }

    fn state(&self) -> MutexGuard<'_, State> {
        lock(&self.state)
    }

    /// Lock state for a command, applying closed-connection and injected failures.
    fn command(&self) -> Result<MutexGuard<'_, State>> {
        let mut state = self.state();
        if state.closed {
            return Err(DriverError::not_connected());
        }
        if let Some(err) = state.command_failures.pop_front() {
            return Err(err);
        }
        Ok(state)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    // A panicking test thread must not wedge every later call.
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn user_filter(pin: &str) -> TableRow {
    TableRow::new().with("Pin", pin)
}

impl Driver for MockController {
    fn close(&self) -> Result<()> {
        self.state().closed = true;
        Ok(())
    }

    fn restart(&self) -> Result<()> {
        self.command()?.restarts += 1;
        Ok(())
    }

    fn switch_relay(&self, relay: u8, seconds: u8) -> Result<()> {
        if relay == 0 {
            return Err(DriverError::invalid_parameter("relay number must be positive"));
        }
        self.command()?.relay_activations.push((relay, seconds));
        Ok(())
    }

    fn get_table(&self, table: TableName) -> Result<Vec<TableRow>> {
        Ok(self.command()?.tables.get(&table).cloned().unwrap_or_default())
    }

    fn set_table(&self, table: TableName, rows: &[TableRow]) -> Result<()> {
        let mut state = self.command()?;
        if table == TableName::User && rows.iter().any(|r| r.get("Pin").is_none()) {
            return Err(DriverError::new(CODE_UNKNOWN_FIELD, "user rows require a Pin field"));
        }

        let stored = state.tables.entry(table).or_default();
        for row in rows {
            // Rows keyed by Pin replace the previous record, as the device does.
            match row.get("Pin") {
                Some(pin) => {
                    let filter = user_filter(pin);
                    match stored.iter_mut().find(|r| r.matches(&filter)) {
                        Some(existing) => *existing = row.clone(),
                        None => stored.push(row.clone()),
                    }
                }
                None => stored.push(row.clone()),
            }
        }
        Ok(())
    }

    fn delete_rows(&self, table: TableName, filter: &TableRow) -> Result<usize> {
        let mut state = self.command()?;
        let Some(stored) = state.tables.get_mut(&table) else {
            return Ok(0);
        };
        let before = stored.len();
        stored.retain(|row| !row.matches(filter));
        Ok(before - stored.len())
    }

    fn get_user(&self, pin: &str) -> Result<Option<User>> {
        let state = self.command()?;
        let filter = user_filter(pin);
        state
            .tables
            .get(&TableName::User)
            .and_then(|rows| rows.iter().find(|r| r.matches(&filter)))
            .map(|row| User::from_row(row).map_err(|e| DriverError::new(-3, e.to_string())))
            .transpose()
    }

    fn list_users(&self) -> Result<Vec<User>> {
        let state = self.command()?;
        state
            .tables
            .get(&TableName::User)
            .map(Vec::as_slice)
            .unwrap_or_default()
            .iter()
            .map(|row| User::from_row(row).map_err(|e| DriverError::new(-3, e.to_string())))
            .collect()
    }

    fn add_users(&self, users: &[User]) -> Result<()> {
        for user in users {
            user.validate()
                .map_err(|e| DriverError::invalid_parameter(e.to_string()))?;
        }
        let rows: Vec<TableRow> = users.iter().map(User::to_row).collect();
        self.set_table(TableName::User, &rows)
    }

    fn update_user(&self, pin: &str, user: &User) -> Result<()> {
        validate_pin(pin).map_err(|e| DriverError::invalid_parameter(e.to_string()))?;
        user.validate()
            .map_err(|e| DriverError::invalid_parameter(e.to_string()))?;

        let mut state = self.command()?;
        let stored = state.tables.entry(TableName::User).or_default();
        stored.retain(|row| !row.matches(&user_filter(pin)));
        stored.retain(|row| !row.matches(&user_filter(&user.pin)));
        stored.push(user.to_row());
        Ok(())
    }

    fn delete_user(&self, pin: &str) -> Result<bool> {
        Ok(self.delete_rows(TableName::User, &user_filter(pin))? > 0)
    }

    fn fetch_log_chunk(&self, max_bytes: usize) -> Result<Bytes> {
        let stall = {
            let mut state = self.state();
            if state.closed {
                return Err(DriverError::not_connected());
            }
            state.fetch_count += 1;
            if let Some(err) = state.fetch_failures.pop_front() {
                return Err(err);
            }
            state.fetch_stall
        };
        if let Some(stall) = stall {
            std::thread::sleep(stall);
        }
        if max_bytes == 0 {
            return Err(DriverError::from_code(CODE_BUFFER_TOO_SMALL));
        }

        let mut queue = lock(&self.log_rx);
        let chunk = match queue.pending.take() {
            Some(chunk) => chunk,
            None => match queue.rx.recv_timeout(FETCH_WAIT) {
                Ok(chunk) => chunk,
                Err(_) => return Ok(Bytes::new()),
            },
        };

        if chunk.len() <= max_bytes {
            return Ok(chunk);
        }

        // Hand out as many whole records as fit; keep the rest for the next fetch.
        let Some(cut) = chunk[..max_bytes]
            .iter()
            .rposition(|&b| b == b'\n')
            .map(|pos| pos + 1)
        else {
            queue.pending = Some(chunk);
            return Err(DriverError::from_code(CODE_BUFFER_TOO_SMALL));
        };
        let mut chunk = chunk;
        let head = chunk.split_to(cut);
        if !chunk.is_empty() {
            queue.pending = Some(chunk);
        }
        Ok(head)
    }
}

/// Control handle for a [`MockController`].
///
/// Cloneable; every clone drives the same controller.
#[derive(Debug, Clone)]
pub struct MockControllerHandle {
    state: Arc<Mutex<State>>,
    log_tx: mpsc::Sender<Bytes>,
}

impl MockControllerHandle {
    /// Queue a raw chunk for the next log fetch.
    pub fn push_log_chunk(&self, chunk: impl Into<Bytes>) {
        // The receiver lives as long as the controller; a send to a dropped
        // controller has nowhere to go.
        let _ = self.log_tx.send(chunk.into());
    }

    /// Queue a single record, terminated with `\r\n`.
    pub fn push_log_line(&self, line: &str) {
        self.push_log_chunk(format!("{line}\r\n"));
    }

    /// Fail the next command with `err`.
    pub fn fail_next(&self, err: DriverError) {
        lock(&self.state).command_failures.push_back(err);
    }

    /// Fail the next `count` log fetches with `err`.
    pub fn fail_fetches(&self, count: usize, err: DriverError) {
        let mut state = lock(&self.state);
        state
            .fetch_failures
            .extend(std::iter::repeat_n(err, count));
    }

    /// Make every later log fetch block for `stall` before reading events,
    /// like a controller that answers only at its timeout.
    pub fn stall_fetches(&self, stall: Duration) {
        lock(&self.state).fetch_stall = Some(stall);
    }

    /// Replace the contents of a table.
    pub fn seed_table(&self, table: TableName, rows: Vec<TableRow>) {
        lock(&self.state).tables.insert(table, rows);
    }

    pub fn table(&self, table: TableName) -> Vec<TableRow> {
        lock(&self.state)
            .tables
            .get(&table)
            .cloned()
            .unwrap_or_default()
    }

    pub fn is_closed(&self) -> bool {
        lock(&self.state).closed
    }

    pub fn restart_count(&self) -> usize {
        lock(&self.state).restarts
    }

    /// Relay activations in order, as `(relay, seconds)`.
    pub fn relay_activations(&self) -> Vec<(u8, u8)> {
        lock(&self.state).relay_activations.clone()
    }

    /// Number of log fetches attempted so far, failed ones included.
    pub fn fetch_count(&self) -> usize {
        lock(&self.state).fetch_count
    }
}
