use super::controller::{MockController, MockControllerHandle};
use crate::{DriverError, Result, error::CODE_BAD_PASSWORD, traits::{Connector, Driver}};
use doorgate_core::ConnectionParameters;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tracing::debug;

/// Connector that opens [`MockController`]s.
///
/// Handles are assigned from an increasing counter unless a test scripts
/// them with [`MockConnector::script_handles`], which is how handle reuse and
/// the zero-handle contract violation are exercised.
#[derive(Debug)]
pub struct MockConnector {
    next_handle: AtomicU64,
    inner: Mutex<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    scripted: VecDeque<u64>,
    unreachable: HashSet<String>,
    password: Option<String>,
    controllers: HashMap<u64, MockControllerHandle>,
    opened: usize,
}

impl MockConnector {
    pub fn new() -> Self {
        Self::starting_at(1)
    }

    /// Assign handles counting up from `first`.
    pub fn starting_at(first: u64) -> Self {
        Self {
            next_handle: AtomicU64::new(first),
            inner: Mutex::new(Inner::default()),
        }
    }

    fn inner(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Use these raw handles, in order, for the next connects.
    pub fn script_handles(&self, handles: impl IntoIterator<Item = u64>) {
        self.inner().scripted.extend(handles);
    }

    /// Make connects to `address` fail as if the device were offline.
    pub fn mark_unreachable(&self, address: impl Into<String>) {
        self.inner().unreachable.insert(address.into());
    }

    /// Require this communication password on every connect.
    pub fn require_password(&self, password: impl Into<String>) {
        self.inner().password = Some(password.into());
    }

    /// Control handle of the controller most recently opened under `raw`.
    pub fn controller(&self, raw: u64) -> Option<MockControllerHandle> {
        self.inner().controllers.get(&raw).cloned()
    }

    /// Number of controllers opened so far.
    pub fn opened(&self) -> usize {
        self.inner().opened
    }
}

impl Default for MockConnector {
    fn default() -> Self {
        Self::new()
    }
}

impl Connector for MockConnector {
    fn open(&self, params: &ConnectionParameters) -> Result<(u64, Arc<dyn Driver>)> {
        let mut inner = self.inner();

        if inner.unreachable.contains(&params.address) {
            return Err(DriverError::connect_failed(format!(
                "Connection attempt failed: {}:{}",
                params.address, params.port
            )));
        }
        if let Some(expected) = &inner.password
            && *expected != params.password
        {
            return Err(DriverError::from_code(CODE_BAD_PASSWORD));
        }

        let raw = match inner.scripted.pop_front() {
            Some(raw) => raw,
            None => self.next_handle.fetch_add(1, Ordering::Relaxed),
        };

        let (controller, handle) = MockController::new();
        inner.controllers.insert(raw, handle);
        inner.opened += 1;
        debug!(raw, address = %params.address, "Opened emulated controller");

        Ok((raw, Arc::new(controller)))
    }
}
