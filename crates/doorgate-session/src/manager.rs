//! Handle registry.
//!
//! The [`ConnectionManager`] owns every open [`Session`], keyed by the handle
//! the driver assigned at connect time. Membership in the registry is what
//! makes a handle servable: a handle that is not registered fails with
//! `DeviceNotConnected`, whatever state the hardware is in.

use crate::error::{GatewayError, Result};
use crate::session::Session;
use crate::streamer::{StreamState, StreamerConfig};
use chrono::{DateTime, Utc};
use doorgate_core::{ConnectionParameters, Handle, Protocol};
use doorgate_driver::Connector;
use futures::future::join_all;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{error, info, warn};

/// Snapshot of one open session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionInfo {
    pub handle: Handle,
    pub protocol: Protocol,
    pub address: String,
    pub port: u16,
    pub connected_at: DateTime<Utc>,
    pub uptime_secs: i64,
    pub subscribers: usize,
    pub stream_state: StreamState,
}

impl SessionInfo {
    fn of(session: &Session) -> Self {
        let summary = session.summary();
        Self {
            handle: session.handle(),
            protocol: summary.protocol,
            address: summary.address.clone(),
            port: summary.port,
            connected_at: session.connected_at(),
            uptime_secs: session.uptime().num_seconds(),
            subscribers: session.streamer().subscriber_count(),
            stream_state: session.streamer().state(),
        }
    }
}

/// Registry of open controller sessions.
pub struct ConnectionManager {
    connector: Arc<dyn Connector>,
    sessions: RwLock<HashMap<Handle, Arc<Session>>>,
    config: StreamerConfig,
}

impl std::fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl ConnectionManager {
    pub fn new(connector: Arc<dyn Connector>, config: StreamerConfig) -> Self {
        Self {
            connector,
            sessions: RwLock::new(HashMap::new()),
            config,
        }
    }

    /// Open a connection and register its session.
    ///
    /// # Errors
    ///
    /// - `ConnectionFailed` if `params` are invalid or the driver cannot connect.
    /// - `ContractViolation` if the driver reports handle zero; the new
    ///   connection is closed again.
    pub async fn connect(&self, params: ConnectionParameters) -> Result<Handle> {
        params.validate()?;
        let summary = params.summary();

        let connector = Arc::clone(&self.connector);
        let (raw, driver) = tokio::task::spawn_blocking(move || connector.open(&params))
            .await
            .map_err(|e| GatewayError::ConnectionFailed(format!("connect aborted: {e}")))?
            .map_err(|e| {
                warn!("Connection to {} failed: {}", summary, e);
                GatewayError::connection_failed(e)
            })?;

        let Ok(handle) = Handle::new(raw) else {
            error!("Driver reported handle 0 after connecting to {}", summary);
            let close = tokio::task::spawn_blocking(move || driver.close()).await;
            if let Ok(Err(e)) = close {
                warn!("Closing rejected connection to {} failed: {}", summary, e);
            }
            return Err(GatewayError::ContractViolation(
                "driver returned handle 0 after a successful connect".to_string(),
            ));
        };

        let session = Arc::new(Session::new(handle, summary.clone(), driver, self.config.clone()));
        let (displaced, total) = {
            let mut sessions = self.sessions.write().await;
            let displaced = sessions.insert(handle, session);
            (displaced, sessions.len())
        };

        if let Some(old) = displaced {
            warn!(
                "Driver reused handle {} for {}; retiring session to {}",
                handle,
                summary,
                old.summary()
            );
            old.retire();
        }
        info!("Device {} connected at {} (total: {})", handle, summary, total);

        Ok(handle)
    }

    /// Find the session bound to `handle`.
    pub async fn lookup(&self, handle: Handle) -> Result<Arc<Session>> {
        self.sessions
            .read()
            .await
            .get(&handle)
            .cloned()
            .ok_or(GatewayError::DeviceNotConnected(handle))
    }

    pub async fn is_connected(&self, handle: Handle) -> bool {
        self.sessions.read().await.contains_key(&handle)
    }

    /// Remove and close the session bound to `handle`.
    ///
    /// Idempotent: returns `false` when nothing was registered.
    pub async fn disconnect(&self, handle: Handle) -> bool {
        let (removed, total) = {
            let mut sessions = self.sessions.write().await;
            let removed = sessions.remove(&handle);
            (removed, sessions.len())
        };

        match removed {
            Some(session) => {
                session.close().await;
                info!(
                    "Device {} at {} disconnected (total: {})",
                    handle,
                    session.summary(),
                    total
                );
                true
            }
            None => false,
        }
    }

    /// Snapshot of every open session, ordered by handle.
    pub async fn sessions(&self) -> Vec<SessionInfo> {
        let mut infos: Vec<SessionInfo> = self
            .sessions
            .read()
            .await
            .values()
            .map(|s| SessionInfo::of(s))
            .collect();
        infos.sort_by_key(|info| info.handle);
        infos
    }

    /// Close every session.
    pub async fn shutdown(&self) {
        let drained: Vec<Arc<Session>> = self.sessions.write().await.drain().map(|(_, s)| s).collect();
        if drained.is_empty() {
            return;
        }
        info!("Closing {} open session(s)", drained.len());
        join_all(drained.iter().map(|s| s.close())).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use doorgate_driver::mock::MockConnector;

    fn manager() -> (ConnectionManager, Arc<MockConnector>) {
        let connector = Arc::new(MockConnector::new());
        let manager = ConnectionManager::new(connector.clone(), StreamerConfig::default());
        (manager, connector)
    }

    #[tokio::test]
    async fn test_connect_registers_session() {
        let (manager, _) = manager();
        let handle = manager.connect(ConnectionParameters::default()).await.unwrap();

        let session = manager.lookup(handle).await.unwrap();
        assert_eq!(session.handle(), handle);
        assert!(manager.is_connected(handle).await);
    }

    #[tokio::test]
    async fn test_lookup_unknown_handle() {
        let (manager, _) = manager();
        let handle = Handle::new(999).unwrap();
        assert_eq!(
            manager.lookup(handle).await.unwrap_err(),
            GatewayError::DeviceNotConnected(handle)
        );
    }

    #[tokio::test]
    async fn test_invalid_parameters_never_reach_driver() {
        let (manager, connector) = manager();
        let params = ConnectionParameters::tcp("", 4370);

        let err = manager.connect(params).await.unwrap_err();
        assert!(matches!(err, GatewayError::ConnectionFailed(_)));
        assert_eq!(connector.opened(), 0);
    }

    #[tokio::test]
    async fn test_driver_connect_failure() {
        let (manager, connector) = manager();
        connector.mark_unreachable("10.0.0.9");

        let err = manager
            .connect(ConnectionParameters::tcp("10.0.0.9", 4370))
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::ConnectionFailed(msg) if msg.contains("-307")));
        assert!(manager.sessions().await.is_empty());
    }

    #[tokio::test]
    async fn test_zero_handle_is_contract_violation() {
        let (manager, connector) = manager();
        connector.script_handles([0]);

        let err = manager.connect(ConnectionParameters::default()).await.unwrap_err();
        assert!(matches!(err, GatewayError::ContractViolation(_)));
        assert!(connector.controller(0).unwrap().is_closed());
        assert!(manager.sessions().await.is_empty());
    }

    #[tokio::test]
    async fn test_disconnect_is_idempotent() {
        let (manager, connector) = manager();
        let handle = manager.connect(ConnectionParameters::default()).await.unwrap();

        assert!(manager.disconnect(handle).await);
        assert!(!manager.disconnect(handle).await);
        assert!(connector.controller(handle.as_u64()).unwrap().is_closed());
        assert!(manager.lookup(handle).await.is_err());
    }

    #[tokio::test]
    async fn test_sessions_snapshot() {
        let (manager, _) = manager();
        let a = manager.connect(ConnectionParameters::tcp("10.0.0.1", 4370)).await.unwrap();
        let b = manager.connect(ConnectionParameters::tcp("10.0.0.2", 4371)).await.unwrap();

        let infos = manager.sessions().await;
        assert_eq!(infos.len(), 2);
        assert_eq!(infos[0].handle, a);
        assert_eq!(infos[1].handle, b);
        assert_eq!(infos[1].address, "10.0.0.2");
        assert_eq!(infos[1].port, 4371);
        assert_eq!(infos[0].stream_state, StreamState::Idle);
    }

    #[tokio::test]
    async fn test_shutdown_closes_everything() {
        let (manager, connector) = manager();
        let mut handles = Vec::new();
        for _ in 0..3 {
            handles.push(manager.connect(ConnectionParameters::default()).await.unwrap());
        }

        manager.shutdown().await;

        assert!(manager.sessions().await.is_empty());
        for handle in handles {
            assert!(connector.controller(handle.as_u64()).unwrap().is_closed());
        }
    }
}
