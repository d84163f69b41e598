use doorgate_driver::Connector;
use doorgate_session::{ConnectionManager, StreamerConfig};
use std::sync::Arc;

/// Shared application state accessible by all Axum handlers.
pub struct AppState {
    pub manager: Arc<ConnectionManager>,
}

/// Type alias for the Arc-wrapped state used with Axum's State extractor.
pub type SharedState = Arc<AppState>;

impl AppState {
    pub fn new(manager: Arc<ConnectionManager>) -> Self {
        Self { manager }
    }

    /// State backed by a fresh registry over `connector`.
    pub fn with_connector(connector: Arc<dyn Connector>, config: StreamerConfig) -> Self {
        Self::new(Arc::new(ConnectionManager::new(connector, config)))
    }
}
