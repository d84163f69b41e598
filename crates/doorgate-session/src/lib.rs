//! Device session registry and realtime event streaming.
//!
//! - [`ConnectionManager`] maps driver handles to open [`Session`]s and
//!   exposes the handle-addressed command API.
//! - [`Session`] serializes commands to one controller and owns its
//!   [`EventStreamer`].
//! - [`EventStreamer`] pumps the controller's realtime log to any number of
//!   [`Subscription`]s without blocking command traffic.
//! - [`GatewayError`] is the error taxonomy callers see.
//!
//! # Examples
//!
//! ```no_run
//! use doorgate_core::{ConnectionParameters, User};
//! use doorgate_driver::mock::MockConnector;
//! use doorgate_session::{ConnectionManager, StreamerConfig};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), doorgate_session::GatewayError> {
//!     let manager = ConnectionManager::new(Arc::new(MockConnector::new()), StreamerConfig::default());
//!
//!     let handle = manager.connect(ConnectionParameters::default()).await?;
//!     manager.add_users(handle, vec![User::new("1", "15540203")]).await?;
//!
//!     let mut events = manager.subscribe(handle).await?;
//!     while let Some(line) = events.recv().await {
//!         println!("{}", line.raw);
//!     }
//!
//!     manager.disconnect(handle).await;
//!     Ok(())
//! }
//! ```

mod commands;
pub mod error;
pub mod manager;
pub mod session;
pub mod streamer;

pub use error::{GatewayError, Result, SessionError};
pub use manager::{ConnectionManager, SessionInfo};
pub use session::Session;
pub use streamer::{CloseReason, EventStreamer, StreamState, StreamerConfig, Subscription};
