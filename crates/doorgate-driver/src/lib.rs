//! Controller driver boundary for the doorgate gateway.
//!
//! This crate defines what the gateway needs from a door controller SDK:
//!
//! - [`Connector`] opens a connection and reports the SDK handle for it.
//! - [`Driver`] issues commands on one open connection and fetches its
//!   realtime event log.
//! - [`DriverError`] carries SDK error codes verbatim.
//!
//! Driver calls block. The session layer runs them on tokio's blocking pool.
//!
//! The [`mock`] module provides an in-memory controller implementing the
//! boundary, used by the test suites and by the `doorgate` binary.

pub mod error;
pub mod log;
pub mod mock;
pub mod traits;

pub use error::{DriverError, Result};
pub use log::{DeviceEvent, LogLine, split_chunk};
pub use traits::{Connector, Driver};
