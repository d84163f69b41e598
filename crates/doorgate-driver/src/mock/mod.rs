//! Emulated controllers for development and testing.
//!
//! [`MockConnector`] opens [`MockController`]s and keeps a
//! [`MockControllerHandle`] for each one, so a test can connect through the
//! gateway and then drive the controller it got.

mod connector;
mod controller;

pub use connector::MockConnector;
pub use controller::{FETCH_WAIT, MockController, MockControllerHandle};
