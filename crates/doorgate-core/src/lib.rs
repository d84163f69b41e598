pub mod constants;
pub mod error;
pub mod records;
pub mod types;

pub use error::{CoreError, Result};
pub use records::{TableRow, User};
pub use types::*;

/// Gateway version, reported by the health endpoint.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
