pub mod devices;
pub mod error;
pub mod stream;

use doorgate_core::Handle;
use error::ApiError;

pub(crate) type ApiResult<T> = Result<T, ApiError>;

/// Parse the `{handle}` path segment.
pub(crate) fn parse_handle(raw: &str) -> ApiResult<Handle> {
    Ok(raw.parse::<Handle>()?)
}
