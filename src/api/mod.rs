pub mod authenticated;
mod origin;
pub mod public;

#[cfg(test)]
mod tests;

use axum::response::{IntoResponse, Response};
use http::header::LOCATION;
use http::StatusCode;

pub use origin::Origin;
#[cfg(target_arch = "wasm32")]
pub use origin::ServiceBindingOrigin;

/// `302 Found` to `location`.
pub(crate) fn found(location: &str) -> Response {
    (StatusCode::FOUND, [(LOCATION, location.to_string())]).into_response()
}
