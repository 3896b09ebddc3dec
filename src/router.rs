//! Routing configuration for the application.
//!
//! This module provides centralized routing functionality,
//! including router configuration and middleware setup.

use axum::routing::{any, get};
use axum::Router;
use http::header::{AUTHORIZATION, COOKIE};
use http::HeaderName;
use tower_cookies::CookieManagerLayer;
use tower_http::propagate_header::PropagateHeaderLayer;
use tower_http::sensitive_headers::SetSensitiveRequestHeadersLayer;

use crate::api::authenticated::AuthenticatedApi;
use crate::api::public::PublicApi;
use crate::error::handle_auth_errors;
use crate::state::AppState;

pub const CALLBACK_PATH: &str = "/auth";
pub const LOGOUT_PATH: &str = "/logout";

/// Create the gateway router
///
/// `/auth` completes a login, `/logout` ends one, and everything else is
/// authorized and proxied to the origin.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route(CALLBACK_PATH, get(PublicApi::callback))
        .route(LOGOUT_PATH, any(PublicApi::logout))
        .fallback(AuthenticatedApi::proxy)
        .layer(axum::middleware::map_response_with_state(
            state.clone(),
            handle_auth_errors,
        ))
        .layer(PropagateHeaderLayer::new(HeaderName::from_static(
            "x-request-id",
        )))
        .with_state(state)
        .layer(CookieManagerLayer::new())
        .layer(SetSensitiveRequestHeadersLayer::new([AUTHORIZATION, COOKIE]))
}
