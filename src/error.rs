//! Error handling for the application.
//!
//! This module provides the request-level error type and the response
//! middleware that reacts to rejected sessions.

use axum::extract::State;
use axum::response::{IntoResponse, Response};
use http::header::SET_COOKIE;
use http::{HeaderValue, StatusCode};

use crate::config::ConfigError;
use crate::oidc::{IdTokenError, ProviderError};
use crate::state::AppState;
use crate::session::expired_cookie;
use crate::session_storage::StoreError;

pub const ERROR_HEADER: &str = "x-auth-error";

/// Errors surfaced while handling a request.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The token endpoint answered with an `error` field.
    #[error("exchange failed: {0}")]
    ExchangeFailed(String),

    /// Stored identity token and user-info disagree about the subject.
    #[error("invalid token: {0}")]
    InvalidToken(String),

    /// An identity token could not be decoded or verified.
    #[error("malformed token: {0}")]
    MalformedToken(#[from] IdTokenError),

    /// Callback `state` does not match the state cookie.
    #[error("state mismatch")]
    StateMismatch,

    /// Callback without an authorization code.
    #[error("missing authorization code")]
    MissingCode,

    /// The provider redirected back with an error instead of a code.
    #[error("login denied: {0}")]
    Denied(String),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The content origin could not be reached.
    #[error("origin error: {0}")]
    Origin(String),
}

impl AuthError {
    /// Value of the `x-auth-error` header attached to the response.
    pub fn kind(&self) -> &'static str {
        match self {
            AuthError::ExchangeFailed(_) => "exchange failed",
            AuthError::InvalidToken(_) => "invalid token",
            AuthError::MalformedToken(_) => "malformed token",
            AuthError::StateMismatch => "state mismatch",
            AuthError::MissingCode => "missing code",
            AuthError::Denied(_) => "denied",
            AuthError::Provider(e) if e.is_timeout() => "provider timeout",
            AuthError::Provider(_) => "provider error",
            AuthError::Store(_) => "store error",
            AuthError::Config(_) => "missing config",
            AuthError::Origin(_) => "origin error",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::InvalidToken(_)
            | AuthError::StateMismatch
            | AuthError::MissingCode
            | AuthError::Denied(_) => StatusCode::UNAUTHORIZED,
            AuthError::Provider(e) if e.is_timeout() => StatusCode::GATEWAY_TIMEOUT,
            AuthError::Provider(_) | AuthError::Origin(_) => StatusCode::BAD_GATEWAY,
            AuthError::ExchangeFailed(_)
            | AuthError::MalformedToken(_)
            | AuthError::Store(_)
            | AuthError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            // the provider's message is the point of this response
            AuthError::ExchangeFailed(message) => message.clone(),
            _ if status == StatusCode::UNAUTHORIZED => "Unauthorized".to_string(),
            _ => {
                tracing::error!(error = %self, "request failed");
                status
                    .canonical_reason()
                    .unwrap_or("Internal Server Error")
                    .to_string()
            }
        };

        (status, [(ERROR_HEADER, self.kind())], body).into_response()
    }
}

/// Middleware for handling authentication errors.
///
/// A response rejecting the session as `invalid token` also expires the
/// session cookie, so the client does not keep presenting it.
pub async fn handle_auth_errors(State(state): State<AppState>, mut response: Response) -> Response {
    let x_error_header_value = response
        .headers()
        .get(ERROR_HEADER)
        .and_then(|header_value| header_value.to_str().ok());

    if response.status() == StatusCode::UNAUTHORIZED && x_error_header_value == Some("invalid token")
    {
        let removal = expired_cookie(state.cookies.session_name()).to_string();
        if let Ok(value) = HeaderValue::from_str(&removal) {
            response.headers_mut().append(SET_COOKIE, value);
        }
    }

    response
}
