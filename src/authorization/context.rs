use async_trait::async_trait;
use axum::extract::{FromRef, FromRequestParts};
use axum::http::request::Parts;
use axum::response::{IntoResponse, Response};
use tower_cookies::Cookies;

use crate::oidc::UserInfo;
use crate::state::AppState;

/// Outcome of authorizing one request.
#[derive(Clone, Debug, PartialEq)]
pub enum AuthContext {
    /// A stored session was re-validated against the provider.
    Authenticated {
        access_token: String,
        user_info: UserInfo,
    },
    /// No usable session. `redirect_url` is the provider login page and
    /// `state` the CSRF value embedded in it.
    Unauthenticated { redirect_url: String, state: String },
}

impl AuthContext {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, AuthContext::Authenticated { .. })
    }

    pub fn user_info(&self) -> Option<&UserInfo> {
        match self {
            AuthContext::Authenticated { user_info, .. } => Some(user_info),
            AuthContext::Unauthenticated { .. } => None,
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthContext
where
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let cookies = Cookies::from_request_parts(parts, state)
            .await
            .map_err(IntoResponse::into_response)?;

        let app = AppState::from_ref(state);
        app.authorizer
            .authorize(&cookies)
            .await
            .map_err(IntoResponse::into_response)
    }
}
