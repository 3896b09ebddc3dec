use axum::extract::{Query, Request, State};
use axum::response::Response;
use serde::Deserialize;
use tower_cookies::Cookies;

use super::authenticated::AuthenticatedApi;
use super::found;
use crate::config::LogoutPolicy;
use crate::error::AuthError;
use crate::state::AppState;

/// Query string of the provider's redirect back to `/auth`.
#[derive(Debug, Default, Deserialize)]
pub struct Callback {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

pub struct PublicApi;

impl PublicApi {
    pub async fn callback(
        State(state): State<AppState>,
        cookies: Cookies,
        Query(callback): Query<Callback>,
    ) -> Result<Response, AuthError> {
        // The state cookie is single use whatever the outcome.
        let expected_state = state.cookies.take_state(&cookies);

        if let Some(error) = callback.error {
            tracing::warn!(%error, description = ?callback.error_description, "login was not completed");
            return Err(AuthError::Denied(callback.error_description.unwrap_or(error)));
        }

        let code = callback
            .code
            .filter(|code| !code.is_empty())
            .ok_or(AuthError::MissingCode)?;

        match (callback.state.as_deref(), expected_state.as_deref()) {
            (Some(received), Some(expected)) if received == expected => {}
            (received, expected) => {
                tracing::warn!(
                    received = ?received,
                    has_state_cookie = expected.is_some(),
                    "OAuth state mismatch"
                );
                return Err(AuthError::StateMismatch);
            }
        }

        let grant = state.exchanger.exchange(&code).await?;
        state.cookies.issue(&cookies, grant.cookie);
        tracing::info!(subject = %grant.subject, "login complete");

        Ok(found(grant.location))
    }

    /// Clear the session cookie. Without one the request is handled like any
    /// other path.
    pub async fn logout(
        State(state): State<AppState>,
        cookies: Cookies,
        request: Request,
    ) -> Result<Response, AuthError> {
        if !state.cookies.has_session(&cookies) {
            let context = state.authorizer.authorize(&cookies).await?;
            return AuthenticatedApi::dispatch(&state, &cookies, context, request).await;
        }

        if state.config.logout_policy == LogoutPolicy::DeleteSession {
            if let Some(subject) = state.cookies.subject(&cookies) {
                if let Err(err) = state.store.delete(&subject).await {
                    tracing::warn!(error = %err, "stored session could not be deleted");
                }
            }
        }

        state.cookies.clear_session(&cookies);
        tracing::info!("logged out");

        Ok(found("/"))
    }
}
