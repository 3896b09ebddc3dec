use axum::extract::{Request, State};
use axum::response::Response;
use http::header::AUTHORIZATION;
use http::HeaderValue;
use tower_cookies::Cookies;

use super::found;
use crate::authorization::AuthContext;
use crate::error::AuthError;
use crate::state::AppState;

pub struct AuthenticatedApi;

impl AuthenticatedApi {
    /// Every path other than the callback and logout routes.
    pub async fn proxy(
        State(state): State<AppState>,
        cookies: Cookies,
        context: AuthContext,
        request: Request,
    ) -> Result<Response, AuthError> {
        Self::dispatch(&state, &cookies, context, request).await
    }

    /// Forward an authenticated request, or start a login.
    pub(crate) async fn dispatch(
        state: &AppState,
        cookies: &Cookies,
        context: AuthContext,
        mut request: Request,
    ) -> Result<Response, AuthError> {
        match context {
            AuthContext::Authenticated {
                access_token,
                user_info,
            } => {
                let bearer = HeaderValue::try_from(format!("Bearer {access_token}")).map_err(
                    |_| AuthError::InvalidToken("access token is not a valid header value".into()),
                )?;
                request.headers_mut().insert(AUTHORIZATION, bearer);

                tracing::debug!(
                    subject = %user_info.sub,
                    path = %request.uri().path(),
                    "forwarding to origin"
                );
                state.origin.forward(request).await
            }
            AuthContext::Unauthenticated {
                redirect_url,
                state: login_state,
            } => {
                state.cookies.set_state(cookies, &login_state);
                Ok(found(&redirect_url))
            }
        }
    }
}
