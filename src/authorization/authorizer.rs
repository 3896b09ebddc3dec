use std::sync::Arc;
use tower_cookies::Cookies;

use super::context::AuthContext;
use super::verifier::{SessionVerifier, Verification};
use crate::config::{Config, VerificationFailurePolicy};
use crate::error::AuthError;
use crate::oidc::{login_redirect, login_redirect_with_state, LoginRedirect};
use crate::session::SessionCookies;

/// Turns a request's cookies into an [`AuthContext`].
#[derive(Clone, Debug)]
pub struct Authorizer {
    config: Arc<Config>,
    cookies: SessionCookies,
    verifier: SessionVerifier,
}

impl Authorizer {
    pub fn new(config: Arc<Config>, cookies: SessionCookies, verifier: SessionVerifier) -> Self {
        Self {
            config,
            cookies,
            verifier,
        }
    }

    pub async fn authorize(&self, cookies: &Cookies) -> Result<AuthContext, AuthError> {
        match self.verifier.verify(cookies).await {
            Ok(Verification::Verified {
                access_token,
                user_info,
            }) => Ok(AuthContext::Authenticated {
                access_token,
                user_info,
            }),
            Ok(Verification::NoSession) => Ok(self.unauthenticated(cookies)),
            Err(AuthError::Provider(err))
                if self.config.verification_failure == VerificationFailurePolicy::Lenient =>
            {
                tracing::warn!(error = %err, "user-info check failed, sending user to login");
                Ok(self.unauthenticated(cookies))
            }
            Err(err) => Err(err),
        }
    }

    /// A login already in flight keeps its `state`, so parallel anonymous
    /// requests (assets, other tabs) do not invalidate the redirect in use.
    fn unauthenticated(&self, cookies: &Cookies) -> AuthContext {
        let LoginRedirect { url, state } = match self.cookies.pending_state(cookies) {
            Some(state) => login_redirect_with_state(&self.config, state),
            None => login_redirect(&self.config),
        };
        AuthContext::Unauthenticated {
            redirect_url: url,
            state,
        }
    }
}
