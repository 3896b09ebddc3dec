use std::sync::Arc;
use tower_cookies::Cookie;

use crate::config::Config;
use crate::error::AuthError;
use crate::oidc::{Exchange, IdTokenVerifier, IdentityProvider, TokenBundle};
use crate::session::session_cookie;
use crate::session_storage::{SessionRecord, SessionStore};

/// What the callback hands back to the browser after a successful login.
#[derive(Clone, Debug)]
pub struct LoginGrant {
    pub subject: String,
    /// Session cookie, still to be signed into the response jar.
    pub cookie: Cookie<'static>,
    pub location: &'static str,
}

/// Redeems authorization codes and persists the resulting session.
#[derive(Clone, Debug)]
pub struct CodeExchanger {
    config: Arc<Config>,
    provider: Arc<dyn IdentityProvider>,
    store: Arc<dyn SessionStore>,
    id_tokens: IdTokenVerifier,
}

impl CodeExchanger {
    pub fn new(
        config: Arc<Config>,
        provider: Arc<dyn IdentityProvider>,
        store: Arc<dyn SessionStore>,
        id_tokens: IdTokenVerifier,
    ) -> Self {
        Self {
            config,
            provider,
            store,
            id_tokens,
        }
    }

    pub async fn exchange(&self, code: &str) -> Result<LoginGrant, AuthError> {
        match self.provider.exchange_code(code).await? {
            Exchange::Tokens(tokens) => self.persist(tokens).await,
            Exchange::Rejected { error, description } => {
                tracing::warn!(%error, ?description, "token endpoint rejected the code");
                Err(AuthError::ExchangeFailed(description.unwrap_or(error)))
            }
        }
    }

    /// Store the tokens under the identity token's subject. Exactly one
    /// write per successful login.
    pub async fn persist(&self, tokens: TokenBundle) -> Result<LoginGrant, AuthError> {
        let claims = self.id_tokens.verify(&tokens.id_token).await?;
        let subject = claims.sub;

        self.store
            .save(&SessionRecord::new(subject.clone(), tokens))
            .await?;
        tracing::info!(subject = %subject, "session stored");

        Ok(LoginGrant {
            cookie: session_cookie(
                &self.config.session_cookie_name,
                &subject,
                !self.config.dev_mode,
            ),
            subject,
            location: "/",
        })
    }
}
