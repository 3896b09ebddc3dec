use axum::extract::FromRef;
use custom_error::custom_error;
use std::sync::Arc;

use crate::api::Origin;
use crate::authorization::{Authorizer, CodeExchanger, SessionVerifier};
use crate::config::Config;
use crate::oidc::{Auth0Client, IdTokenVerifier, IdentityProvider};
use crate::session::SessionCookies;
use crate::session_storage::SessionStore;

/// Application state shared across handlers
#[derive(Clone, Debug)]
pub struct AppState {
    pub config: Arc<Config>,
    pub cookies: SessionCookies,
    pub authorizer: Authorizer,
    pub exchanger: CodeExchanger,
    pub store: Arc<dyn SessionStore>,
    pub origin: Arc<dyn Origin>,
}

impl FromRef<AppState> for SessionCookies {
    fn from_ref(input: &AppState) -> Self {
        input.cookies.clone()
    }
}

impl FromRef<AppState> for Arc<Config> {
    fn from_ref(input: &AppState) -> Self {
        input.config.clone()
    }
}

custom_error! {
    pub AppStateBuilderError
        NoSessionStore = "no session store was configured",
        NoOrigin = "no origin was configured",
}

pub struct AppStateBuilder {
    config: Config,
    store: Option<Arc<dyn SessionStore>>,
    origin: Option<Arc<dyn Origin>>,
    provider: Option<Arc<dyn IdentityProvider>>,
    id_tokens: Option<IdTokenVerifier>,
}

impl AppStateBuilder {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            store: None,
            origin: None,
            provider: None,
            id_tokens: None,
        }
    }

    pub fn with_session_store(mut self, store: impl SessionStore + 'static) -> Self {
        self.store = Some(Arc::new(store));
        self
    }

    pub fn with_origin(mut self, origin: impl Origin + 'static) -> Self {
        self.origin = Some(Arc::new(origin));
        self
    }

    /// Replace the Auth0 HTTP client, mainly for tests.
    pub fn with_identity_provider(mut self, provider: impl IdentityProvider + 'static) -> Self {
        self.provider = Some(Arc::new(provider));
        self
    }

    pub fn with_id_token_verifier(mut self, verifier: IdTokenVerifier) -> Self {
        self.id_tokens = Some(verifier);
        self
    }

    pub fn build(self) -> Result<AppState, AppStateBuilderError> {
        let store = self.store.ok_or(AppStateBuilderError::NoSessionStore)?;
        let origin = self.origin.ok_or(AppStateBuilderError::NoOrigin)?;

        let provider: Arc<dyn IdentityProvider> = match self.provider {
            Some(provider) => provider,
            None => Arc::new(Auth0Client::new(&self.config)),
        };
        let id_tokens = self
            .id_tokens
            .unwrap_or_else(|| IdTokenVerifier::shared(&self.config));

        let config = Arc::new(self.config);
        let cookies = SessionCookies::new(&config);
        let verifier = SessionVerifier::new(cookies.clone(), store.clone(), provider.clone());

        Ok(AppState {
            authorizer: Authorizer::new(config.clone(), cookies.clone(), verifier),
            exchanger: CodeExchanger::new(config.clone(), provider, store.clone(), id_tokens),
            cookies,
            store,
            origin,
            config,
        })
    }
}
