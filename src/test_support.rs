//! Fakes shared by the unit and router tests.

use async_trait::async_trait;
use axum::body::Body;
use axum::extract::Request;
use axum::response::Response;
use serde_json::{json, Map};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::api::Origin;
use crate::config::{Config, IdTokenVerification};
use crate::error::AuthError;
use crate::oidc::id_token::tests::unsigned_token;
use crate::oidc::{Exchange, IdentityProvider, ProviderError, TokenBundle, UserInfo};
use crate::session_storage::in_memory::MemoryStore;
use crate::session_storage::{SessionRecord, SessionStore, StoreError};

pub(crate) const TEST_COOKIE_SECRET: [u8; 32] = [7u8; 32];

pub(crate) fn test_config() -> Config {
    Config::new(
        "tenant.auth0.com",
        "client-id",
        "client-secret",
        "https://app.example.com/auth",
        TEST_COOKIE_SECRET,
    )
    .unwrap()
    .with_id_token_verification(IdTokenVerification::None)
}

/// Token bundle whose identity token names `subject`.
pub(crate) fn tokens_for(subject: &str, access_token: &str) -> TokenBundle {
    TokenBundle {
        access_token: access_token.to_string(),
        id_token: unsigned_token(&json!({
            "sub": subject,
            "iss": "https://tenant.auth0.com/",
            "aud": "client-id",
        })),
        token_type: Some("Bearer".to_string()),
        scope: Some("openid profile email".to_string()),
        expires_in: Some(86400),
        metadata: Map::new(),
    }
}

#[derive(Debug, Default)]
struct ProviderState {
    codes: HashMap<String, Exchange>,
    users: HashMap<String, String>,
    userinfo_timeout: bool,
}

/// Provider answering from fixed tables and counting calls.
#[derive(Debug, Clone, Default)]
pub(crate) struct FakeProvider {
    state: Arc<Mutex<ProviderState>>,
    exchanges: Arc<AtomicUsize>,
    userinfo: Arc<AtomicUsize>,
}

impl FakeProvider {
    pub(crate) fn with_code(self, code: &str, tokens: TokenBundle) -> Self {
        self.state
            .lock()
            .unwrap()
            .codes
            .insert(code.to_string(), Exchange::Tokens(tokens));
        self
    }

    pub(crate) fn with_rejection(self, code: &str, error: &str, description: Option<&str>) -> Self {
        self.state.lock().unwrap().codes.insert(
            code.to_string(),
            Exchange::Rejected {
                error: error.to_string(),
                description: description.map(str::to_string),
            },
        );
        self
    }

    /// `access_token` resolves to `subject` at the user-info endpoint.
    pub(crate) fn with_user(self, access_token: &str, subject: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .users
            .insert(access_token.to_string(), subject.to_string());
        self
    }

    pub(crate) fn with_userinfo_timeout(self) -> Self {
        self.state.lock().unwrap().userinfo_timeout = true;
        self
    }

    pub(crate) fn exchange_calls(&self) -> usize {
        self.exchanges.load(Ordering::SeqCst)
    }

    pub(crate) fn userinfo_calls(&self) -> usize {
        self.userinfo.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IdentityProvider for FakeProvider {
    async fn exchange_code(&self, code: &str) -> Result<Exchange, ProviderError> {
        self.exchanges.fetch_add(1, Ordering::SeqCst);
        let exchange = self.state.lock().unwrap().codes.get(code).cloned();
        Ok(exchange.unwrap_or_else(|| Exchange::Rejected {
            error: "invalid_grant".to_string(),
            description: Some("Invalid authorization code".to_string()),
        }))
    }

    async fn user_info(&self, access_token: &str) -> Result<UserInfo, ProviderError> {
        self.userinfo.fetch_add(1, Ordering::SeqCst);
        let state = self.state.lock().unwrap();
        if state.userinfo_timeout {
            return Err(ProviderError::Timeout {
                operation: "userinfo request",
            });
        }
        match state.users.get(access_token) {
            Some(subject) => Ok(UserInfo::new(subject.clone())),
            None => Err(ProviderError::ResponseError {
                operation: "userinfo request",
                status: 401,
                body: "Unauthorized".to_string(),
            }),
        }
    }
}

/// [`MemoryStore`] that counts the calls made through the trait.
#[derive(Debug, Clone, Default)]
pub(crate) struct CountingStore {
    inner: MemoryStore,
    loads: Arc<AtomicUsize>,
    saves: Arc<AtomicUsize>,
    deletes: Arc<AtomicUsize>,
}

impl CountingStore {
    /// Insert a record without counting it.
    pub(crate) async fn seed(&self, record: SessionRecord) {
        self.inner.save(&record).await.unwrap();
    }

    pub(crate) fn inner(&self) -> &MemoryStore {
        &self.inner
    }

    pub(crate) fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    pub(crate) fn saves(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    pub(crate) fn deletes(&self) -> usize {
        self.deletes.load(Ordering::SeqCst)
    }

    pub(crate) fn calls(&self) -> usize {
        self.loads() + self.saves() + self.deletes()
    }
}

#[async_trait]
impl SessionStore for CountingStore {
    async fn load(&self, subject: &str) -> Result<Option<SessionRecord>, StoreError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        self.inner.load(subject).await
    }

    async fn save(&self, record: &SessionRecord) -> Result<(), StoreError> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        self.inner.save(record).await
    }

    async fn delete(&self, subject: &str) -> Result<(), StoreError> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        self.inner.delete(subject).await
    }
}

/// A request as the origin saw it.
#[derive(Debug, Clone)]
pub(crate) struct Forwarded {
    pub(crate) method: http::Method,
    pub(crate) path: String,
    pub(crate) authorization: Option<String>,
}

/// Origin that records requests and answers `200 origin:<path>`.
#[derive(Debug, Clone, Default)]
pub(crate) struct EchoOrigin {
    seen: Arc<Mutex<Vec<Forwarded>>>,
}

impl EchoOrigin {
    pub(crate) fn forwarded(&self) -> Vec<Forwarded> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl Origin for EchoOrigin {
    async fn forward(&self, request: Request) -> Result<Response, AuthError> {
        let path = request.uri().path().to_string();
        self.seen.lock().unwrap().push(Forwarded {
            method: request.method().clone(),
            path: path.clone(),
            authorization: request
                .headers()
                .get(http::header::AUTHORIZATION)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string),
        });
        Ok(Response::new(Body::from(format!("origin:{path}"))))
    }
}
