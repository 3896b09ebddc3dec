use async_trait::async_trait;
use custom_error::custom_error;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::ops::Deref;
use time::OffsetDateTime;

use crate::oidc::TokenBundle;

#[cfg(target_arch = "wasm32")]
pub mod cloudflare;
pub mod in_memory;

custom_error! {
    pub StoreError
        Backend{reason: String} = "session store failed: {reason}",
        Serialization{source: serde_json::Error} = "could not (de)serialize session record: {source}",
}

/// Token bundle persisted for one user, keyed by the identity token's subject.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub subject: String,
    pub tokens: TokenBundle,
    #[serde(with = "time::serde::rfc3339")]
    pub stored_at: OffsetDateTime,
}

impl SessionRecord {
    pub fn new(subject: impl Into<String>, tokens: TokenBundle) -> Self {
        Self {
            subject: subject.into(),
            tokens,
            stored_at: OffsetDateTime::now_utc(),
        }
    }
}

/// Get/put/delete of session records by subject. Each call is a single
/// key-level operation; concurrent writers for one subject resolve last-writer-wins.
#[async_trait]
pub trait SessionStore: Send + Sync + Debug {
    async fn load(&self, subject: &str) -> Result<Option<SessionRecord>, StoreError>;

    async fn save(&self, record: &SessionRecord) -> Result<(), StoreError>;

    async fn delete(&self, subject: &str) -> Result<(), StoreError>;
}

#[async_trait]
impl<T, V> SessionStore for T
where
    T: Deref<Target = V> + Send + Sync + Debug,
    V: SessionStore + ?Sized,
{
    async fn load(&self, subject: &str) -> Result<Option<SessionRecord>, StoreError> {
        self.deref().load(subject).await
    }

    async fn save(&self, record: &SessionRecord) -> Result<(), StoreError> {
        self.deref().save(record).await
    }

    async fn delete(&self, subject: &str) -> Result<(), StoreError> {
        self.deref().delete(subject).await
    }
}
