use async_trait::async_trait;
use worker::kv::KvStore;

use super::{SessionRecord, SessionStore, StoreError};
use crate::utilities::Utilities;

#[derive(Clone)]
pub struct CloudflareKvStore {
    kv_storage: KvStore,
}

impl CloudflareKvStore {
    pub(crate) fn new(kv_storage: KvStore) -> Self {
        Self { kv_storage }
    }
}

impl std::fmt::Debug for CloudflareKvStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudflareKvStore").finish_non_exhaustive()
    }
}

fn backend(err: impl std::fmt::Display) -> StoreError {
    StoreError::Backend {
        reason: err.to_string(),
    }
}

#[worker::send]
async fn get_rec(kv_store: KvStore, key: String) -> Result<Option<SessionRecord>, StoreError> {
    match kv_store.get(&key).text().await.map_err(backend)? {
        Some(json) => serde_json::from_str(&json)
            .map(Some)
            .map_err(|source| StoreError::Serialization { source }),
        None => Ok(None),
    }
}

#[worker::send]
async fn put_rec(kv_store: KvStore, key: String, json: String) -> Result<(), StoreError> {
    kv_store
        .put(&key, json)
        .map_err(backend)?
        .execute()
        .await
        .map_err(backend)
}

#[worker::send]
async fn delete_rec(kv_store: KvStore, key: String) -> Result<(), StoreError> {
    kv_store.delete(&key).await.map_err(backend)
}

#[async_trait]
impl SessionStore for CloudflareKvStore {
    async fn load(&self, subject: &str) -> Result<Option<SessionRecord>, StoreError> {
        let key = Utilities::get_session_storage_key(subject);
        get_rec(self.kv_storage.clone(), key).await.map_err(|err| {
            tracing::error!(error = %err, "KV session lookup failed");
            err
        })
    }

    async fn save(&self, record: &SessionRecord) -> Result<(), StoreError> {
        let key = Utilities::get_session_storage_key(&record.subject);
        let json =
            serde_json::to_string(record).map_err(|source| StoreError::Serialization { source })?;
        put_rec(self.kv_storage.clone(), key, json).await
    }

    async fn delete(&self, subject: &str) -> Result<(), StoreError> {
        let key = Utilities::get_session_storage_key(subject);
        delete_rec(self.kv_storage.clone(), key).await
    }
}
