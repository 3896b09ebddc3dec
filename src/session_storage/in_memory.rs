use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::{SessionRecord, SessionStore, StoreError};
use crate::utilities::Utilities;

/// Session store backed by a HashMap. Records are stored serialized, the same
/// way the KV backend stores them.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    records: Arc<RwLock<HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn load(&self, subject: &str) -> Result<Option<SessionRecord>, StoreError> {
        let key = Utilities::get_session_storage_key(subject);
        match self.records.read().await.get(&key) {
            Some(json) => serde_json::from_str(json)
                .map(Some)
                .map_err(|source| StoreError::Serialization { source }),
            None => Ok(None),
        }
    }

    async fn save(&self, record: &SessionRecord) -> Result<(), StoreError> {
        let json =
            serde_json::to_string(record).map_err(|source| StoreError::Serialization { source })?;
        self.records
            .write()
            .await
            .insert(Utilities::get_session_storage_key(&record.subject), json);
        Ok(())
    }

    async fn delete(&self, subject: &str) -> Result<(), StoreError> {
        self.records
            .write()
            .await
            .remove(&Utilities::get_session_storage_key(subject));
        Ok(())
    }
}
