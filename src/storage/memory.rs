//! In-Memory Record Storage
//!
//! Information Hiding:
//! - HashMap storage structure hidden from users
//! - Thread-safe access via RwLock hidden behind async interface
//! - Suitable for testing and ephemeral deployments

use super::RecordStorage;
use crate::core::record::ConversationRecord;
use crate::error::StoreError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// In-memory storage using HashMap
/// Data is lost when process terminates
pub struct InMemoryStorage {
    records: Arc<RwLock<HashMap<String, ConversationRecord>>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self {
            records: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl Default for InMemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RecordStorage for InMemoryStorage {
    async fn save(&self, user: &str, record: &ConversationRecord) -> Result<(), StoreError> {
        let mut records = self.records.write().await;
        records.insert(user.to_string(), record.clone());
        tracing::debug!(
            "[InMemoryStorage] Saved {} messages for '{}'",
            record.history.len(),
            user
        );
        Ok(())
    }

    async fn load(&self, user: &str) -> Result<Option<ConversationRecord>, StoreError> {
        let records = self.records.read().await;
        Ok(records.get(user).cloned())
    }

    async fn delete(&self, user: &str) -> Result<bool, StoreError> {
        let mut records = self.records.write().await;
        Ok(records.remove(user).is_some())
    }

    async fn delete_all(&self) -> Result<usize, StoreError> {
        let mut records = self.records.write().await;
        let removed = records.len();
        records.clear();
        Ok(removed)
    }

    async fn list_users(&self) -> Result<Vec<String>, StoreError> {
        let records = self.records.read().await;
        let mut users: Vec<String> = records.keys().cloned().collect();
        users.sort();
        Ok(users)
    }

    async fn exists(&self, user: &str) -> Result<bool, StoreError> {
        let records = self.records.read().await;
        Ok(records.contains_key(user))
    }
}
