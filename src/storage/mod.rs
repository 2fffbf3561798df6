//! Conversation Record Storage
//!
//! Information Hiding:
//! - Storage backend implementation details hidden behind trait
//! - `MemoryStore` owns the first-access policy (default record creation)
//! - User identifiers are checked once here before any backend sees them

use crate::config::PersonaConfig;
use crate::core::record::ConversationRecord;
use crate::error::StoreError;
use async_trait::async_trait;
use std::sync::Arc;

pub mod filesystem;
pub mod locks;
pub mod memory;

pub use filesystem::FileSystemStorage;
pub use locks::UserLocks;
pub use memory::InMemoryStorage;

/// Raw key-value access to persisted records, keyed by user identifier
#[async_trait]
pub trait RecordStorage: Send + Sync {
    /// Overwrite the record for a user; readers never observe a partial write
    async fn save(&self, user: &str, record: &ConversationRecord) -> Result<(), StoreError>;

    /// Returns None if the user has no record
    async fn load(&self, user: &str) -> Result<Option<ConversationRecord>, StoreError>;

    /// Returns whether a record was removed
    async fn delete(&self, user: &str) -> Result<bool, StoreError>;

    /// Remove every record and report how many were removed
    async fn delete_all(&self) -> Result<usize, StoreError>;

    async fn list_users(&self) -> Result<Vec<String>, StoreError>;

    async fn exists(&self, user: &str) -> Result<bool, StoreError> {
        Ok(self.load(user).await?.is_some())
    }
}

/// Per-user record store that creates a default record on first access
#[derive(Clone)]
pub struct MemoryStore {
    backend: Arc<dyn RecordStorage>,
    persona: PersonaConfig,
}

impl MemoryStore {
    pub fn new(backend: Arc<dyn RecordStorage>, persona: PersonaConfig) -> Self {
        Self { backend, persona }
    }

    pub fn default_record(&self) -> ConversationRecord {
        ConversationRecord::new(&self.persona.default_name, &self.persona.instruction)
    }

    /// Existing record, or a freshly persisted default one.
    /// A corrupt blob fails with `StoreError::Decode` and is left untouched.
    pub async fn load(&self, user: &str) -> Result<ConversationRecord, StoreError> {
        validate_user(user)?;

        if let Some(record) = self.backend.load(user).await? {
            return Ok(record);
        }

        let record = self.default_record();
        self.backend.save(user, &record).await?;
        tracing::info!("[MemoryStore] Created memory for '{}'", user);
        Ok(record)
    }

    /// Replace whatever is stored for the user with a fresh default record
    pub async fn reset(&self, user: &str) -> Result<ConversationRecord, StoreError> {
        validate_user(user)?;
        let record = self.default_record();
        self.backend.save(user, &record).await?;
        Ok(record)
    }

    pub async fn save(&self, user: &str, record: &ConversationRecord) -> Result<(), StoreError> {
        validate_user(user)?;
        self.backend.save(user, record).await
    }

    pub async fn delete(&self, user: &str) -> Result<(), StoreError> {
        validate_user(user)?;
        if self.backend.delete(user).await? {
            tracing::info!("[MemoryStore] Deleted memory for '{}'", user);
        }
        Ok(())
    }

    pub async fn delete_all(&self) -> Result<usize, StoreError> {
        let removed = self.backend.delete_all().await?;
        tracing::info!("[MemoryStore] Deleted {} memories", removed);
        Ok(removed)
    }

    pub async fn exists(&self, user: &str) -> Result<bool, StoreError> {
        validate_user(user)?;
        self.backend.exists(user).await
    }

    pub async fn list_users(&self) -> Result<Vec<String>, StoreError> {
        self.backend.list_users().await
    }
}

/// User identifiers double as storage keys and must not leave the storage root
pub fn validate_user(user: &str) -> Result<(), StoreError> {
    let invalid = user.is_empty()
        || user == "."
        || user == ".."
        || user.contains(['/', '\\', '\0']);

    if invalid {
        return Err(StoreError::InvalidUser(user.to_string()));
    }
    Ok(())
}
