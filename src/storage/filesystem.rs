//! File System Record Storage
//!
//! Information Hiding:
//! - File paths and JSON serialization format hidden from users
//! - Writes go through a temp file and a rename so readers see whole records
//! - The storage root is injected; the process working directory is never consulted

use super::RecordStorage;
use crate::core::record::ConversationRecord;
use crate::error::StoreError;
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;

/// File system storage - each user is a JSON file
/// Files are stored as {base_path}/{user}.json
pub struct FileSystemStorage {
    base_path: PathBuf,
}

impl FileSystemStorage {
    pub async fn new(base_path: PathBuf) -> Result<Self, StoreError> {
        fs::create_dir_all(&base_path)
            .await
            .map_err(|e| StoreError::io(&base_path, e))?;

        Ok(Self { base_path })
    }

    fn record_path(&self, user: &str) -> PathBuf {
        self.base_path.join(format!("{}.json", user))
    }

    fn is_record(path: &Path) -> bool {
        path.extension().and_then(|s| s.to_str()) == Some("json")
    }
}

#[async_trait]
impl RecordStorage for FileSystemStorage {
    async fn save(&self, user: &str, record: &ConversationRecord) -> Result<(), StoreError> {
        let path = self.record_path(user);
        let tmp_path = path.with_extension("json.tmp");
        let json = serde_json::to_string_pretty(record).map_err(|source| StoreError::Encode {
            user: user.to_string(),
            source,
        })?;

        fs::create_dir_all(&self.base_path)
            .await
            .map_err(|e| StoreError::io(&self.base_path, e))?;
        fs::write(&tmp_path, json)
            .await
            .map_err(|e| StoreError::io(&tmp_path, e))?;
        fs::rename(&tmp_path, &path)
            .await
            .map_err(|e| StoreError::io(&path, e))?;

        tracing::debug!(
            "[FileSystemStorage] Saved {} messages for '{}' to {:?}",
            record.history.len(),
            user,
            path
        );
        Ok(())
    }

    async fn load(&self, user: &str) -> Result<Option<ConversationRecord>, StoreError> {
        let path = self.record_path(user);

        let json = match fs::read_to_string(&path).await {
            Ok(json) => json,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!("[FileSystemStorage] No record for '{}'", user);
                return Ok(None);
            }
            Err(e) => return Err(StoreError::io(&path, e)),
        };

        let record: ConversationRecord =
            serde_json::from_str(&json).map_err(|source| StoreError::Decode {
                user: user.to_string(),
                source,
            })?;

        tracing::debug!(
            "[FileSystemStorage] Loaded {} messages for '{}' from {:?}",
            record.history.len(),
            user,
            path
        );
        Ok(Some(record))
    }

    async fn delete(&self, user: &str) -> Result<bool, StoreError> {
        let path = self.record_path(user);

        match fs::remove_file(&path).await {
            Ok(()) => {
                tracing::debug!("[FileSystemStorage] Deleted '{}' at {:?}", user, path);
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!("[FileSystemStorage] '{}' does not exist, nothing to delete", user);
                Ok(false)
            }
            Err(e) => Err(StoreError::io(&path, e)),
        }
    }

    async fn delete_all(&self) -> Result<usize, StoreError> {
        let mut entries = match fs::read_dir(&self.base_path).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StoreError::RootMissing(self.base_path.clone()));
            }
            Err(e) => return Err(StoreError::io(&self.base_path, e)),
        };

        let mut removed = 0;
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| StoreError::io(&self.base_path, e))?
        {
            let path = entry.path();
            if !Self::is_record(&path) {
                continue;
            }
            match fs::remove_file(&path).await {
                Ok(()) => removed += 1,
                // Removed concurrently by a per-user forget
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(StoreError::io(&path, e)),
            }
        }

        tracing::debug!("[FileSystemStorage] Deleted {} records", removed);
        Ok(removed)
    }

    async fn list_users(&self) -> Result<Vec<String>, StoreError> {
        let mut users = Vec::new();
        let mut entries = fs::read_dir(&self.base_path)
            .await
            .map_err(|e| StoreError::io(&self.base_path, e))?;

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| StoreError::io(&self.base_path, e))?
        {
            let path = entry.path();
            if Self::is_record(&path) {
                if let Some(user) = path.file_stem().and_then(|s| s.to_str()) {
                    users.push(user.to_string());
                }
            }
        }

        users.sort();
        tracing::debug!("[FileSystemStorage] Listed {} users", users.len());
        Ok(users)
    }

    async fn exists(&self, user: &str) -> Result<bool, StoreError> {
        fs::try_exists(self.record_path(user))
            .await
            .map_err(|e| StoreError::io(self.record_path(user), e))
    }
}
