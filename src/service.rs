//! Request handlers
//!
//! Each operation runs load-modify-save under the user's lock. `save` is the
//! only durability boundary: a chat whose completion fails persists nothing.
//! Per-user operations share the reset gate; `forget_all` takes it exclusively,
//! so no save from an earlier request lands after a global reset.

use crate::core::{ChatCompletion, ConversationRecord, HistoryCurator};
use crate::error::{CompletionError, StoreError};
use crate::storage::{MemoryStore, UserLocks};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;

/// Handler failures; `Display` is the text shown to the end user
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ServiceError {
    #[error("The 'user' parameter is required.")]
    MissingUser,

    #[error("The 'query' parameter is required.")]
    MissingQuery,

    #[error("{0}")]
    Usage(&'static str),

    #[error("Invalid user name: {0}")]
    InvalidUser(String),

    #[error("OpenAI error: {0}")]
    Provider(String),

    #[error("An error occurred on the AI server.")]
    Ai,

    #[error("A memory storage error occurred.")]
    Storage,

    #[error("The memory directory does not exist.")]
    MemoryDirMissing,
}

const SETNAME_USAGE: &str = "Example: /setname?user=alice&name=Titi";
const FORGET_USAGE: &str = "Example: /forget?user=alice";

pub struct ChatService {
    store: MemoryStore,
    curator: HistoryCurator,
    completion: Arc<dyn ChatCompletion>,
    locks: UserLocks,
    reset_gate: RwLock<()>,
}

impl ChatService {
    pub fn new(
        store: MemoryStore,
        curator: HistoryCurator,
        completion: Arc<dyn ChatCompletion>,
    ) -> Self {
        Self {
            store,
            curator,
            completion,
            locks: UserLocks::new(),
            reset_gate: RwLock::new(()),
        }
    }

    pub fn store(&self) -> &MemoryStore {
        &self.store
    }

    pub async fn chat(&self, user: &str, query: &str) -> Result<String, ServiceError> {
        let user = user.trim();
        let query = query.trim();
        if user.is_empty() {
            return Err(ServiceError::MissingUser);
        }
        if query.is_empty() {
            return Err(ServiceError::MissingQuery);
        }

        let _gate = self.reset_gate.read().await;
        let _guard = self.locks.lock(user).await;
        let mut record = self.load_record(user).await?;

        self.curator.ensure_identity_announced(&mut record, user);
        self.curator.append_user_turn(&mut record, user, query);
        let prompt = self.curator.build_prompt(&record);

        tracing::debug!(
            "[ChatService] Sending {} of {} messages for '{}'",
            prompt.len(),
            record.history.len(),
            user
        );

        let answer = match self.completion.complete(&prompt).await {
            Ok(answer) => answer,
            Err(CompletionError::Provider(message)) => {
                tracing::error!("[ChatService] Provider error for '{}': {}", user, message);
                return Err(ServiceError::Provider(message));
            }
            Err(e) => {
                tracing::error!("[ChatService] Completion failed for '{}': {}", user, e);
                return Err(ServiceError::Ai);
            }
        };

        self.curator.append_assistant_turn(&mut record, answer.as_str());
        self.curator.compact_if_over_limit(&mut record);
        self.save_record(user, &record).await?;

        Ok(answer)
    }

    pub async fn set_name(&self, user: &str, name: &str) -> Result<String, ServiceError> {
        let user = user.trim();
        let name = name.trim();
        if user.is_empty() || name.is_empty() {
            return Err(ServiceError::Usage(SETNAME_USAGE));
        }

        let _gate = self.reset_gate.read().await;
        let _guard = self.locks.lock(user).await;
        let mut record = self.load_record(user).await?;
        self.curator.announce_rename(&mut record, name);
        self.save_record(user, &record).await?;

        tracing::info!("[ChatService] '{}' renamed the assistant to '{}'", user, name);
        Ok(format!("{}'s AI name has been set to \"{}\".", user, name))
    }

    pub async fn forget(&self, user: &str) -> Result<String, ServiceError> {
        let user = user.trim();
        if user.is_empty() {
            return Err(ServiceError::Usage(FORGET_USAGE));
        }

        let _gate = self.reset_gate.read().await;
        let _guard = self.locks.lock(user).await;
        self.store
            .delete(user)
            .await
            .map_err(|e| storage_failure(user, e))?;

        Ok(format!("{}'s memory has been reset.", user))
    }

    pub async fn forget_all(&self) -> Result<String, ServiceError> {
        let _gate = self.reset_gate.write().await;
        match self.store.delete_all().await {
            Ok(0) => Ok("There are no memories to delete.".to_string()),
            Ok(_) => Ok("All users' memories have been reset.".to_string()),
            Err(StoreError::RootMissing(path)) => {
                tracing::warn!("[ChatService] Memory directory {:?} is missing", path);
                Err(ServiceError::MemoryDirMissing)
            }
            Err(e) => Err(storage_failure("*", e)),
        }
    }

    /// Corrupt records are replaced by a fresh default instead of failing the request
    async fn load_record(&self, user: &str) -> Result<ConversationRecord, ServiceError> {
        match self.store.load(user).await {
            Ok(record) => Ok(record),
            Err(StoreError::Decode { source, .. }) => {
                tracing::warn!(
                    "[ChatService] Stored record for '{}' is corrupt ({}), starting fresh",
                    user,
                    source
                );
                self.store
                    .reset(user)
                    .await
                    .map_err(|e| storage_failure(user, e))
            }
            Err(e) => Err(storage_failure(user, e)),
        }
    }

    async fn save_record(
        &self,
        user: &str,
        record: &ConversationRecord,
    ) -> Result<(), ServiceError> {
        self.store
            .save(user, record)
            .await
            .map_err(|e| storage_failure(user, e))
    }
}

fn storage_failure(user: &str, err: StoreError) -> ServiceError {
    match err {
        StoreError::InvalidUser(user) => ServiceError::InvalidUser(user),
        err => {
            tracing::error!("[ChatService] Storage failure for '{}': {}", user, err);
            ServiceError::Storage
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PersonaConfig;
    use crate::core::{ChatMessage, Role};
    use crate::storage::{FileSystemStorage, InMemoryStorage};
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::time::Duration;
    use tempfile::TempDir;

    /// Records every prompt and answers from a fixed script
    struct StubCompletion {
        reply: Result<String, CompletionError>,
        prompts: Mutex<Vec<Vec<ChatMessage>>>,
        delay: Duration,
    }

    impl StubCompletion {
        fn answering(answer: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: Ok(answer.to_string()),
                prompts: Mutex::new(Vec::new()),
                delay: Duration::ZERO,
            })
        }

        fn failing(err: CompletionError) -> Arc<Self> {
            Arc::new(Self {
                reply: Err(err),
                prompts: Mutex::new(Vec::new()),
                delay: Duration::ZERO,
            })
        }

        fn answering_after(answer: &str, delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                reply: Ok(answer.to_string()),
                prompts: Mutex::new(Vec::new()),
                delay,
            })
        }

        fn last_prompt(&self) -> Vec<ChatMessage> {
            self.prompts.lock().unwrap().last().cloned().unwrap_or_default()
        }
    }

    #[async_trait]
    impl ChatCompletion for StubCompletion {
        async fn complete(&self, messages: &[ChatMessage]) -> Result<String, CompletionError> {
            self.prompts.lock().unwrap().push(messages.to_vec());
            tokio::time::sleep(self.delay).await;
            match &self.reply {
                Ok(answer) => Ok(answer.clone()),
                Err(CompletionError::Provider(m)) => Err(CompletionError::Provider(m.clone())),
                Err(CompletionError::Transport(m)) => Err(CompletionError::Transport(m.clone())),
            }
        }
    }

    fn service(completion: Arc<StubCompletion>) -> ChatService {
        let store = MemoryStore::new(Arc::new(InMemoryStorage::new()), PersonaConfig::default());
        ChatService::new(store, HistoryCurator::default(), completion)
    }

    #[tokio::test]
    async fn test_chat_persists_turns() {
        let stub = StubCompletion::answering("hello");
        let service = service(stub.clone());

        let answer = service.chat("Alice", "hi").await.unwrap();
        assert_eq!(answer, "hello");

        let record = service.store().load("Alice").await.unwrap();
        assert_eq!(record.history.len(), 4);
        assert_eq!(record.system_count(), 2);
        assert!(record.name_introduced);
        assert_eq!(record.history[2], ChatMessage::user("Alice: hi"));
        assert_eq!(record.history[3], ChatMessage::assistant("hello"));

        let prompt = stub.last_prompt();
        assert_eq!(prompt.len(), 3);
        assert_eq!(prompt[2], ChatMessage::user("Alice: hi"));
    }

    #[tokio::test]
    async fn test_second_chat_sends_only_latest_turn() {
        let stub = StubCompletion::answering("ok");
        let service = service(stub.clone());

        service.chat("alice", "first").await.unwrap();
        service.chat("alice", "second").await.unwrap();

        let prompt = stub.last_prompt();
        assert_eq!(prompt.len(), 3);
        assert_eq!(prompt.last().unwrap().content, "alice: second");

        let record = service.store().load("alice").await.unwrap();
        assert_eq!(record.system_count(), 2);
        assert_eq!(record.history.len(), 6);
    }

    #[tokio::test]
    async fn test_chat_requires_parameters() {
        let stub = StubCompletion::answering("unused");
        let service = service(stub.clone());

        assert_eq!(service.chat("  ", "hi").await, Err(ServiceError::MissingUser));
        assert_eq!(service.chat("alice", "").await, Err(ServiceError::MissingQuery));
        assert!(stub.prompts.lock().unwrap().is_empty());
        assert!(!service.store().exists("alice").await.unwrap());
    }

    #[tokio::test]
    async fn test_provider_error_passes_through_without_saving() {
        let stub = StubCompletion::failing(CompletionError::Provider("quota exceeded".into()));
        let service = service(stub);

        let err = service.chat("alice", "hi").await.unwrap_err();
        assert_eq!(err, ServiceError::Provider("quota exceeded".to_string()));
        assert_eq!(err.to_string(), "OpenAI error: quota exceeded");

        // Only the default record created by the first load is stored
        let record = service.store().load("alice").await.unwrap();
        assert_eq!(record, service.store().default_record());
    }

    #[tokio::test]
    async fn test_transport_error_is_generic() {
        let stub = StubCompletion::failing(CompletionError::Transport("connection reset".into()));
        let service = service(stub);

        let err = service.chat("alice", "hi").await.unwrap_err();
        assert_eq!(err, ServiceError::Ai);
        assert!(!err.to_string().contains("connection reset"));
    }

    #[tokio::test]
    async fn test_long_chat_is_compacted() {
        let stub = StubCompletion::answering("ok");
        let service = service(stub);

        for i in 0..20 {
            service.chat("alice", &format!("q{}", i)).await.unwrap();
        }

        let record = service.store().load("alice").await.unwrap();
        assert!(record.history.len() <= 30);
        assert_eq!(record.system_count(), 2);
        assert_eq!(record.history.last().unwrap().role, Role::Assistant);
        assert_eq!(record.history[record.history.len() - 2].content, "alice: q19");
    }

    #[tokio::test]
    async fn test_set_name_persists() {
        let service = service(StubCompletion::answering("ok"));

        let reply = service.set_name("alice", "Momo").await.unwrap();
        assert!(reply.contains("\"Momo\""));

        let record = service.store().load("alice").await.unwrap();
        assert_eq!(record.display_name, "Momo");
        assert!(record
            .history
            .iter()
            .any(|m| m.is_system() && m.content.contains("Momo")));
    }

    #[tokio::test]
    async fn test_set_name_usage_hint() {
        let service = service(StubCompletion::answering("ok"));
        let err = service.set_name("alice", " ").await.unwrap_err();
        assert_eq!(err, ServiceError::Usage(SETNAME_USAGE));
    }

    #[tokio::test]
    async fn test_forget_is_idempotent() {
        let service = service(StubCompletion::answering("ok"));
        service.chat("alice", "hi").await.unwrap();

        service.forget("alice").await.unwrap();
        service.forget("alice").await.unwrap();

        let record = service.store().load("alice").await.unwrap();
        assert_eq!(record, service.store().default_record());
    }

    #[tokio::test]
    async fn test_forget_all_messages() {
        let service = service(StubCompletion::answering("ok"));
        assert_eq!(
            service.forget_all().await.unwrap(),
            "There are no memories to delete."
        );

        service.chat("alice", "hi").await.unwrap();
        service.chat("bob", "hi").await.unwrap();
        assert_eq!(
            service.forget_all().await.unwrap(),
            "All users' memories have been reset."
        );
    }

    #[tokio::test]
    async fn test_forget_all_without_directory() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("memory");
        let backend = FileSystemStorage::new(root.clone()).await.unwrap();
        let store = MemoryStore::new(Arc::new(backend), PersonaConfig::default());
        let service = ChatService::new(
            store,
            HistoryCurator::default(),
            StubCompletion::answering("ok"),
        );
        std::fs::remove_dir(&root).unwrap();

        assert_eq!(
            service.forget_all().await,
            Err(ServiceError::MemoryDirMissing)
        );
    }

    #[tokio::test]
    async fn test_corrupt_record_is_replaced() {
        let temp_dir = TempDir::new().unwrap();
        let backend = FileSystemStorage::new(temp_dir.path().to_path_buf())
            .await
            .unwrap();
        let store = MemoryStore::new(Arc::new(backend), PersonaConfig::default());
        let service = ChatService::new(
            store,
            HistoryCurator::default(),
            StubCompletion::answering("hello"),
        );
        std::fs::write(temp_dir.path().join("alice.json"), "[broken").unwrap();

        assert_eq!(service.chat("alice", "hi").await.unwrap(), "hello");

        let record = service.store().load("alice").await.unwrap();
        assert_eq!(record.history.len(), 4);
    }

    #[tokio::test]
    async fn test_invalid_user_is_rejected() {
        let service = service(StubCompletion::answering("ok"));
        let err = service.chat("../etc", "hi").await.unwrap_err();
        assert_eq!(err, ServiceError::InvalidUser("../etc".to_string()));
    }

    #[tokio::test]
    async fn test_concurrent_chats_keep_every_turn() {
        let service = Arc::new(service(StubCompletion::answering("ok")));

        let tasks: Vec<_> = (0..5)
            .map(|i| {
                let service = service.clone();
                tokio::spawn(async move { service.chat("alice", &format!("q{}", i)).await })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        let record = service.store().load("alice").await.unwrap();
        assert_eq!(record.history.len(), 2 + 5 * 2);
    }

    #[tokio::test]
    async fn test_forget_all_waits_for_running_chat() {
        let service = Arc::new(service(StubCompletion::answering_after(
            "late",
            Duration::from_millis(200),
        )));

        let chat = {
            let service = service.clone();
            tokio::spawn(async move { service.chat("alice", "hi").await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(
            service.forget_all().await.unwrap(),
            "All users' memories have been reset."
        );
        assert_eq!(chat.await.unwrap().unwrap(), "late");
        assert!(!service.store().exists("alice").await.unwrap());
    }
}
