//! Chat memory relay
//!
//! Relays chat queries to an LLM completion API while keeping a bounded,
//! per-user rolling conversation history on disk.

pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod server;
pub mod service;
pub mod storage;
pub mod utils;

pub use crate::config::Settings;
pub use error::{CompletionError, StoreError};
pub use service::{ChatService, ServiceError};

use crate::core::{HistoryCurator, LLMClient};
use crate::storage::{FileSystemStorage, MemoryStore};
use std::sync::Arc;

/// File-backed store rooted at the configured memory directory
pub async fn open_store(settings: &Settings) -> Result<MemoryStore, StoreError> {
    let backend = FileSystemStorage::new(settings.memory.dir.clone()).await?;
    Ok(MemoryStore::new(Arc::new(backend), settings.persona.clone()))
}

/// Wire the production service: file storage plus the remote completion client
pub async fn build_service(settings: &Settings, api_key: String) -> anyhow::Result<ChatService> {
    let store = open_store(settings).await?;
    let completion = Arc::new(LLMClient::new(api_key, settings.llm.clone()));

    tracing::info!(
        "Chat service ready (model: {}, memory: {:?})",
        settings.llm.model,
        settings.memory.dir
    );
    Ok(ChatService::new(
        store,
        HistoryCurator::from_config(&settings.memory),
        completion,
    ))
}
