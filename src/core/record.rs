//! Persisted conversation state
//!
//! One `ConversationRecord` exists per user identifier. The serialized
//! field names are part of the on-disk format.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }

    pub fn is_system(&self) -> bool {
        self.role == Role::System
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationRecord {
    pub display_name: String,
    pub name_introduced: bool,
    pub history: Vec<ChatMessage>,
}

impl ConversationRecord {
    /// Record for a user seen for the first time
    pub fn new(display_name: impl Into<String>, instruction: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            name_introduced: false,
            history: vec![ChatMessage::system(instruction)],
        }
    }

    pub fn system_count(&self) -> usize {
        self.history.iter().filter(|m| m.is_system()).count()
    }
}
