//! History Curator
//!
//! Decides what part of a stored conversation reaches the provider and how
//! the stored history is kept bounded. System messages carry the persona
//! and identity instructions, so they are always sent and never pruned.

use super::record::{ChatMessage, ConversationRecord};
use crate::config::MemoryConfig;

#[derive(Debug, Clone, Copy)]
pub struct HistoryCurator {
    max_history: usize,
    retained_turns: usize,
}

impl HistoryCurator {
    pub fn new(max_history: usize, retained_turns: usize) -> Self {
        Self {
            max_history,
            retained_turns,
        }
    }

    pub fn from_config(config: &MemoryConfig) -> Self {
        Self::new(config.max_history, config.retained_turns)
    }

    /// Tells the provider who it is talking to, once per record lifetime
    pub fn ensure_identity_announced(&self, record: &mut ConversationRecord, user: &str) {
        if record.name_introduced {
            return;
        }
        record
            .history
            .push(ChatMessage::system(format!("The user's name is {}.", user)));
        record.name_introduced = true;
    }

    /// The provider has no identity channel, so the user id rides in the content
    pub fn append_user_turn(&self, record: &mut ConversationRecord, user: &str, query: &str) {
        record
            .history
            .push(ChatMessage::user(format!("{}: {}", user, query)));
    }

    pub fn append_assistant_turn(&self, record: &mut ConversationRecord, answer: impl Into<String>) {
        record.history.push(ChatMessage::assistant(answer));
    }

    pub fn announce_rename(&self, record: &mut ConversationRecord, name: &str) {
        record.display_name = name.to_string();
        record
            .history
            .push(ChatMessage::system(format!("Your name is now {}.", name)));
    }

    /// All system messages followed by the single latest non-system message
    pub fn build_prompt(&self, record: &ConversationRecord) -> Vec<ChatMessage> {
        let mut prompt: Vec<ChatMessage> = record
            .history
            .iter()
            .filter(|m| m.is_system())
            .cloned()
            .collect();

        if let Some(last) = record.history.iter().rev().find(|m| !m.is_system()) {
            prompt.push(last.clone());
        }

        prompt
    }

    /// Returns true when the history was rewritten
    pub fn compact_if_over_limit(&self, record: &mut ConversationRecord) -> bool {
        if record.history.len() <= self.max_history {
            return false;
        }

        let (system, turns): (Vec<ChatMessage>, Vec<ChatMessage>) = record
            .history
            .drain(..)
            .partition(|m| m.is_system());

        let skip = turns.len().saturating_sub(self.retained_turns);
        record.history = system;
        record.history.extend(turns.into_iter().skip(skip));

        tracing::debug!(
            "[HistoryCurator] Compacted history to {} messages",
            record.history.len()
        );
        true
    }
}

impl Default for HistoryCurator {
    fn default() -> Self {
        Self::from_config(&MemoryConfig::default())
    }
}
