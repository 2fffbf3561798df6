pub mod curator;
pub mod llm;
pub mod record;

pub use curator::HistoryCurator;
pub use llm::{ChatCompletion, LLMClient};
pub use record::{ChatMessage, ConversationRecord, Role};
