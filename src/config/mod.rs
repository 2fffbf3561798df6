pub mod settings;

pub use settings::{LLMConfig, LoggingConfig, MemoryConfig, PersonaConfig, ServerConfig, Settings};
