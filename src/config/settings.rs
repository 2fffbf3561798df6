use anyhow::Result;
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

const DEFAULT_MODEL: &str = "gpt-4o-mini";
const DEFAULT_API_URL: &str = "https://api.openai.com/v1/chat/completions";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_MAX_RETRIES: u32 = 2;

const DEFAULT_PERSONA_NAME: &str = "Titi";
const DEFAULT_PERSONA_INSTRUCTION: &str = "Your name is Titi. Keep your answers short.";

const DEFAULT_MEMORY_DIR: &str = "./memory";
const DEFAULT_MAX_HISTORY: usize = 30;
const DEFAULT_RETAINED_TURNS: usize = 20;

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 3000;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    pub llm: LLMConfig,
    pub persona: PersonaConfig,
    pub memory: MemoryConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMConfig {
    pub model: String,
    pub api_url: String,
    /// Upper bound for a single provider round trip
    pub timeout_secs: u64,
    /// Extra attempts after a transport failure
    pub max_retries: u32,
}

/// Persona given to every freshly created conversation record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonaConfig {
    pub default_name: String,
    pub instruction: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    pub dir: PathBuf,
    /// Stored history length that triggers compaction
    pub max_history: usize,
    /// Non-system messages kept by compaction
    pub retained_turns: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            api_url: DEFAULT_API_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }
}

impl Default for PersonaConfig {
    fn default() -> Self {
        Self {
            default_name: DEFAULT_PERSONA_NAME.to_string(),
            instruction: DEFAULT_PERSONA_INSTRUCTION.to_string(),
        }
    }
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from(DEFAULT_MEMORY_DIR),
            max_history: DEFAULT_MAX_HISTORY,
            retained_turns: DEFAULT_RETAINED_TURNS,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Settings {
    /// Layered load: built-in defaults, then `config/{CONFIG_ENV}.toml`,
    /// then `APP__SECTION__KEY` environment variables.
    pub fn new() -> Result<Self, ConfigError> {
        let config_env = env::var("CONFIG_ENV").unwrap_or_else(|_| "default".to_string());

        let config = Config::builder()
            .set_default("llm.model", DEFAULT_MODEL)?
            .set_default("llm.api_url", DEFAULT_API_URL)?
            .set_default("llm.timeout_secs", DEFAULT_TIMEOUT_SECS as i64)?
            .set_default("llm.max_retries", DEFAULT_MAX_RETRIES as i64)?
            .set_default("persona.default_name", DEFAULT_PERSONA_NAME)?
            .set_default("persona.instruction", DEFAULT_PERSONA_INSTRUCTION)?
            .set_default("memory.dir", DEFAULT_MEMORY_DIR)?
            .set_default("memory.max_history", DEFAULT_MAX_HISTORY as i64)?
            .set_default("memory.retained_turns", DEFAULT_RETAINED_TURNS as i64)?
            .set_default("server.host", DEFAULT_HOST)?
            .set_default("server.port", DEFAULT_PORT as i64)?
            .set_default("logging.level", "info")?
            .add_source(File::with_name(&format!("config/{}", config_env)).required(false))
            .add_source(Environment::with_prefix("APP").separator("__"))
            .build()?;

        config.try_deserialize()
    }

    pub fn api_key() -> Result<String> {
        env::var("OPENAI_API_KEY")
            .map_err(|_| anyhow::anyhow!("OPENAI_API_KEY environment variable not set"))
    }
}
