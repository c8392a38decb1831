use super::error::ConfigError;
use super::loader::read_optional_toml;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tracing::info;

pub const DEFAULT_API_BASE: &str = "https://api.openai.com";
pub const DEFAULT_API_KEY_ENV: &str = "OPENAI_API_KEY";
pub const DEFAULT_CONVERSATION_TIMEOUT_MINUTES: u64 = 60;

/// General settings loaded from `config.toml`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub default_llm: Option<String>,
    pub markdown_formatting: bool,
    pub api_base: String,
    pub api_key_env: String,
    pub conversation_timeout_minutes: u64,
}

#[derive(Debug, Deserialize, Default)]
struct RawConfig {
    default_llm: Option<String>,
    markdown_formatting: Option<bool>,
    api_base: Option<String>,
    api_key_env: Option<String>,
    conversation_timeout_minutes: Option<u64>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            default_llm: None,
            markdown_formatting: true,
            api_base: DEFAULT_API_BASE.to_string(),
            api_key_env: DEFAULT_API_KEY_ENV.to_string(),
            conversation_timeout_minutes: DEFAULT_CONVERSATION_TIMEOUT_MINUTES,
        }
    }
}

impl AppConfig {
    /// Load settings from `path`; a missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match read_optional_toml::<RawConfig>(path)? {
            Some(raw) => Ok(Self::from(raw)),
            None => {
                info!(path = %path.display(), "Configuration file not found; using defaults");
                Ok(Self::default())
            }
        }
    }

    pub fn conversation_timeout(&self) -> Duration {
        Duration::from_secs(self.conversation_timeout_minutes.saturating_mul(60))
    }
}

impl From<RawConfig> for AppConfig {
    fn from(raw: RawConfig) -> Self {
        let defaults = Self::default();
        Self {
            default_llm: raw.default_llm.filter(|model| !model.trim().is_empty()),
            markdown_formatting: raw.markdown_formatting.unwrap_or(defaults.markdown_formatting),
            api_base: raw.api_base.unwrap_or(defaults.api_base),
            api_key_env: raw.api_key_env.unwrap_or(defaults.api_key_env),
            conversation_timeout_minutes: raw
                .conversation_timeout_minutes
                .unwrap_or(defaults.conversation_timeout_minutes),
        }
    }
}
