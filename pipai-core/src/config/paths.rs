//! Locations of everything pipai keeps on disk.

use super::error::ConfigError;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Directory name under the XDG config home
pub const APP_DIR: &str = "pipai";

/// General settings file
pub const CONFIG_FILE: &str = "config.toml";

/// MCP tool provider definitions
pub const SERVERS_FILE: &str = "mcp_servers.json";

/// Directory holding named prompt templates
pub const PROMPTS_DIR: &str = "prompts";

/// Environment file loaded before the API key is resolved
pub const ENV_FILE: &str = ".env";

const DEFAULT_CONFIG_CONTENT: &str = r#"# pipai configuration

# Model used when --model is not given
# default_llm = "gpt-4o-mini"

# Ask the model for Markdown formatted answers
# markdown_formatting = true

# OpenAI-compatible endpoint and the variable holding its key
# api_base = "https://api.openai.com"
# api_key_env = "OPENAI_API_KEY"

# Minutes of inactivity before a conversation needs confirmation
# conversation_timeout_minutes = 60
"#;

/// `$XDG_CONFIG_HOME/pipai`, falling back to `~/.config/pipai`.
pub fn config_dir() -> PathBuf {
    let base = env::var_os("XDG_CONFIG_HOME")
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
        .or_else(|| dirs::home_dir().map(|home| home.join(".config")))
        .unwrap_or_else(|| PathBuf::from(".config"));
    base.join(APP_DIR)
}

pub fn config_file(dir: &Path) -> PathBuf {
    dir.join(CONFIG_FILE)
}

pub fn servers_file(dir: &Path) -> PathBuf {
    dir.join(SERVERS_FILE)
}

pub fn prompts_dir(dir: &Path) -> PathBuf {
    dir.join(PROMPTS_DIR)
}

/// Creates the config and prompt directories plus a commented default
/// `config.toml` when none exists yet.
pub fn ensure_config_dirs(dir: &Path) -> Result<(), ConfigError> {
    let prompts = prompts_dir(dir);
    fs::create_dir_all(&prompts).map_err(|source| ConfigError::Io {
        path: prompts.clone(),
        source,
    })?;

    let config = config_file(dir);
    if !config.exists() {
        debug!(path = %config.display(), "Writing default configuration file");
        fs::write(&config, DEFAULT_CONFIG_CONTENT).map_err(|source| ConfigError::Io {
            path: config.clone(),
            source,
        })?;
    }
    Ok(())
}
