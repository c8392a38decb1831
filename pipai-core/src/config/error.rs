use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur when loading configuration or managing prompts
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config from {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse config from {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("failed to parse MCP server list from {path:?}: {source}")]
    InvalidJson {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("MCP server configuration not found at {path:?}")]
    ServersNotFound { path: PathBuf },

    #[error("MCP server '{name}' has an invalid definition: {source}")]
    InvalidServer {
        name: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("prompt '{name}' already exists")]
    PromptExists { name: String },

    #[error("prompt '{name}' not found")]
    PromptNotFound { name: String },

    #[error("'{name}' is not a valid prompt name")]
    InvalidPromptName { name: String },
}

impl ConfigError {
    pub fn user_message(&self) -> String {
        match self {
            ConfigError::Io { path, .. } => format!("Could not read {}.", path.display()),
            ConfigError::Parse { path, source } => {
                format!("{} is not valid TOML: {source}", path.display())
            }
            ConfigError::InvalidJson { path, source } => {
                format!("{} is not valid JSON: {source}", path.display())
            }
            ConfigError::ServersNotFound { path } => format!(
                "No MCP server configuration found. Create {} with an \"mcpServers\" object.",
                path.display()
            ),
            ConfigError::InvalidServer { name, source } => {
                format!("MCP server '{name}' is misconfigured: {source}")
            }
            ConfigError::PromptExists { name } => format!("Prompt '{name}' already exists."),
            ConfigError::PromptNotFound { name } => format!("Prompt '{name}' does not exist."),
            ConfigError::InvalidPromptName { name } => format!(
                "'{name}' cannot be used as a prompt name; use letters, digits, '-' or '_'."
            ),
        }
    }
}
