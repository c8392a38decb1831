use super::error::ConfigError;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::Path;
use tracing::debug;

/// Launch definition of one MCP tool provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolProviderConfig {
    pub name: String,
    pub launch_command: String,
    pub launch_args: Vec<String>,
    pub env_overrides: HashMap<String, String>,
}

impl ToolProviderConfig {
    pub fn new(name: impl Into<String>, launch_command: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            launch_command: launch_command.into(),
            launch_args: Vec::new(),
            env_overrides: HashMap::new(),
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.launch_args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env_overrides.insert(key.into(), value.into());
        self
    }
}

#[derive(Debug, Deserialize, Default)]
struct RawDocument {
    #[serde(rename = "mcpServers", default)]
    mcp_servers: Map<String, Value>,
}

#[derive(Debug, Clone, Deserialize)]
struct RawServer {
    command: String,
    #[serde(default)]
    args: Vec<String>,
    #[serde(default)]
    env: Option<HashMap<String, String>>,
}

impl RawServer {
    fn into_config(self, name: String) -> ToolProviderConfig {
        ToolProviderConfig {
            name,
            launch_command: expand(&self.command),
            launch_args: self.args.iter().map(|arg| expand(arg)).collect(),
            env_overrides: self
                .env
                .unwrap_or_default()
                .into_iter()
                .map(|(key, value)| (key, expand(&value)))
                .collect(),
        }
    }
}

fn expand(value: &str) -> String {
    shellexpand::full(value)
        .map(|cow| cow.into_owned())
        .unwrap_or_else(|_| value.to_string())
}

/// Reads the `mcpServers` document at `path`, keeping declaration order.
pub fn load_servers(path: &Path) -> Result<Vec<ToolProviderConfig>, ConfigError> {
    debug!(path = %path.display(), "Reading MCP server configuration");
    let content = fs::read_to_string(path).map_err(|source| {
        if source.kind() == io::ErrorKind::NotFound {
            ConfigError::ServersNotFound {
                path: path.to_path_buf(),
            }
        } else {
            ConfigError::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    })?;
    parse_servers(&content, path)
}

pub(crate) fn parse_servers(content: &str, path: &Path) -> Result<Vec<ToolProviderConfig>, ConfigError> {
    let document: RawDocument =
        serde_json::from_str(content).map_err(|source| ConfigError::InvalidJson {
            path: path.to_path_buf(),
            source,
        })?;

    document
        .mcp_servers
        .into_iter()
        .map(|(name, value)| {
            let raw: RawServer = serde_json::from_value(value).map_err(|source| {
                ConfigError::InvalidServer {
                    name: name.clone(),
                    source,
                }
            })?;
            Ok(raw.into_config(name))
        })
        .collect()
}
