use super::connection::ToolProviderConnection;
use super::descriptor::ToolDescriptor;
use super::error::ToolProviderError;
use super::interface::ToolProvider;
use crate::config::{ConfigError, ToolProviderConfig, load_servers};
use futures::future::join_all;
use serde_json::Value;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("MCP servers are not initialized")]
    NotReady,
    #[error("failed to initialize MCP servers: {}", describe_failures(.failures))]
    Init { failures: Vec<ProviderFailure> },
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl RegistryError {
    pub fn user_message(&self) -> String {
        match self {
            RegistryError::NotReady => "Tool servers were used before being started.".to_string(),
            RegistryError::Init { failures } => {
                format!("Could not start MCP servers: {}", describe_failures(failures))
            }
            RegistryError::Config(err) => err.user_message(),
        }
    }
}

#[derive(Debug)]
pub struct ProviderFailure {
    pub provider: String,
    pub error: ToolProviderError,
}

fn describe_failures(failures: &[ProviderFailure]) -> String {
    failures
        .iter()
        .map(|failure| format!("{}: {}", failure.provider, failure.error))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Why a dispatch produced no tool result. A value, not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchFailure {
    NoProvider { tool: String },
    Invocation {
        tool: String,
        provider: String,
        message: String,
    },
}

impl fmt::Display for DispatchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchFailure::NoProvider { tool } => write!(f, "no provider for tool '{tool}'"),
            DispatchFailure::Invocation { tool, message, .. } => {
                write!(f, "error executing tool {tool}: {message}")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    Completed { provider: String, payload: Value },
    Failed(DispatchFailure),
}

impl DispatchOutcome {
    pub fn is_ok(&self) -> bool {
        matches!(self, DispatchOutcome::Completed { .. })
    }

    /// `(ok, payload)`, with the failure rendered as a string payload.
    pub fn into_parts(self) -> (bool, Value) {
        match self {
            DispatchOutcome::Completed { payload, .. } => (true, payload),
            DispatchOutcome::Failed(failure) => (false, Value::String(failure.to_string())),
        }
    }
}

#[derive(Default)]
struct RegistryState {
    providers: Vec<Arc<dyn ToolProvider>>,
    ready: bool,
}

/// The set of tool providers for one invocation, in registration order.
#[derive(Default)]
pub struct ToolProviderRegistry {
    state: RwLock<RegistryState>,
}

impl ToolProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn load_from_path(&self, path: &Path) -> Result<(), RegistryError> {
        let configs = load_servers(path)?;
        self.load(configs).await
    }

    pub async fn load(&self, configs: Vec<ToolProviderConfig>) -> Result<(), RegistryError> {
        let providers = configs
            .into_iter()
            .map(|config| Arc::new(ToolProviderConnection::new(config)) as Arc<dyn ToolProvider>)
            .collect();
        self.load_providers(providers).await
    }

    /// Replaces the provider set and starts every provider concurrently.
    /// One failure tears all of them down again.
    pub async fn load_providers(&self, providers: Vec<Arc<dyn ToolProvider>>) -> Result<(), RegistryError> {
        self.close_all().await;

        info!(count = providers.len(), "Starting MCP servers");
        let results = join_all(providers.iter().map(|provider| provider.initialize())).await;
        let failures: Vec<ProviderFailure> = providers
            .iter()
            .zip(results)
            .filter_map(|(provider, result)| {
                result.err().map(|error| ProviderFailure {
                    provider: provider.name().to_string(),
                    error,
                })
            })
            .collect();

        if !failures.is_empty() {
            for failure in &failures {
                error!(server = %failure.provider, error = %failure.error, "MCP server failed to start");
            }
            join_all(providers.iter().map(|provider| provider.close())).await;
            return Err(RegistryError::Init { failures });
        }

        let mut state = self.state.write().await;
        state.providers = providers;
        state.ready = true;
        Ok(())
    }

    pub async fn is_ready(&self) -> bool {
        self.state.read().await.ready
    }

    pub async fn provider_names(&self) -> Vec<String> {
        let state = self.state.read().await;
        state
            .providers
            .iter()
            .map(|provider| provider.name().to_string())
            .collect()
    }

    async fn live_providers(&self) -> Result<Vec<Arc<dyn ToolProvider>>, RegistryError> {
        let state = self.state.read().await;
        if !state.ready {
            return Err(RegistryError::NotReady);
        }
        Ok(state.providers.clone())
    }

    /// Every provider's tools in registration order. A provider whose
    /// listing fails is left out.
    pub async fn list_all_tools(&self) -> Result<Vec<ToolDescriptor>, RegistryError> {
        let providers = self.live_providers().await?;
        let listings = join_all(providers.iter().map(|provider| provider.list_tools())).await;

        let mut tools = Vec::new();
        for (provider, listing) in providers.iter().zip(listings) {
            match listing {
                Ok(found) => tools.extend(found),
                Err(err) => {
                    error!(server = %provider.name(), error = %err, "Error getting tools from server");
                }
            }
        }
        Ok(tools)
    }

    /// Routes `tool` to the first provider, in registration order, that
    /// lists it.
    pub async fn dispatch(&self, tool: &str, arguments: Value) -> Result<DispatchOutcome, RegistryError> {
        let providers = self.live_providers().await?;

        for provider in &providers {
            let owns_tool = match provider.list_tools().await {
                Ok(tools) => tools.iter().any(|candidate| candidate.name == tool),
                Err(err) => {
                    warn!(server = %provider.name(), tool, error = %err, "Skipping provider whose tool listing failed");
                    continue;
                }
            };
            if !owns_tool {
                continue;
            }

            debug!(server = %provider.name(), tool, "Dispatching tool call");
            return Ok(match provider.invoke_tool(tool, arguments).await {
                Ok(payload) => DispatchOutcome::Completed {
                    provider: provider.name().to_string(),
                    payload,
                },
                Err(err) => {
                    error!(server = %provider.name(), tool, error = %err, "Tool invocation failed");
                    DispatchOutcome::Failed(DispatchFailure::Invocation {
                        tool: tool.to_string(),
                        provider: provider.name().to_string(),
                        message: err.to_string(),
                    })
                }
            });
        }

        warn!(tool, "No MCP server provides the requested tool");
        Ok(DispatchOutcome::Failed(DispatchFailure::NoProvider {
            tool: tool.to_string(),
        }))
    }

    /// Closes every provider concurrently. Never fails.
    pub async fn close_all(&self) {
        let providers = {
            let mut state = self.state.write().await;
            state.ready = false;
            std::mem::take(&mut state.providers)
        };
        if providers.is_empty() {
            return;
        }
        debug!(count = providers.len(), "Closing MCP servers");
        join_all(providers.iter().map(|provider| provider.close())).await;
    }

    /// Rendered descriptors of every listed tool, newline-joined.
    pub async fn tools_catalog_text(&self) -> Result<String, RegistryError> {
        let tools = self.list_all_tools().await?;
        Ok(tools
            .iter()
            .map(ToolDescriptor::render_for_prompt)
            .collect::<Vec<_>>()
            .join("\n"))
    }
}
