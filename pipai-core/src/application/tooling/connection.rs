use super::descriptor::ToolDescriptor;
use super::error::ToolProviderError;
use super::interface::ToolProvider;
use super::process::McpProcess;
use super::retry::RetryPolicy;
use crate::config::ToolProviderConfig;
use async_trait::async_trait;
use serde_json::Value;
use std::fmt;
use std::path::PathBuf;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, info, warn};

/// Launch command resolved through `PATH` instead of being run verbatim.
pub const PATH_RESOLVED_COMMAND: &str = "npx";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Unstarted,
    Initializing,
    Ready,
    Closed,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ConnectionState::Unstarted => "unstarted",
            ConnectionState::Initializing => "initializing",
            ConnectionState::Ready => "ready",
            ConnectionState::Closed => "closed",
        };
        f.write_str(label)
    }
}

/// Lifecycle owner of one MCP server process.
///
/// `Unstarted -> Initializing -> Ready -> Closed`, with `Initializing ->
/// Closed` on a failed start. A closed connection never restarts.
pub struct ToolProviderConnection {
    config: ToolProviderConfig,
    retry: RetryPolicy,
    state: AsyncMutex<ConnectionState>,
    process: AsyncMutex<Option<McpProcess>>,
}

impl ToolProviderConnection {
    pub fn new(config: ToolProviderConfig) -> Self {
        Self {
            config,
            retry: RetryPolicy::default(),
            state: AsyncMutex::new(ConnectionState::Unstarted),
            process: AsyncMutex::new(None),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn config(&self) -> &ToolProviderConfig {
        &self.config
    }

    pub async fn state(&self) -> ConnectionState {
        *self.state.lock().await
    }

    /// Spawns the server and performs the MCP handshake. Any failure closes
    /// the connection before it is reported.
    pub async fn initialize(&self) -> Result<(), ToolProviderError> {
        {
            let mut state = self.state.lock().await;
            if *state != ConnectionState::Unstarted {
                return Err(ToolProviderError::AlreadyStarted {
                    server: self.config.name.clone(),
                    state: *state,
                });
            }
            *state = ConnectionState::Initializing;
        }

        match self.start_session().await {
            Ok(()) => {
                *self.state.lock().await = ConnectionState::Ready;
                info!(server = %self.config.name, "MCP server ready");
                Ok(())
            }
            Err(err) => {
                warn!(server = %self.config.name, error = %err, "MCP server failed to initialize");
                self.close().await;
                Err(ToolProviderError::Connection {
                    server: self.config.name.clone(),
                    source: Box::new(err),
                })
            }
        }
    }

    async fn start_session(&self) -> Result<(), ToolProviderError> {
        let program = self.resolve_command()?;
        let process = McpProcess::spawn(
            &self.config.name,
            &program,
            &self.config.launch_args,
            &self.config.env_overrides,
        )?;
        // Stored before the handshake so a failed handshake is still torn down by close().
        let mut slot = self.process.lock().await;
        let process = slot.insert(process);
        process.handshake().await?;
        Ok(())
    }

    fn resolve_command(&self) -> Result<PathBuf, ToolProviderError> {
        let command = self.config.launch_command.trim();
        if command.is_empty() {
            return Err(ToolProviderError::EmptyCommand {
                server: self.config.name.clone(),
            });
        }
        if command == PATH_RESOLVED_COMMAND {
            let resolved = which::which(command).map_err(|source| ToolProviderError::CommandNotFound {
                server: self.config.name.clone(),
                command: command.to_string(),
                source,
            })?;
            debug!(server = %self.config.name, path = %resolved.display(), "Resolved launch command");
            return Ok(resolved);
        }
        Ok(PathBuf::from(command))
    }

    async fn ensure_ready(&self) -> Result<(), ToolProviderError> {
        let state = *self.state.lock().await;
        if state == ConnectionState::Ready {
            Ok(())
        } else {
            Err(ToolProviderError::NotReady {
                server: self.config.name.clone(),
                state,
            })
        }
    }

    pub async fn list_tools(&self) -> Result<Vec<ToolDescriptor>, ToolProviderError> {
        self.ensure_ready().await?;
        let process = self.process.lock().await;
        let process = process.as_ref().ok_or_else(|| self.not_ready(ConnectionState::Closed))?;
        let tools = process.list_tools().await?;
        debug!(server = %self.config.name, count = tools.len(), "Listed tools");
        Ok(tools)
    }

    /// Calls a tool with this connection's retry policy. The payload is
    /// returned untouched.
    pub async fn invoke_tool(&self, tool: &str, arguments: Value) -> Result<Value, ToolProviderError> {
        self.invoke_tool_with_policy(tool, arguments, self.retry).await
    }

    pub async fn invoke_tool_with_policy(
        &self,
        tool: &str,
        arguments: Value,
        policy: RetryPolicy,
    ) -> Result<Value, ToolProviderError> {
        self.ensure_ready().await?;
        let label = format!("{}/{tool}", self.config.name);
        policy
            .run(&label, |attempt| {
                let arguments = arguments.clone();
                async move {
                    info!(server = %self.config.name, tool, attempt, "Executing tool");
                    let process = self.process.lock().await;
                    let process = process
                        .as_ref()
                        .ok_or_else(|| self.not_ready(ConnectionState::Closed))?;
                    process.call_tool(tool, arguments).await
                }
            })
            .await
    }

    /// Releases the process exactly once. Safe from any state.
    pub async fn close(&self) {
        let process = self.process.lock().await.take();
        *self.state.lock().await = ConnectionState::Closed;
        if let Some(process) = process {
            process.shutdown().await;
            debug!(server = %self.config.name, "MCP server closed");
        }
    }

    fn not_ready(&self, state: ConnectionState) -> ToolProviderError {
        ToolProviderError::NotReady {
            server: self.config.name.clone(),
            state,
        }
    }
}

#[async_trait]
impl ToolProvider for ToolProviderConnection {
    fn name(&self) -> &str {
        &self.config.name
    }

    async fn initialize(&self) -> Result<(), ToolProviderError> {
        ToolProviderConnection::initialize(self).await
    }

    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>, ToolProviderError> {
        ToolProviderConnection::list_tools(self).await
    }

    async fn invoke_tool(&self, tool: &str, arguments: Value) -> Result<Value, ToolProviderError> {
        ToolProviderConnection::invoke_tool(self, tool, arguments).await
    }

    async fn close(&self) {
        ToolProviderConnection::close(self).await
    }
}
