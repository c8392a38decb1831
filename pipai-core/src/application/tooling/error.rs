use super::connection::ConnectionState;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ToolProviderError {
    #[error("failed to connect to MCP server '{server}': {source}")]
    Connection {
        server: String,
        #[source]
        source: Box<ToolProviderError>,
    },
    #[error("MCP server '{server}' is {state}, not ready")]
    NotReady {
        server: String,
        state: ConnectionState,
    },
    #[error("MCP server '{server}' was already started ({state})")]
    AlreadyStarted {
        server: String,
        state: ConnectionState,
    },
    #[error("MCP server '{server}' has an empty launch command")]
    EmptyCommand { server: String },
    #[error("could not resolve '{command}' for MCP server '{server}': {source}")]
    CommandNotFound {
        server: String,
        command: String,
        #[source]
        source: which::Error,
    },
    #[error("failed to spawn MCP server '{server}': {source}")]
    Spawn {
        server: String,
        #[source]
        source: std::io::Error,
    },
    #[error("MCP server '{server}' transport error: {message}")]
    Transport { server: String, message: String },
    #[error("MCP server '{server}' returned invalid JSON: {source}")]
    InvalidJson {
        server: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("MCP server '{server}' returned JSON-RPC error {code}: {message}")]
    Rpc {
        server: String,
        code: i64,
        message: String,
    },
    #[error("MCP server '{server}' terminated unexpectedly")]
    Terminated { server: String },
    #[error("MCP server '{server}' request cancelled")]
    Cancelled { server: String },
}

impl ToolProviderError {
    pub fn server(&self) -> &str {
        match self {
            ToolProviderError::Connection { server, .. }
            | ToolProviderError::NotReady { server, .. }
            | ToolProviderError::AlreadyStarted { server, .. }
            | ToolProviderError::EmptyCommand { server }
            | ToolProviderError::CommandNotFound { server, .. }
            | ToolProviderError::Spawn { server, .. }
            | ToolProviderError::Transport { server, .. }
            | ToolProviderError::InvalidJson { server, .. }
            | ToolProviderError::Rpc { server, .. }
            | ToolProviderError::Terminated { server }
            | ToolProviderError::Cancelled { server } => server,
        }
    }

    pub fn is_connection_error(&self) -> bool {
        matches!(self, ToolProviderError::Connection { .. })
    }
}
