use async_trait::async_trait;
use serde_json::Value;

use super::descriptor::ToolDescriptor;
use super::error::ToolProviderError;

/// One tool provider as seen by the registry. Implemented by
/// [`ToolProviderConnection`](super::ToolProviderConnection) for real MCP
/// servers.
#[async_trait]
pub trait ToolProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn initialize(&self) -> Result<(), ToolProviderError>;

    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>, ToolProviderError>;

    async fn invoke_tool(&self, tool: &str, arguments: Value) -> Result<Value, ToolProviderError>;

    /// Must not fail; problems are logged by the implementation.
    async fn close(&self);
}
