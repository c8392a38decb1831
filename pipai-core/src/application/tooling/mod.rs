//! MCP tool providers: one connection per server process and the registry
//! that starts, routes to and tears down all of them.

mod connection;
mod descriptor;
mod error;
mod interface;
mod process;
mod registry;
mod retry;


pub use connection::{ConnectionState, PATH_RESOLVED_COMMAND, ToolProviderConnection};
pub use descriptor::ToolDescriptor;
pub use error::ToolProviderError;
pub use interface::ToolProvider;
pub use process::PROTOCOL_VERSION;
pub use registry::{
    DispatchFailure, DispatchOutcome, ProviderFailure, RegistryError, ToolProviderRegistry,
};
pub use retry::RetryPolicy;
