//! # pipai-core
//!
//! Everything between the `pipai` command line and the outside world:
//!
//! - [`config`]: settings, the MCP server document and the prompt library
//! - [`tooling`]: MCP tool provider connections and the registry routing
//!   tool calls between them
//! - [`model`]: the completion collaborator
//! - [`agent`]: the conversation orchestrator tying them together

pub mod application;
pub mod config;
pub mod infrastructure;

pub use application::{agent, tooling};
pub use infrastructure::model;
pub use pipai_session::types;

pub use agent::{ConversationOrchestrator, ExpiryDecision, ExpiryHandler, TurnOutcome, TurnRequest};
pub use tooling::{ToolDescriptor, ToolProviderConnection, ToolProviderRegistry};
