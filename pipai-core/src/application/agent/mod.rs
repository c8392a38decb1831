//! The conversation loop: builds the message list, asks the model, runs a
//! requested tool through the registry and asks again.

mod directive;
mod errors;
mod instructions;
mod models;
mod orchestrator;


pub use directive::{ReplyDirective, parse_reply};
pub use errors::OrchestratorError;
pub use instructions::{compose_user_turn, formatting_instructions, system_preamble, tool_result_text};
pub use models::{
    ExpiryDecision, ExpiryHandler, OrchestratorOptions, ToolStep, TurnAnswer, TurnOutcome, TurnRequest,
};
pub use orchestrator::ConversationOrchestrator;
