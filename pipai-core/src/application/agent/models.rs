use pipai_session::DEFAULT_EXPIRY;
use serde_json::Value;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct TurnRequest {
    pub model: String,
    pub user_prompt: String,
    /// Piped input placed ahead of the prompt as context.
    pub injected_context: Option<String>,
    pub use_history: bool,
}

impl TurnRequest {
    pub fn new(model: impl Into<String>, user_prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            user_prompt: user_prompt.into(),
            injected_context: None,
            use_history: false,
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.injected_context = Some(context.into());
        self
    }

    pub fn with_history(mut self, use_history: bool) -> Self {
        self.use_history = use_history;
        self
    }
}

/// The tool that ran during a turn, if the model asked for one.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolStep {
    pub tool: String,
    pub arguments: Value,
    pub success: bool,
    pub output: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TurnAnswer {
    pub response: String,
    pub tool_step: Option<ToolStep>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TurnOutcome {
    Answered(TurnAnswer),
    /// The caller declined to continue a stale conversation.
    Aborted,
}

impl TurnOutcome {
    pub fn response(&self) -> Option<&str> {
        match self {
            TurnOutcome::Answered(answer) => Some(&answer.response),
            TurnOutcome::Aborted => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpiryDecision {
    /// Keep using the stale conversation.
    Continue,
    /// Drop it and answer without history.
    Stop,
    /// Make no model call and change nothing.
    Abort,
}

/// Decides what happens when the stored conversation has gone stale.
pub trait ExpiryHandler: Send + Sync {
    fn decide(&self, idle_for: Duration) -> ExpiryDecision;
}

impl ExpiryHandler for ExpiryDecision {
    fn decide(&self, _idle_for: Duration) -> ExpiryDecision {
        *self
    }
}

#[derive(Debug, Clone)]
pub struct OrchestratorOptions {
    pub expiry_timeout: Duration,
    pub formatting_instructions: Option<String>,
}

impl Default for OrchestratorOptions {
    fn default() -> Self {
        Self {
            expiry_timeout: DEFAULT_EXPIRY,
            formatting_instructions: None,
        }
    }
}
