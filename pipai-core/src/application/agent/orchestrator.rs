use super::directive::{ReplyDirective, parse_reply};
use super::errors::OrchestratorError;
use super::instructions::{compose_user_turn, system_preamble, tool_result_turn};
use super::models::{
    ExpiryDecision, ExpiryHandler, OrchestratorOptions, ToolStep, TurnAnswer, TurnOutcome, TurnRequest,
};
use crate::application::tooling::{DispatchOutcome, ToolProviderRegistry};
use crate::infrastructure::model::CompletionProvider;
use crate::types::{ChatMessage, MessageRole};
use chrono::Utc;
use pipai_session::ConversationStore;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Runs one user turn: history, optional tool round-trip, persistence.
pub struct ConversationOrchestrator<P> {
    provider: P,
    store: ConversationStore,
    registry: Option<Arc<ToolProviderRegistry>>,
    options: OrchestratorOptions,
}

impl<P: CompletionProvider> ConversationOrchestrator<P> {
    pub fn new(provider: P, store: ConversationStore) -> Self {
        Self {
            provider,
            store,
            registry: None,
            options: OrchestratorOptions::default(),
        }
    }

    /// Attaches a loaded registry; its catalog goes into the system turn.
    pub fn with_registry(mut self, registry: Arc<ToolProviderRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn with_options(mut self, options: OrchestratorOptions) -> Self {
        self.options = options;
        self
    }

    pub fn store(&self) -> &ConversationStore {
        &self.store
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub async fn run_turn(
        &self,
        request: TurnRequest,
        expiry: &dyn ExpiryHandler,
    ) -> Result<TurnOutcome, OrchestratorError> {
        let mut use_history = request.use_history;
        if use_history {
            match self.check_expiry(expiry) {
                ExpiryDecision::Continue => {}
                ExpiryDecision::Stop => {
                    self.store.stop()?;
                    use_history = false;
                }
                ExpiryDecision::Abort => {
                    info!("Stale conversation; turn aborted");
                    return Ok(TurnOutcome::Aborted);
                }
            }
        }

        let mut messages = self.opening_messages(use_history).await?;

        let user_turn = compose_user_turn(&request.user_prompt, request.injected_context.as_deref());
        messages.push(ChatMessage::user(user_turn.clone()));
        self.record(use_history, MessageRole::User, &user_turn)?;

        let reply = self.provider.complete(&request.model, &messages).await?;

        let (response, tool_step) = match parse_reply(&reply) {
            ReplyDirective::ToolCall { tool, arguments } => match &self.registry {
                Some(registry) => {
                    self.run_tool(registry, &request.model, &mut messages, use_history, reply, tool, arguments)
                        .await?
                }
                None => {
                    debug!(tool = %tool, "Tool call requested but no tool providers are attached");
                    (reply, None)
                }
            },
            ReplyDirective::Malformed { reason } => {
                debug!(%reason, "Reply resembles a tool call but is unusable; treating it as the answer");
                (reply, None)
            }
            ReplyDirective::PlainText(_) => (reply, None),
        };

        self.record(use_history, MessageRole::Assistant, &response)?;
        Ok(TurnOutcome::Answered(TurnAnswer { response, tool_step }))
    }

    fn check_expiry(&self, expiry: &dyn ExpiryHandler) -> ExpiryDecision {
        let Some(conversation) = self.store.load() else {
            return ExpiryDecision::Continue;
        };
        let now = Utc::now();
        if !conversation.is_expired_at(now, self.options.expiry_timeout) {
            return ExpiryDecision::Continue;
        }
        let idle_for = (now - conversation.last_message_at).to_std().unwrap_or_default();
        let decision = expiry.decide(idle_for);
        info!(idle_secs = idle_for.as_secs(), ?decision, "Conversation has gone stale");
        decision
    }

    /// System preamble (unless history already carries it) followed by history.
    async fn opening_messages(&self, use_history: bool) -> Result<Vec<ChatMessage>, OrchestratorError> {
        let catalog = match &self.registry {
            Some(registry) => Some(registry.tools_catalog_text().await?),
            None => None,
        };
        let preamble = system_preamble(
            catalog.as_deref(),
            self.options.formatting_instructions.as_deref(),
        );
        let history = if use_history {
            self.store.history_for_model()
        } else {
            Vec::new()
        };

        let mut messages = Vec::with_capacity(history.len() + 3);
        if let Some(preamble) = preamble {
            let already_recorded = history
                .iter()
                .any(|message| message.role == MessageRole::System && message.content == preamble);
            if !already_recorded {
                self.record(use_history, MessageRole::System, &preamble)?;
                messages.push(ChatMessage::system(preamble));
            }
        }
        messages.extend(history);
        Ok(messages)
    }

    #[allow(clippy::too_many_arguments)]
    async fn run_tool(
        &self,
        registry: &ToolProviderRegistry,
        model: &str,
        messages: &mut Vec<ChatMessage>,
        use_history: bool,
        reply: String,
        tool: String,
        arguments: Value,
    ) -> Result<(String, Option<ToolStep>), OrchestratorError> {
        info!(tool = %tool, "Model requested a tool call");
        match registry.dispatch(&tool, arguments.clone()).await? {
            DispatchOutcome::Completed { provider, payload } => {
                debug!(tool = %tool, server = %provider, "Tool call completed");
                let result_turn = tool_result_turn(&tool, &payload);

                self.record(use_history, MessageRole::Assistant, &reply)?;
                self.record(use_history, MessageRole::User, &result_turn)?;
                messages.push(ChatMessage::assistant(reply));
                messages.push(ChatMessage::user(result_turn));

                let response = self.provider.complete(model, messages.as_slice()).await?;
                let step = ToolStep {
                    tool,
                    arguments,
                    success: true,
                    output: payload,
                };
                Ok((response, Some(step)))
            }
            DispatchOutcome::Failed(failure) => {
                warn!(tool = %tool, error = %failure, "Tool call failed; using the model reply as the answer");
                let step = ToolStep {
                    tool,
                    arguments,
                    success: false,
                    output: Value::String(failure.to_string()),
                };
                Ok((reply, Some(step)))
            }
        }
    }

    fn record(&self, use_history: bool, role: MessageRole, content: &str) -> Result<(), OrchestratorError> {
        if use_history {
            self.store.append(role, content)?;
        }
        Ok(())
    }
}
