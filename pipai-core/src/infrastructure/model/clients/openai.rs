//! OpenAI-compatible client implementation

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::env;
use tracing::{debug, info};

use super::base::HttpClientBase;
use crate::config::AppConfig;
use crate::infrastructure::model::traits::CompletionProvider;
use crate::infrastructure::model::types::CompletionError;
use crate::types::ChatMessage;

const CHAT_COMPLETIONS_PATH: &str = "/v1/chat/completions";

/// Chat-completions client for OpenAI and compatible servers (Ollama,
/// LiteLLM proxy, vLLM, ...).
#[derive(Clone)]
pub struct OpenAiCompatibleClient {
    base: HttpClientBase,
    api_path: String,
}

impl OpenAiCompatibleClient {
    pub fn new(endpoint: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            base: HttpClientBase::new("openai-compatible".to_string(), endpoint.into(), api_key),
            api_path: CHAT_COMPLETIONS_PATH.to_string(),
        }
    }

    /// Builds a client from settings, reading the key from `api_key_env`.
    pub fn from_config(config: &AppConfig) -> Self {
        let api_key = env::var(&config.api_key_env).ok();
        if api_key.is_none() {
            debug!(variable = %config.api_key_env, "No API key in environment; sending unauthenticated requests");
        }
        Self::new(config.api_base.clone(), api_key)
    }
}

#[async_trait]
impl CompletionProvider for OpenAiCompatibleClient {
    async fn complete(&self, model: &str, messages: &[ChatMessage]) -> Result<String, CompletionError> {
        if model.trim().is_empty() {
            return Err(CompletionError::MissingModel);
        }
        let url = self.base.build_url(&self.api_path);
        let payload = ChatCompletionRequest {
            model,
            messages,
            stream: false,
        };

        info!(
            provider = self.base.id.as_str(),
            model,
            messages = messages.len(),
            "Sending request to OpenAI-compatible provider"
        );

        let response: ChatCompletionResponse = self.base.post_json(&url, &payload).await?;
        debug!("Received response from OpenAI-compatible provider");

        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message)
            .and_then(|message| message.content)
            .ok_or_else(|| CompletionError::invalid_response(&self.base.id, "missing content"))
    }
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatCompletionChoice>,
}

#[derive(Deserialize)]
struct ChatCompletionChoice {
    message: Option<ChatCompletionMessage>,
}

#[derive(Deserialize)]
struct ChatCompletionMessage {
    content: Option<String>,
}
