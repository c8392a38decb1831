//! Completion trait

use super::types::CompletionError;
use crate::types::ChatMessage;
use async_trait::async_trait;

/// Remote model completion: an ordered message list in, reply text out.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    async fn complete(&self, model: &str, messages: &[ChatMessage]) -> Result<String, CompletionError>;
}
