//! Completion error type

use reqwest::StatusCode;
use thiserror::Error;

/// Failure at the model-completion boundary. Never retried by pipai.
#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("no model selected; pass --model or set default_llm")]
    MissingModel,
    #[error("network error calling provider '{provider}': {source}")]
    Network {
        provider: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("provider '{provider}' returned invalid response: {reason}")]
    InvalidResponse { provider: String, reason: String },
}

impl CompletionError {
    pub fn network(provider: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Network {
            provider: provider.into(),
            source,
        }
    }

    pub fn invalid_response(provider: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidResponse {
            provider: provider.into(),
            reason: reason.into(),
        }
    }

    pub fn user_message(&self) -> String {
        match self {
            CompletionError::MissingModel => {
                "No model selected. Pass --model or set default_llm in config.toml.".to_string()
            }
            CompletionError::Network { provider, source } => {
                if source.is_connect() {
                    format!("Could not connect to '{provider}'.")
                } else if source.is_timeout() {
                    format!("Request to '{provider}' timed out.")
                } else if let Some(status) = source.status() {
                    match status {
                        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                            format!("'{provider}' rejected the API key.")
                        }
                        StatusCode::NOT_FOUND => format!("Endpoint or model not found at '{provider}'."),
                        StatusCode::SERVICE_UNAVAILABLE | StatusCode::BAD_GATEWAY => {
                            format!("'{provider}' is currently unavailable.")
                        }
                        _ => format!("Request to '{provider}' failed: {}", status.as_u16()),
                    }
                } else {
                    format!("Network error talking to '{provider}'.")
                }
            }
            CompletionError::InvalidResponse { provider, .. } => {
                format!("'{provider}' returned a response pipai could not read.")
            }
        }
    }
}
