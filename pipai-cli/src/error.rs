use pipai_core::agent::OrchestratorError;
use pipai_core::config::ConfigError;
use pipai_core::model::CompletionError;
use pipai_core::tooling::RegistryError;
use pipai_session::SessionError;
use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error(transparent)]
    Completion(#[from] CompletionError),
    #[error(transparent)]
    Orchestrator(#[from] OrchestratorError),
    #[error("failed to read standard input: {0}")]
    Stdin(#[source] io::Error),
    #[error("{0}")]
    Usage(String),
}

impl CliError {
    /// The single line printed before exiting non-zero.
    pub fn user_message(&self) -> String {
        match self {
            CliError::Config(err) => err.user_message(),
            CliError::Session(err) => err.user_message(),
            CliError::Registry(err) => err.user_message(),
            CliError::Completion(err) => err.user_message(),
            CliError::Orchestrator(err) => err.user_message(),
            CliError::Stdin(err) => format!("Could not read piped input: {err}"),
            CliError::Usage(message) => message.clone(),
        }
    }
}
