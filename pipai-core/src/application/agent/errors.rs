use crate::application::tooling::RegistryError;
use crate::infrastructure::model::CompletionError;
use pipai_session::SessionError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error(transparent)]
    Completion(#[from] CompletionError),
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error(transparent)]
    Session(#[from] SessionError),
}

impl OrchestratorError {
    pub fn user_message(&self) -> String {
        match self {
            OrchestratorError::Completion(err) => err.user_message(),
            OrchestratorError::Registry(err) => err.user_message(),
            OrchestratorError::Session(err) => err.user_message(),
        }
    }
}
