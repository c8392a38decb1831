use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Failures while persisting the conversation slot.
///
/// Reading never produces one of these: a missing or unreadable slot is
/// reported as "no conversation" instead.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("failed to write conversation to {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to serialize conversation: {source}")]
    Serialize {
        #[source]
        source: serde_json::Error,
    },
}

impl SessionError {
    pub fn user_message(&self) -> String {
        match self {
            SessionError::Io { path, .. } => {
                format!("Could not save the conversation to {}.", path.display())
            }
            SessionError::Serialize { .. } => "Could not encode the conversation.".to_string(),
        }
    }
}
