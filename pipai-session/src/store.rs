use crate::conversation::Conversation;
use crate::error::SessionError;
use crate::types::{ChatMessage, MessageRole};
use chrono::{DateTime, Utc};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

/// File name of the conversation slot inside the config directory.
pub const CONVERSATION_FILE: &str = "conversation.json";

/// Durable single-slot store for the active conversation.
///
/// Every mutation rewrites the slot before returning. The store assumes a
/// single writer; concurrent invocations must be serialised by the caller.
#[derive(Debug, Clone)]
pub struct ConversationStore {
    path: PathBuf,
}

impl ConversationStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store rooted in `dir`, using [`CONVERSATION_FILE`] as the slot.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self::new(dir.as_ref().join(CONVERSATION_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replaces whatever is stored with a fresh, empty, active conversation.
    pub fn start(&self) -> Result<Conversation, SessionError> {
        self.stop()?;
        let conversation = Conversation::start(Utc::now());
        self.save(&conversation)?;
        debug!(conversation = %conversation.id, "Started conversation");
        Ok(conversation)
    }

    /// Discards the stored conversation. Stopping nothing is not an error.
    pub fn stop(&self) -> Result<(), SessionError> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                debug!(path = %self.path.display(), "Stopped conversation");
                Ok(())
            }
            Err(source) if source.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(SessionError::Io {
                path: self.path.clone(),
                source,
            }),
        }
    }

    pub fn load(&self) -> Option<Conversation> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return None,
            Err(err) => {
                warn!(path = %self.path.display(), %err, "Conversation slot unreadable; ignoring it");
                return None;
            }
        };
        match serde_json::from_str(&content) {
            Ok(conversation) => Some(conversation),
            Err(err) => {
                warn!(path = %self.path.display(), %err, "Conversation slot corrupt; ignoring it");
                None
            }
        }
    }

    /// Appends a turn to the active conversation.
    ///
    /// Returns `Ok(false)` when there is no active conversation; the turn is
    /// dropped silently in that case.
    pub fn append(&self, role: MessageRole, content: impl Into<String>) -> Result<bool, SessionError> {
        let Some(mut conversation) = self.load() else {
            return Ok(false);
        };
        if !conversation.push(role, content, Utc::now()) {
            return Ok(false);
        }
        self.save(&conversation)?;
        Ok(true)
    }

    pub fn history_for_model(&self) -> Vec<ChatMessage> {
        self.load()
            .map(|conversation| conversation.history())
            .unwrap_or_default()
    }

    pub fn is_active(&self) -> bool {
        self.load().is_some_and(|conversation| conversation.active)
    }

    pub fn is_expired(&self, timeout: Duration) -> bool {
        self.is_expired_at(Utc::now(), timeout)
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>, timeout: Duration) -> bool {
        self.load()
            .is_some_and(|conversation| conversation.is_expired_at(now, timeout))
    }

    fn save(&self, conversation: &Conversation) -> Result<(), SessionError> {
        let encoded = serde_json::to_string_pretty(conversation)
            .map_err(|source| SessionError::Serialize { source })?;
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|source| self.io_error(source))?;
            }
        }
        let staging = self.path.with_extension("json.tmp");
        fs::write(&staging, encoded).map_err(|source| self.io_error(source))?;
        fs::rename(&staging, &self.path).map_err(|source| self.io_error(source))?;
        Ok(())
    }

    fn io_error(&self, source: io::Error) -> SessionError {
        SessionError::Io {
            path: self.path.clone(),
            source,
        }
    }
}
