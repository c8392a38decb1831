use crate::types::{ChatMessage, MessageRole};
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

/// Idle time after which a stored conversation is considered stale.
pub const DEFAULT_EXPIRY: Duration = Duration::from_secs(60 * 60);

/// One role-tagged message inside a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: MessageRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

/// The single persisted conversation record.
///
/// Turns are append-only while the conversation is active and are kept in
/// causal order. An inactive conversation never contributes history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: Uuid,
    pub active: bool,
    #[serde(default)]
    pub messages: Vec<Turn>,
    pub started_at: DateTime<Utc>,
    pub last_message_at: DateTime<Utc>,
}

impl Conversation {
    pub fn start(now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            active: true,
            messages: Vec::new(),
            started_at: now,
            last_message_at: now,
        }
    }

    /// Appends a turn; returns `false` without touching anything when inactive.
    pub fn push(&mut self, role: MessageRole, content: impl Into<String>, now: DateTime<Utc>) -> bool {
        if !self.active {
            return false;
        }
        self.messages.push(Turn {
            role,
            content: content.into(),
            timestamp: now,
        });
        self.last_message_at = now;
        true
    }

    pub fn history(&self) -> Vec<ChatMessage> {
        if !self.active {
            return Vec::new();
        }
        self.messages
            .iter()
            .map(|turn| ChatMessage::new(turn.role, turn.content.clone()))
            .collect()
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>, timeout: Duration) -> bool {
        if !self.active {
            return false;
        }
        let timeout = TimeDelta::from_std(timeout).unwrap_or(TimeDelta::MAX);
        match self.last_message_at.checked_add_signed(timeout) {
            Some(deadline) => now > deadline,
            None => false,
        }
    }
}
