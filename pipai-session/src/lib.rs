//! # pipai-session
//!
//! Durable conversation state shared by independent `pipai` invocations.
//!
//! There is at most one conversation at a time: [`ConversationStore`] owns a
//! single persisted slot that is replaced by `start`, extended by `append`
//! and removed by `stop`. Staleness is reported by `is_expired`, never acted
//! on automatically.

pub mod conversation;
pub mod error;
pub mod store;
pub mod types;

pub use conversation::{Conversation, DEFAULT_EXPIRY, Turn};
pub use error::SessionError;
pub use store::{CONVERSATION_FILE, ConversationStore};
pub use types::{ChatMessage, MessageRole};
