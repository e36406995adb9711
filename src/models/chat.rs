//! Chat messages exchanged between the user and the assistant.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

/// A message as the user sees it.
///
/// The backend-bound copy of a user message may carry an extra scene-id hint;
/// that copy is built per turn and never stored here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// A conversation entry with the time it was recorded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationEntry {
    #[serde(flatten)]
    pub message: ChatMessage,
    pub at: DateTime<Utc>,
}

impl From<ChatMessage> for ConversationEntry {
    fn from(message: ChatMessage) -> Self {
        Self {
            message,
            at: Utc::now(),
        }
    }
}

/// Opening message of every new session.
pub const GREETING: &str =
    "Hello! I'm your AI assistant. How can I help you with your video intro script?";
