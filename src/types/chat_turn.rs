use std::fmt;

use serde::{Deserialize, Serialize};

/// One message in a conversation.
///
/// Turns are immutable once appended to a [`ConversationHistory`](crate::ConversationHistory).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatTurn {
    /// Who produced the turn.
    pub role: ChatRole,

    /// The text of the turn.
    pub content: String,
}

/// Role of a chat turn.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    /// User role.
    User,

    /// Assistant role.
    Assistant,
}

impl ChatTurn {
    /// Create a new `ChatTurn` with the given role and content.
    pub fn new(role: ChatRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    /// Create a new user turn.
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(ChatRole::User, content)
    }

    /// Create a new assistant turn.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(ChatRole::Assistant, content)
    }

    /// Returns true if this turn was written by the user.
    pub fn is_user(&self) -> bool {
        self.role == ChatRole::User
    }
}

impl fmt::Display for ChatRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChatRole::User => write!(f, "user"),
            ChatRole::Assistant => write!(f, "assistant"),
        }
    }
}
