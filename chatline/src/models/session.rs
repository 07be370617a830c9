//! Session model representing one conversation thread.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Message, MessageRole};

/// Title given to sessions before their first message.
pub const PLACEHOLDER_TITLE: &str = "New Chat";

/// A session is one conversation with its own history and title.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    /// Unique session identifier.
    pub id: String,
    /// Human-readable label shown in the session list.
    pub title: String,
    /// Conversation history, oldest first.
    pub messages: Vec<Message>,
    /// When the session was created.
    pub created_at: DateTime<Utc>,
    /// When the session was last mutated.
    pub updated_at: DateTime<Utc>,
}

impl Session {
    /// Create an empty session with the placeholder title.
    pub fn new(id: String, now: DateTime<Utc>) -> Self {
        Self {
            id,
            title: PLACEHOLDER_TITLE.to_string(),
            messages: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether the session has no messages yet.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Refresh `updated_at`, never moving it backwards.
    pub(crate) fn touch(&mut self, now: DateTime<Utc>) -> DateTime<Utc> {
        self.updated_at = self.updated_at.max(now);
        self.updated_at
    }

    /// Append a message and refresh `updated_at`.
    pub(crate) fn push(&mut self, role: MessageRole, content: String, now: DateTime<Utc>) {
        let stamp = self.touch(now);
        self.messages.push(Message::new(role, content, stamp));
    }

    /// The newest message, if any.
    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }
}
