//! Conversation messages.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Sender label used for replies produced by the honeypot persona.
pub const AGENT_SENDER: &str = "agent";

/// A single message in a conversation.
///
/// Immutable once created. `message_id` identifies the message within its
/// session; resubmitting the same id is a no-op.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Who sent it ("scammer", "user", [`AGENT_SENDER`], ...).
    pub sender: String,
    /// Message body.
    pub text: String,
    /// When the message was sent.
    pub timestamp: DateTime<Utc>,
    /// Identifier, unique within a session.
    pub message_id: String,
}

impl Message {
    /// Create a message.
    pub fn new(
        sender: impl Into<String>,
        text: impl Into<String>,
        timestamp: DateTime<Utc>,
        message_id: impl Into<String>,
    ) -> Self {
        Self {
            sender: sender.into(),
            text: text.into(),
            timestamp,
            message_id: message_id.into(),
        }
    }

    /// Create a persona reply stamped now with a fresh id.
    pub fn agent(text: impl Into<String>) -> Self {
        Self::new(
            AGENT_SENDER,
            text,
            Utc::now(),
            format!("agent-{}", Uuid::new_v4()),
        )
    }

    /// Whether this message was written by the honeypot itself.
    pub fn is_from_agent(&self) -> bool {
        self.sender == AGENT_SENDER
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn agent_messages_get_unique_ids() {
        let a = Message::agent("hello");
        let b = Message::agent("hello");
        assert!(a.is_from_agent());
        assert_ne!(a.message_id, b.message_id);
        assert!(a.message_id.starts_with("agent-"));
    }

    #[test]
    fn scammer_message_is_not_agent() {
        let msg = Message::new("scammer", "pay now", Utc::now(), "m1");
        assert!(!msg.is_from_agent());
    }
}
