//! Conversation session state.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::intelligence::Intelligence;
use super::message::Message;
use super::verdict::ScamVerdict;

/// Lifecycle status of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Active,
    Completed,
    Terminated,
    Error,
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Terminated => "terminated",
            Self::Error => "error",
        };
        write!(f, "{s}")
    }
}

/// Accumulated state of one scammer conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub session_id: String,
    pub created_at: DateTime<Utc>,
    /// Advances on every message or classification added.
    pub updated_at: DateTime<Utc>,
    pub status: SessionStatus,
    pub messages: Vec<Message>,
    pub classifications: Vec<ScamVerdict>,
    pub accumulated_intelligence: Option<Intelligence>,
    /// Free-form notes, set from the latest positive verdict's reasoning.
    pub notes: String,
    /// Whether this conversation has been reported to the callback endpoint.
    #[serde(default)]
    pub reported: bool,
}

impl Session {
    /// Create an empty, active session stamped now.
    pub fn new(session_id: impl Into<String>) -> Self {
        Self::with_created_at(session_id, Utc::now())
    }

    /// Create an empty, active session with an explicit creation time.
    pub fn with_created_at(session_id: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            session_id: session_id.into(),
            created_at,
            updated_at: created_at,
            status: SessionStatus::Active,
            messages: Vec::new(),
            classifications: Vec::new(),
            accumulated_intelligence: None,
            notes: String::new(),
            reported: false,
        }
    }

    /// Append a message unless one with the same id is already present.
    ///
    /// Returns `false` for a duplicate (nothing changes).
    pub fn add_message(&mut self, message: Message) -> bool {
        if self.has_message(&message.message_id) {
            return false;
        }
        self.messages.push(message);
        self.touch();
        true
    }

    /// Append a verdict to the classification history.
    pub fn add_classification(&mut self, verdict: ScamVerdict) {
        self.classifications.push(verdict);
        self.touch();
    }

    pub fn has_message(&self, message_id: &str) -> bool {
        self.messages.iter().any(|m| m.message_id == message_id)
    }

    pub fn message_count(&self) -> usize {
        self.messages.len()
    }

    /// Mark the conversation reported. Returns `false` if it already was.
    pub fn mark_reported(&mut self) -> bool {
        !std::mem::replace(&mut self.reported, true)
    }

    /// Whether any recorded verdict flagged this conversation as a scam.
    pub fn ever_flagged(&self) -> bool {
        self.classifications.iter().any(|v| v.is_scam)
    }

    /// Whole seconds between creation and `now`, never negative.
    pub fn duration_seconds(&self, now: DateTime<Utc>) -> u64 {
        now.signed_duration_since(self.created_at).num_seconds().max(0) as u64
    }

    /// Whether the session has been idle for longer than `timeout`.
    pub fn is_idle(&self, timeout: Duration, now: DateTime<Utc>) -> bool {
        let idle = now.signed_duration_since(self.updated_at);
        match chrono::Duration::from_std(timeout) {
            Ok(limit) => idle > limit,
            // Timeout too large to represent: never idle.
            Err(_) => false,
        }
    }

    /// Compact view for logs and reports.
    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            session_id: self.session_id.clone(),
            status: self.status,
            message_count: self.messages.len(),
            duration_seconds: self.duration_seconds(self.updated_at),
            classification_count: self.classifications.len(),
            has_intelligence: self
                .accumulated_intelligence
                .as_ref()
                .is_some_and(|i| !i.is_empty()),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    fn touch(&mut self) {
        // Monotonic even if the wall clock steps backwards.
        self.updated_at = Utc::now().max(self.updated_at);
    }
}

/// Summary of a session, suitable for structured logging.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSummary {
    pub session_id: String,
    pub status: SessionStatus,
    pub message_count: usize,
    pub duration_seconds: u64,
    pub classification_count: usize,
    pub has_intelligence: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
