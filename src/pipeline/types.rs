//! Shared types for the message processing pipeline.

use serde::{Deserialize, Serialize};

use crate::model::{Intelligence, Message};

// ── Request ─────────────────────────────────────────────────────────

/// One inbound turn of a scammer conversation.
///
/// Transport adapters convert their wire format into this struct; ids and
/// timestamps are already resolved by the time it reaches the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessRequest {
    pub session_id: String,
    pub message: Message,
    /// Earlier turns as the caller remembers them. Required to rebuild the
    /// session in stateless mode; checked against the store otherwise.
    #[serde(default)]
    pub conversation_history: Vec<Message>,
    #[serde(default)]
    pub metadata: RequestMetadata,
}

/// Optional context about where a message came from.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RequestMetadata {
    /// Source channel: "sms", "whatsapp", "email", etc.
    pub channel: Option<String>,
    /// Conversation language, e.g. "en" or "hi".
    pub language: Option<String>,
    pub locale: Option<String>,
}

// ── Response ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseStatus {
    Success,
    Error,
}

/// Derived per-turn metrics. Never stored apart from the session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngagementMetrics {
    pub duration_seconds: u64,
    pub message_count: usize,
    /// In `[0, 1]`.
    pub engagement_quality: f64,
    /// In `[0, 1]`.
    pub intelligence_score: f64,
}

/// Result of processing one turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessResponse {
    pub status: ResponseStatus,
    pub scam_detected: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_reply: Option<String>,
    pub engagement_metrics: EngagementMetrics,
    /// Intelligence accumulated over the whole session.
    pub extracted_intelligence: Intelligence,
    pub notes: String,
    pub session_id: String,
}

impl ProcessResponse {
    /// Response for a turn that failed after the session was loaded.
    ///
    /// Everything already committed to the session stays; the caller just
    /// gets nothing useful back for this turn.
    pub fn degraded(session_id: impl Into<String>, notes: impl Into<String>) -> Self {
        Self {
            status: ResponseStatus::Error,
            scam_detected: false,
            agent_reply: None,
            engagement_metrics: EngagementMetrics::default(),
            extracted_intelligence: Intelligence::default(),
            notes: notes.into(),
            session_id: session_id.into(),
        }
    }
}
