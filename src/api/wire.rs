//! JSON wire format for the HTTP API.
//!
//! Clients send either snake_case or camelCase keys, and timestamps as epoch
//! milliseconds or RFC 3339 strings. Everything is normalized here before
//! the request reaches the pipeline.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;
use crate::model::{Intelligence, Message};
use crate::pipeline::types::{ProcessRequest, ProcessResponse, RequestMetadata, ResponseStatus};

/// Sender assumed when a message omits one.
const DEFAULT_SENDER: &str = "scammer";

// ── Request ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct WireRequest {
    #[serde(alias = "sessionId")]
    pub session_id: String,
    pub message: WireMessage,
    #[serde(default, alias = "conversationHistory")]
    pub conversation_history: Vec<WireMessage>,
    #[serde(default)]
    pub metadata: Option<WireMetadata>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WireMessage {
    #[serde(default)]
    pub sender: Option<String>,
    pub text: String,
    #[serde(default)]
    pub timestamp: Option<WireTimestamp>,
    #[serde(default, alias = "messageId", alias = "id")]
    pub message_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum WireTimestamp {
    /// Milliseconds since the Unix epoch.
    Millis(i64),
    Text(String),
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WireMetadata {
    #[serde(default)]
    pub channel: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub locale: Option<String>,
}

impl WireTimestamp {
    fn resolve(&self, field: &str) -> Result<DateTime<Utc>, ValidationError> {
        let invalid = |reason: String| ValidationError::InvalidField {
            field: field.to_string(),
            reason,
        };

        match self {
            Self::Millis(ms) => DateTime::from_timestamp_millis(*ms)
                .ok_or_else(|| invalid(format!("epoch milliseconds out of range: {ms}"))),
            Self::Text(text) => {
                let text = text.trim();
                if let Ok(ms) = text.parse::<i64>() {
                    return Self::Millis(ms).resolve(field);
                }
                if let Ok(ts) = DateTime::parse_from_rfc3339(text) {
                    return Ok(ts.with_timezone(&Utc));
                }
                // Naive ISO 8601 timestamps are taken as UTC.
                NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f")
                    .map(|naive| naive.and_utc())
                    .map_err(|_| invalid(format!("unrecognized timestamp {text:?}")))
            }
        }
    }
}

impl WireMessage {
    fn into_message(self, field: &str) -> Result<Message, ValidationError> {
        let timestamp = match &self.timestamp {
            Some(ts) => ts.resolve(&format!("{field}.timestamp"))?,
            None => Utc::now(),
        };
        let sender = self
            .sender
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_SENDER.to_string());
        let message_id = self
            .message_id
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        Ok(Message::new(sender, self.text, timestamp, message_id))
    }
}

impl WireRequest {
    /// Normalize into a pipeline request. Content checks (empty text and
    /// the like) are left to the pipeline.
    pub fn into_request(self) -> Result<ProcessRequest, ValidationError> {
        let message = self.message.into_message("message")?;
        let conversation_history = self
            .conversation_history
            .into_iter()
            .enumerate()
            .map(|(i, m)| m.into_message(&format!("conversation_history[{i}]")))
            .collect::<Result<Vec<_>, _>>()?;
        let metadata = self.metadata.unwrap_or_default();

        Ok(ProcessRequest {
            session_id: self.session_id,
            message,
            conversation_history,
            metadata: RequestMetadata {
                channel: metadata.channel,
                language: metadata.language,
                locale: metadata.locale,
            },
        })
    }
}

// ── Response ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireMetrics {
    pub conversation_duration: u64,
    pub message_count: usize,
    pub engagement_quality: f64,
    pub intelligence_score: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireResponse {
    pub status: ResponseStatus,
    pub scam_detected: bool,
    pub agent_response: Option<String>,
    /// Same as `agent_response`, for clients that read `reply`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply: Option<String>,
    pub engagement_metrics: WireMetrics,
    pub extracted_intelligence: Intelligence,
    pub agent_notes: String,
    pub session_id: String,
}

impl From<ProcessResponse> for WireResponse {
    fn from(response: ProcessResponse) -> Self {
        let metrics = response.engagement_metrics;
        Self {
            status: response.status,
            scam_detected: response.scam_detected,
            reply: response.agent_reply.clone(),
            agent_response: response.agent_reply,
            engagement_metrics: WireMetrics {
                conversation_duration: metrics.duration_seconds,
                message_count: metrics.message_count,
                engagement_quality: metrics.engagement_quality,
                intelligence_score: metrics.intelligence_score,
            },
            extracted_intelligence: response.extracted_intelligence,
            agent_notes: response.notes,
            session_id: response.session_id,
        }
    }
}
