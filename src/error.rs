//! Error types for the honeypot.

use std::time::Duration;

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Session store errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("Session {id} not found or expired")]
    NotFound { id: String },

    #[error("Session {id} already exists")]
    AlreadyExists { id: String },

    #[error("Maximum concurrent sessions ({max}) reached")]
    CapacityExceeded { max: usize },
}

/// Request rejected before entering the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Session ID cannot be empty")]
    EmptySessionId,

    #[error("Message text cannot be empty")]
    EmptyMessageText,

    #[error("Invalid field {field}: {reason}")]
    InvalidField { field: String, reason: String },
}

/// Response generator (LLM) failures.
#[derive(Debug, thiserror::Error)]
pub enum GeneratorError {
    #[error("Provider {provider} request failed: {reason}")]
    RequestFailed { provider: String, reason: String },

    #[error("Provider {provider} gave up after {attempts} attempts")]
    RetryExhausted { provider: String, attempts: usize },

    #[error("Response generation timed out after {timeout:?}")]
    Timeout { timeout: Duration },
}

/// Callback dispatch failures.
#[derive(Debug, thiserror::Error)]
pub enum CallbackError {
    #[error("No callback URL configured")]
    NotConfigured,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Callback endpoint returned status {status}")]
    Status { status: u16 },

    #[error("Callback failed after {attempts} attempts: {last}")]
    RetryExhausted { attempts: usize, last: String },
}

impl CallbackError {
    /// Transport failures, throttling and server errors are worth retrying.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http(_) => true,
            Self::Status { status } => *status == 429 || *status >= 500,
            Self::NotConfigured | Self::RetryExhausted { .. } => false,
        }
    }
}

/// Errors surfaced by the message pipeline to its transport.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Invalid request: {0}")]
    Validation(#[from] ValidationError),

    #[error("Session unavailable: {0}")]
    Session(#[from] SessionError),

    #[error("Internal error: {reason}")]
    Internal { reason: String },
}

impl PipelineError {
    /// Whether the caller may retry the same request later.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Session(SessionError::CapacityExceeded { .. })
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capacity_is_retryable() {
        let err = PipelineError::from(SessionError::CapacityExceeded { max: 10 });
        assert!(err.is_retryable());
        assert!(err.to_string().contains("10"));
    }

    #[test]
    fn validation_is_not_retryable() {
        let err = PipelineError::from(ValidationError::EmptyMessageText);
        assert!(!err.is_retryable());
    }
}
