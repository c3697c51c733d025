//! HTTP routes for the honeypot API.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use secrecy::SecretString;
use tower_http::cors::CorsLayer;
use tracing::{error, warn};

use super::auth::require_api_key;
use super::wire::{WireRequest, WireResponse};
use crate::error::{PipelineError, SessionError};
use crate::pipeline::MessageProcessor;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub processor: Arc<MessageProcessor>,
    /// Accepted `x-api-key` values; empty disables authentication.
    pub api_keys: Arc<[SecretString]>,
}

impl AppState {
    pub fn new(processor: Arc<MessageProcessor>, api_keys: Vec<SecretString>) -> Self {
        Self {
            processor,
            api_keys: api_keys.into(),
        }
    }
}

/// Build the Axum router. `/health` is never authenticated.
pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/api/v1/process-message", post(process_message))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_api_key,
        ));

    Router::new()
        .route("/health", get(health))
        .merge(api)
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// `{status: "error", message, error_code}` with the given status code.
pub(crate) fn error_response(
    status: StatusCode,
    message: impl Into<String>,
    error_code: &str,
) -> (StatusCode, Json<serde_json::Value>) {
    (
        status,
        Json(serde_json::json!({
            "status": "error",
            "message": message.into(),
            "error_code": error_code,
        })),
    )
}

// ── Health ──────────────────────────────────────────────────────────────

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({"status": "healthy", "service": "scam-honeypot"}))
}

// ── Process message ─────────────────────────────────────────────────────

async fn process_message(
    State(state): State<AppState>,
    body: Result<Json<WireRequest>, JsonRejection>,
) -> Response {
    let Json(body) = match body {
        Ok(body) => body,
        Err(rejection) => {
            warn!(error = %rejection.body_text(), "Malformed request body");
            return error_response(
                StatusCode::BAD_REQUEST,
                format!("Request validation failed: {}", rejection.body_text()),
                "VALIDATION_ERROR",
            )
            .into_response();
        }
    };

    let request = match body.into_request() {
        Ok(request) => request,
        Err(e) => {
            warn!(error = %e, "Invalid request");
            return error_response(StatusCode::BAD_REQUEST, e.to_string(), "VALIDATION_ERROR")
                .into_response();
        }
    };

    match state.processor.process_message(request).await {
        Ok(response) => (StatusCode::OK, Json(WireResponse::from(response))).into_response(),
        Err(e) => pipeline_error_response(&e).into_response(),
    }
}

fn pipeline_error_response(err: &PipelineError) -> (StatusCode, Json<serde_json::Value>) {
    match err {
        PipelineError::Validation(e) => {
            warn!(error = %e, "Request rejected");
            error_response(StatusCode::BAD_REQUEST, e.to_string(), "VALIDATION_ERROR")
        }
        PipelineError::Session(SessionError::CapacityExceeded { .. }) => {
            warn!(error = %err, "Session capacity reached");
            error_response(
                StatusCode::SERVICE_UNAVAILABLE,
                err.to_string(),
                "CAPACITY_EXCEEDED",
            )
        }
        PipelineError::Session(e) => {
            error!(error = %e, "Session error");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string(), "SESSION_ERROR")
        }
        PipelineError::Internal { reason } => {
            error!(reason = %reason, "Internal pipeline error");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error",
                "INTERNAL_ERROR",
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidationError;

    #[test]
    fn maps_pipeline_errors_to_status_codes() {
        let (status, Json(body)) =
            pipeline_error_response(&ValidationError::EmptyMessageText.into());
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error_code"], "VALIDATION_ERROR");
        assert_eq!(body["status"], "error");

        let (status, Json(body)) =
            pipeline_error_response(&SessionError::CapacityExceeded { max: 1 }.into());
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["error_code"], "CAPACITY_EXCEEDED");

        let (status, Json(body)) = pipeline_error_response(&PipelineError::Internal {
            reason: "boom".into(),
        });
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["message"], "Internal server error");
    }
}
