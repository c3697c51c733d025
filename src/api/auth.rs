//! `x-api-key` authentication.

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use secrecy::ExposeSecret;
use tracing::{debug, warn};

use super::routes::{AppState, error_response};

pub const API_KEY_HEADER: &str = "x-api-key";

/// Reject requests without a configured API key. With no keys configured
/// every request passes.
pub async fn require_api_key(State(state): State<AppState>, request: Request, next: Next) -> Response {
    if state.api_keys.is_empty() {
        return next.run(request).await;
    }

    let path = request.uri().path().to_string();
    let Some(provided) = request
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
    else {
        warn!(path = %path, "Missing API key");
        return error_response(
            StatusCode::UNAUTHORIZED,
            "Missing x-api-key header",
            "MISSING_API_KEY",
        )
        .into_response();
    };

    let valid = state
        .api_keys
        .iter()
        .any(|key| constant_time_eq(key.expose_secret().as_bytes(), provided.as_bytes()));
    if !valid {
        warn!(path = %path, "Invalid API key");
        return error_response(StatusCode::UNAUTHORIZED, "Invalid API key", "INVALID_API_KEY")
            .into_response();
    }

    debug!(path = %path, "API key accepted");
    next.run(request).await
}

/// Compare without short-circuiting on the first differing byte.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
