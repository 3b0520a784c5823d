//! Bearer-token authentication middleware
//!
//! Dashboard and report routes require `Authorization: Bearer <token>`.
//! Token issuance and identity verification belong to the external identity
//! provider; this middleware only compares the presented token against the
//! configured value. An empty configured token disables checking entirely.

use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::warn;

use crate::AppState;

/// Authentication middleware
///
/// Returns 401 Unauthorized when the bearer token is missing or wrong.
/// Health and survey endpoints do NOT use this middleware.
pub async fn auth_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    // Empty configured token disables all auth checking
    if state.api_token.is_empty() {
        return Ok(next.run(request).await);
    }

    let header_value = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(AuthError::MissingCredentials)?;

    let token = header_value
        .strip_prefix("Bearer ")
        .ok_or(AuthError::MissingCredentials)?;

    if token != state.api_token {
        warn!("Rejected request with invalid bearer token");
        return Err(AuthError::InvalidToken);
    }

    // Authentication successful - proceed to handler
    Ok(next.run(request).await)
}

/// Authentication error types for HTTP responses
#[derive(Debug)]
pub enum AuthError {
    MissingCredentials,
    InvalidToken,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AuthError::MissingCredentials => (
                StatusCode::UNAUTHORIZED,
                "Missing bearer token".to_string(),
            ),
            AuthError::InvalidToken => {
                (StatusCode::UNAUTHORIZED, "Invalid bearer token".to_string())
            }
        };

        let body = Json(json!({
            "error": message,
        }));

        (status, body).into_response()
    }
}
