//! API key authentication middleware
//!
//! Protected routes require an `X-API-Key` header carrying a valid key;
//! mutating methods additionally require a key with write permission. The
//! health endpoint does NOT use this middleware.

use affils_common::api::auth::{validate_api_key, ApiAuthError};
use axum::{
    extract::{Request, State},
    http::{Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::warn;

use crate::AppState;

/// Header carrying the raw API key
pub const API_KEY_HEADER: &str = "x-api-key";

/// Authentication middleware for protected routes
pub async fn auth_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let raw_key = request
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|value| value.to_str().ok())
        .ok_or(AuthError::MissingKey)?;

    // Reads are open to any valid key; writes need the can_write capability
    let require_write = matches!(
        *request.method(),
        Method::POST | Method::PUT | Method::PATCH | Method::DELETE
    );

    validate_api_key(&state.db, raw_key, require_write)
        .await
        .map_err(|e| {
            warn!("API key rejected: {}", e);
            AuthError::from(e)
        })?;

    Ok(next.run(request).await)
}

/// Authentication error types for HTTP responses
#[derive(Debug)]
pub enum AuthError {
    MissingKey,
    InvalidKey,
    Forbidden(String),
    Internal(String),
}

impl From<ApiAuthError> for AuthError {
    fn from(err: ApiAuthError) -> Self {
        match err {
            ApiAuthError::MissingKey => AuthError::MissingKey,
            ApiAuthError::InvalidKey => AuthError::InvalidKey,
            ApiAuthError::Revoked | ApiAuthError::Expired | ApiAuthError::WriteForbidden => {
                AuthError::Forbidden(err.to_string())
            }
            ApiAuthError::DatabaseError(msg) => AuthError::Internal(msg),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AuthError::MissingKey => (
                StatusCode::UNAUTHORIZED,
                "No API key was provided in the request headers".to_string(),
            ),
            AuthError::InvalidKey => (
                StatusCode::UNAUTHORIZED,
                "The provided API key is invalid".to_string(),
            ),
            AuthError::Forbidden(message) => (StatusCode::FORBIDDEN, message),
            AuthError::Internal(message) => {
                tracing::error!("Authentication database error: {}", message);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": message,
        }));

        (status, body).into_response()
    }
}
