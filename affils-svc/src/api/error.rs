//! Error-to-HTTP mapping
//!
//! Validation failures surface as structured, field-attributed JSON bodies;
//! internal failures are reported opaquely with no detail about service
//! state.

use affils_common::Error;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Map, Value};
use tracing::error;

/// Wrapper turning [`affils_common::Error`] into an HTTP response
#[derive(Debug)]
pub struct ApiError(pub Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match &self.0 {
            Error::NotFound(message) => (
                StatusCode::NOT_FOUND,
                json!({ "error": message }),
            ),
            Error::InvalidInput { field, message } => (
                StatusCode::BAD_REQUEST,
                validation_body("Invalid input", field, message),
            ),
            Error::OutOfRange(message) => (
                StatusCode::BAD_REQUEST,
                validation_body(message, "non_field_errors", message),
            ),
            Error::InconsistentIdentifier { .. } => {
                let message = self.0.to_string();
                (
                    StatusCode::BAD_REQUEST,
                    validation_body(&message, "non_field_errors", &message),
                )
            }
            Error::DuplicateIdentifier { fields } => {
                let mut details = Map::new();
                for field in fields {
                    details.insert(
                        field.clone(),
                        json!([format!("An affiliation with this {} already exists.", field)]),
                    );
                }
                (
                    StatusCode::BAD_REQUEST,
                    json!({ "error": self.0.to_string(), "details": details }),
                )
            }
            Error::ImmutableField { fields } => {
                let mut details = Map::new();
                for field in fields {
                    details.insert(
                        field.clone(),
                        json!([format!("{} is a read-only field and cannot be updated.", field)]),
                    );
                }
                (
                    StatusCode::BAD_REQUEST,
                    json!({ "error": self.0.to_string(), "details": details }),
                )
            }
            Error::TypeWorkingGroupMismatch(message) => (
                StatusCode::BAD_REQUEST,
                validation_body(message, "non_field_errors", message),
            ),
            Error::Database(_) | Error::Io(_) | Error::Config(_) | Error::Internal(_) => {
                // Never leak internal state to the caller
                error!("Internal error handling request: {}", self.0);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "Internal server error" }),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}

fn validation_body(error: &str, field: &str, message: &str) -> Value {
    json!({
        "error": error,
        "details": { field: [message] },
    })
}
