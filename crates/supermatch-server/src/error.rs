//! Mapping from domain errors to HTTP responses.

use std::time::Duration;

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use tracing::error;

use supermatch_core::Error;

#[derive(Debug)]
pub enum ApiError {
    Domain(Error),
    Timeout(Duration),
}

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        Self::Domain(e)
    }
}

/// Malformed or mistyped request bodies are client errors with the usual
/// `{"error": ...}` body.
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Domain(Error::InvalidRequest(rejection.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::Domain(Error::InvalidRequest(msg)) => (StatusCode::BAD_REQUEST, msg),
            Self::Domain(Error::NotFound(msg)) => (StatusCode::NOT_FOUND, msg),
            Self::Timeout(limit) => (
                StatusCode::GATEWAY_TIMEOUT,
                format!("request exceeded {}s", limit.as_secs()),
            ),
            Self::Domain(e) => {
                error!("Request failed: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
            }
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}
