use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::warn;

use crate::ScriptError;

/// Failure of an HTTP request, rendered as `{"error": message}`.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Script(ScriptError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Script(err) => match err {
                ScriptError::Validation(_) => StatusCode::BAD_REQUEST,
                ScriptError::SceneNotFound { .. } => StatusCode::NOT_FOUND,
                ScriptError::Conflict(_) | ScriptError::StaleSuggestion { .. } => {
                    StatusCode::CONFLICT
                }
                ScriptError::Timeout(_) => StatusCode::REQUEST_TIMEOUT,
                ScriptError::MalformedDirective(_) | ScriptError::MalformedBackendResponse(_) => {
                    StatusCode::UNPROCESSABLE_ENTITY
                }
                ScriptError::BackendUnavailable { .. } | ScriptError::Config(_) => {
                    StatusCode::FAILED_DEPENDENCY
                }
            },
        }
    }
}

impl From<ScriptError> for ApiError {
    fn from(err: ScriptError) -> Self {
        ApiError::Script(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            ApiError::BadRequest(msg) => msg,
            ApiError::Script(err) => err.to_string(),
        };
        warn!(status = status.as_u16(), "Request failed: {}", message);

        (status, Json(json!({ "error": message }))).into_response()
    }
}
