use crate::generator::GenerationError;
use crate::html::error_html;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("bad request: {message}")]
    BadRequest { message: String, details: String },

    #[error("not found: {message}")]
    NotFound { message: String, details: String },

    #[error("too many requests")]
    TooManyRequests { retry_after_secs: u64, window_minutes: u64 },

    #[error("generation failed after {elapsed_ms}ms: {source}")]
    Generation { source: GenerationError, elapsed_ms: u128 },

    #[error("failed to render HTML: {0}")]
    Render(#[from] askama::Error),
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>, details: impl Into<String>) -> Self {
        ApiError::BadRequest { message: message.into(), details: details.into() }
    }

    pub fn not_found(message: impl Into<String>, details: impl Into<String>) -> Self {
        ApiError::NotFound { message: message.into(), details: details.into() }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorInfo {
    #[serde(rename = "type")]
    kind: String,
    processing_time: u128,
}

#[derive(Serialize)]
struct ErrorBody {
    code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<ErrorInfo>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, error, retry_after) = match self {
            ApiError::BadRequest { message, details } => (StatusCode::BAD_REQUEST, error_html(&message, &details), None, None),
            ApiError::NotFound { message, details } => (StatusCode::NOT_FOUND, error_html(&message, &details), None, None),
            ApiError::TooManyRequests { retry_after_secs, window_minutes } => (
                StatusCode::TOO_MANY_REQUESTS,
                error_html(
                    "Too many requests from your IP address.",
                    &format!("Please wait {window_minutes} minutes before trying again."),
                ),
                None,
                Some(retry_after_secs),
            ),
            ApiError::Generation { source, elapsed_ms } => {
                tracing::error!(error = %source, kind = source.kind(), processing_ms = elapsed_ms as u64, "generation failed");
                let (message, details) = source.friendly();
                let info = ErrorInfo { kind: source.kind().to_string(), processing_time: elapsed_ms };
                (StatusCode::INTERNAL_SERVER_ERROR, error_html(message, details), Some(info), None)
            }
            ApiError::Render(err) => {
                tracing::error!(error = %err, "template rendering failed");
                (StatusCode::INTERNAL_SERVER_ERROR, error_html("Something went wrong showing your creation", ""), None, None)
            }
        };

        let mut res = (status, Json(ErrorBody { code, error })).into_response();
        if let Some(retry) = retry_after {
            res.headers_mut().insert(header::RETRY_AFTER, retry.into());
        }
        res
    }
}
