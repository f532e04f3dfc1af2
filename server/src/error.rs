use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use speech_core::SpeechError;
use stream_core::StreamError;
use thiserror::Error;

/// API Error types
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A provider secret is not configured. Answered with a fixed plain-text
    /// body and the provider is never contacted.
    #[error("{0}")]
    MissingCredential(&'static str),

    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("Upstream timed out after {0} seconds")]
    Timeout(u64),
}

/// Error response structure
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    code: u16,
}

impl From<StreamError> for ApiError {
    fn from(e: StreamError) -> Self {
        match e {
            StreamError::Timeout(secs) => ApiError::Timeout(secs),
            StreamError::Status { status, body } => {
                ApiError::Upstream(format!("model endpoint returned {status}: {body}"))
            }
            other => ApiError::Upstream(other.to_string()),
        }
    }
}

impl From<SpeechError> for ApiError {
    fn from(e: SpeechError) -> Self {
        match e {
            SpeechError::Status { status, body } => {
                ApiError::Upstream(format!("speech provider returned {status}: {body}"))
            }
            other => ApiError::Upstream(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            ApiError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::MissingCredential(msg) => {
                tracing::error!("{}", msg);
                return (StatusCode::INTERNAL_SERVER_ERROR, msg).into_response();
            }
            ApiError::Upstream(msg) => {
                tracing::error!("Upstream error: {}", msg);
                (StatusCode::BAD_GATEWAY, msg)
            }
            ApiError::Timeout(secs) => {
                tracing::error!("Upstream timed out after {} seconds", secs);
                (
                    StatusCode::GATEWAY_TIMEOUT,
                    format!("Upstream timed out after {secs} seconds"),
                )
            }
        };

        let body = Json(ErrorResponse {
            error: error_message,
            code: status.as_u16(),
        });

        (status, body).into_response()
    }
}
