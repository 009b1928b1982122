use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::embedding::EmbeddingError;
use crate::parsing::ParseError;
use crate::pipeline::{PipelineError, StageError};
use crate::store::PersistenceError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Pipeline(e) => match e.cause {
                StageError::UnsupportedFormat(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
                StageError::Parse(ParseError::Generation(_)) => StatusCode::BAD_GATEWAY,
                StageError::Extraction(_) | StageError::Parse(_) => {
                    StatusCode::UNPROCESSABLE_ENTITY
                }
                StageError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
                StageError::Embedding(EmbeddingError::InputTooLong { .. }) => {
                    StatusCode::PAYLOAD_TOO_LARGE
                }
                StageError::Embedding(EmbeddingError::EmptyInput) => {
                    StatusCode::UNPROCESSABLE_ENTITY
                }
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            AppError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            AppError::NotFound(msg) => json!({
                "error": { "code": "NOT_FOUND", "message": msg }
            }),
            AppError::Validation(msg) => json!({
                "error": { "code": "VALIDATION_ERROR", "message": msg }
            }),
            AppError::Pipeline(e) => {
                let message = if status.is_server_error() && status != StatusCode::GATEWAY_TIMEOUT {
                    tracing::error!("Pipeline error: {e}");
                    format!("An internal error occurred during the {} stage", e.stage)
                } else {
                    e.cause.to_string()
                };
                json!({
                    "error": { "code": e.code(), "stage": e.stage, "message": message }
                })
            }
            AppError::Persistence(e) => {
                tracing::error!("Persistence error: {e}");
                json!({
                    "error": {
                        "code": "PERSISTENCE_ERROR",
                        "message": "A storage error occurred"
                    }
                })
            }
        };

        (status, Json(body)).into_response()
    }
}
