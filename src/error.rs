//! Error types for the AeroPdf server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::engine::EngineError;

/// Application-wide result type
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl AppError {
    fn parts(&self) -> (StatusCode, &'static str, String) {
        match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg.clone()),
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                )
            }
            AppError::Engine(e) => match e {
                EngineError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found", e.to_string()),
                EngineError::OutOfRange { .. } => {
                    (StatusCode::BAD_REQUEST, "out_of_range", e.to_string())
                }
                EngineError::InvalidGeometry(_) => (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    "invalid_geometry",
                    e.to_string(),
                ),
                EngineError::UnsupportedInput(_) => {
                    (StatusCode::BAD_REQUEST, "unsupported_input", e.to_string())
                }
                EngineError::DocumentRead(_) => {
                    tracing::error!("Document read error: {}", e);
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "document_read_error",
                        "Failed to read document".to_string(),
                    )
                }
                EngineError::DocumentWrite(_) => {
                    tracing::error!("Document write error: {}", e);
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "document_write_error",
                        "Failed to write document".to_string(),
                    )
                }
                EngineError::Render(_) | EngineError::Timeout(_) | EngineError::Worker(_) => {
                    tracing::error!("Engine error: {}", e);
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "engine_error",
                        e.to_string(),
                    )
                }
            },
            AppError::Database(e) => {
                tracing::error!("Database error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "database_error",
                    "Database error".to_string(),
                )
            }
            AppError::Io(e) => {
                tracing::error!("IO error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "io_error",
                    "IO error".to_string(),
                )
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = self.parts();

        let body = Json(ErrorResponse {
            error: error_type.to_string(),
            message,
            details: if cfg!(debug_assertions) {
                Some(self.to_string())
            } else {
                None
            },
        });

        (status, body).into_response()
    }
}
