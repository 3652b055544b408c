use axum::{Json, http::StatusCode, response::{IntoResponse, Response}};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Backend request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Not found")]
    NotFound,

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Could not parse file: {0}")]
    Parse(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("No data: {0}")]
    NoData(String),

    /// The selected backend does not support this operation.
    #[error("Not implemented on this backend: {0}")]
    Unimplemented(String),

    #[error("Stopped after {completed} of {total}: {reason}")]
    BatchAborted {
        completed: usize,
        total: usize,
        reason: String,
    },

    #[error("Export failed: {0}")]
    Export(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal server error")]
    InternalServerError,
}

impl AppError {
    pub fn is_unimplemented(&self) -> bool {
        matches!(self, AppError::Unimplemented(_))
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::NotFound => (StatusCode::NOT_FOUND, "Not Found".to_string()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Parse(msg) => (StatusCode::BAD_REQUEST, format!("Could not parse file: {}", msg)),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            AppError::NoData(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Unimplemented(msg) => (StatusCode::NOT_IMPLEMENTED, msg),
            e @ AppError::BatchAborted { .. } => {
                error!("batch aborted: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
            }
            AppError::Database(e) => {
                error!("database error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Database error occurred".to_string(),
                )
            }
            AppError::Http(e) => {
                error!("backend request error: {}", e);
                (
                    StatusCode::BAD_GATEWAY,
                    "Backend request failed".to_string(),
                )
            }
            AppError::Export(msg) => {
                error!("export error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Export failed".to_string())
            }
            AppError::Config(msg) => {
                error!("configuration error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
            AppError::InternalServerError => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        };

        let body = Json(ErrorResponse {
            error: status.to_string(),
            message: error_message,
        });

        (status, body).into_response()
    }
}
