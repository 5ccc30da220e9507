//! Error types for the Pixelworks server

use axum::{
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::imaging::{CodecError, FilterError, RasterError};

/// Application-wide result type
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("File exceeds the {max} limit")]
    FileTooLarge { max: String },

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Multipart error: {0}")]
    Multipart(#[from] MultipartError),

    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("Filter error: {0}")]
    Filter(#[from] FilterError),

    #[error("Raster error: {0}")]
    Raster(#[from] RasterError),

    #[error("Worker task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
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
            AppError::FileTooLarge { max } => (
                StatusCode::PAYLOAD_TOO_LARGE,
                "file_too_large",
                format!("File size must be less than {}", max),
            ),
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                )
            }
            AppError::Multipart(e) => {
                tracing::warn!("Multipart error: {}", e);
                (e.status(), "multipart_error", e.body_text())
            }
            AppError::Codec(e) => match e {
                CodecError::UnsupportedMediaType(_) => (
                    StatusCode::UNSUPPORTED_MEDIA_TYPE,
                    "unsupported_media_type",
                    "File must be an image".to_string(),
                ),
                CodecError::UnsupportedFormat(_) => (
                    StatusCode::BAD_REQUEST,
                    "unsupported_format",
                    e.to_string(),
                ),
                CodecError::Decode(_) => (
                    StatusCode::BAD_REQUEST,
                    "decode_error",
                    "Failed to decode image".to_string(),
                ),
                CodecError::Raster(_) => (
                    StatusCode::BAD_REQUEST,
                    "invalid_image",
                    e.to_string(),
                ),
                CodecError::Encode(_) => {
                    tracing::error!("Encode error: {}", e);
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "encode_error",
                        "Failed to encode image".to_string(),
                    )
                }
            },
            AppError::Filter(e) => (StatusCode::BAD_REQUEST, "invalid_options", e.to_string()),
            AppError::Raster(e) => (StatusCode::BAD_REQUEST, "invalid_image", e.to_string()),
            AppError::Task(e) => {
                tracing::error!("Worker task failed: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
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
