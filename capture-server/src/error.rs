//! Error types for the capture server.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

/// Result type alias for the capture server.
pub type Result<T> = std::result::Result<T, CaptureError>;

/// Errors that can occur while configuring or running the capture server.
#[derive(Error, Debug)]
pub enum CaptureError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Server startup error.
    #[error("Server error: {0}")]
    Server(String),

    /// The submission carried no `txt` parameter.
    #[error("No 'txt' parameter provided")]
    MissingText,

    /// The query string could not be decoded.
    #[error("Invalid query string: {0}")]
    InvalidQuery(String),

    /// Export file I/O error.
    #[error("{0}")]
    Io(#[from] std::io::Error),
}

impl CaptureError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::MissingText | Self::InvalidQuery(_) => StatusCode::BAD_REQUEST,
            Self::Configuration(_) | Self::Server(_) | Self::Io(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

/// Error body returned by the capture endpoints.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub status: &'static str,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            status: "error",
            message: message.into(),
        }
    }
}

impl IntoResponse for CaptureError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            crate::telemetry::Telemetry::record_error();
            tracing::error!(error = %self, "Capture request failed");
        } else {
            tracing::debug!(error = %self, "Rejected capture request");
        }

        (status, Json(ErrorResponse::new(self.to_string()))).into_response()
    }
}
