//! Typed HTTP client for a running capture server.
//!
//! Every capture endpoint answers with a JSON body carrying a `status`
//! field, including the 400 and 500 error replies, so the client decodes
//! the body regardless of the HTTP status.

use serde::Deserialize;
use thiserror::Error;

/// Errors raised by [`CaptureClient`].
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid base URL: {0}")]
    InvalidBaseUrl(String),

    #[error("Unexpected reply ({status}): {body}")]
    UnexpectedReply { status: u16, body: String },
}

pub type ClientResult<T> = Result<T, ClientError>;

/// Reply to `GET /saveTxt.js`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum SubmitReply {
    Saved {
        message: String,
        line_preview: String,
        #[serde(default)]
        session_file: Option<String>,
        total_lines: usize,
    },
    Duplicate {
        message: String,
    },
    Error {
        message: String,
    },
}

impl SubmitReply {
    pub fn status(&self) -> &'static str {
        match self {
            Self::Saved { .. } => "saved",
            Self::Duplicate { .. } => "duplicate",
            Self::Error { .. } => "error",
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::Saved { message, .. }
            | Self::Duplicate { message }
            | Self::Error { message } => message,
        }
    }
}

/// Reply to `GET /reset`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ResetReply {
    pub status: String,
    pub message: String,
}

/// Reply to `GET /health`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct HealthReply {
    pub status: String,
    pub session_active: bool,
    pub session_file: Option<String>,
    pub total_lines: usize,
}

/// Client for the capture endpoints.
#[derive(Debug, Clone)]
pub struct CaptureClient {
    http: reqwest::Client,
    base_url: String,
}

impl CaptureClient {
    /// Creates a client for the server at `base_url`, e.g. `http://127.0.0.1:3010`.
    pub fn new(base_url: impl Into<String>) -> ClientResult<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ClientError::InvalidBaseUrl(base_url));
        }
        Ok(Self {
            http: reqwest::Client::new(),
            base_url,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Clears the server's session.
    pub async fn reset(&self) -> ClientResult<ResetReply> {
        let response = self
            .http
            .get(format!("{}/reset", self.base_url))
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json().await?)
    }

    /// Submits one fragment.
    pub async fn submit(&self, text: &str) -> ClientResult<SubmitReply> {
        let response = self
            .http
            .get(format!("{}/saveTxt.js", self.base_url))
            .query(&[("txt", text)])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|_| ClientError::UnexpectedReply {
            status: status.as_u16(),
            body,
        })
    }

    /// Reads the server's session summary.
    pub async fn health(&self) -> ClientResult<HealthReply> {
        let response = self
            .http
            .get(format!("{}/health", self.base_url))
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json().await?)
    }
}
