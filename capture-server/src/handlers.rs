//! HTTP request handlers for the capture server.

use axum::{
    Json,
    extract::{Query, Request, State},
    http::{Method, Uri},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use std::sync::Arc;
use tower::ServiceExt;
use tower_http::services::ServeDir;

use crate::error::{CaptureError, Result};
use crate::session::{LOG_PREVIEW_CHARS, REPLY_PREVIEW_CHARS, SubmitOutcome, preview};
use crate::state::AppState;
use crate::telemetry::Telemetry;

/// Path prefix that triggers a submission.
pub const SUBMIT_PATH: &str = "/saveTxt.js";

/// Reply to a submission.
#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum SubmitResponse {
    Saved {
        message: String,
        line_preview: String,
        session_file: String,
        total_lines: usize,
    },
    Duplicate {
        message: String,
    },
}

/// Reply to a reset.
#[derive(Debug, Serialize)]
pub struct ResetResponse {
    pub status: &'static str,
    pub message: &'static str,
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub session_active: bool,
    pub session_file: Option<String>,
    pub total_lines: usize,
}

/// GET /saveTxt.js?txt=...
///
/// Records the fragment unless the session already holds it (exactly, or by
/// fingerprint).
pub async fn save_txt(State(state): State<Arc<AppState>>, uri: Uri) -> Result<Json<SubmitResponse>> {
    let text = text_param(&uri)?;
    let line_preview = preview(&text, REPLY_PREVIEW_CHARS);

    let outcome = state.session.lock().await.submit(&text).await?;

    let response = match outcome {
        SubmitOutcome::Duplicate(kind) => {
            Telemetry::record_duplicate(kind);
            tracing::info!("{} duplicate blocked: {line_preview}", kind.label());
            SubmitResponse::Duplicate {
                message: format!("{} duplicate skipped: {line_preview}", kind.label()),
            }
        }
        SubmitOutcome::Saved {
            session_file,
            total_lines,
            started_session,
        } => {
            if started_session {
                tracing::info!(session_file = %session_file, "Started new session");
            }
            Telemetry::record_saved(total_lines);
            tracing::info!(
                "[{total_lines:4}] {}",
                preview(&text, LOG_PREVIEW_CHARS)
            );
            SubmitResponse::Saved {
                message: format!("Saved line to {session_file}"),
                line_preview,
                session_file,
                total_lines,
            }
        }
    };

    Ok(Json(response))
}

/// GET /reset
///
/// Clears the dedup sets and detaches the export file. The file stays on
/// disk and the next accepted fragment starts a new one.
///
/// Only the bare path resets; `/reset?...` is treated as a static file
/// request like any other unrouted path.
pub async fn reset(State(state): State<Arc<AppState>>, request: Request) -> Response {
    if request.uri().query().is_some() {
        return serve_static(&state, request).await;
    }

    let previous = state.session.lock().await.reset();
    Telemetry::record_reset();
    tracing::info!(
        previous_file = previous.session_file.as_deref().unwrap_or("-"),
        previous_lines = previous.total_lines,
        "Session reset"
    );

    Json(ResetResponse {
        status: "reset",
        message: "Session reset successfully",
    })
    .into_response()
}

/// GET /health
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let summary = state.session.lock().await.summary();
    Json(HealthResponse {
        status: "healthy",
        session_active: summary.session_file.is_some(),
        session_file: summary.session_file,
        total_lines: summary.total_lines,
    })
}

/// Everything not routed explicitly.
///
/// Paths that merely start with the submission path still count as
/// submissions; the rest is served from the root directory.
pub async fn fallback(State(state): State<Arc<AppState>>, request: Request) -> Response {
    if request.method() == Method::GET && request.uri().path().starts_with(SUBMIT_PATH) {
        let uri = request.uri().clone();
        return save_txt(State(state), uri).await.into_response();
    }

    serve_static(&state, request).await
}

async fn serve_static(state: &AppState, request: Request) -> Response {
    match ServeDir::new(&state.config.root_dir).oneshot(request).await {
        Ok(response) => response.into_response(),
        Err(never) => match never {},
    }
}

/// Extracts the first `txt` value from the query string.
///
/// A present but empty value is a valid (empty) fragment.
fn text_param(uri: &Uri) -> Result<String> {
    let Query(pairs) = Query::<Vec<(String, String)>>::try_from_uri(uri)
        .map_err(|e| CaptureError::InvalidQuery(e.body_text()))?;

    pairs
        .into_iter()
        .find_map(|(key, value)| (key == "txt").then_some(value))
        .ok_or(CaptureError::MissingText)
}
