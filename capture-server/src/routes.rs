//! Route definitions for the capture server.

use axum::{
    Router,
    extract::Request,
    http::{
        HeaderValue, Method, StatusCode,
        header::{
            ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
            ACCESS_CONTROL_ALLOW_ORIGIN
        }
    },
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::handlers::{self, SUBMIT_PATH};
use crate::state::AppState;

/// Creates the Axum router with all routes configured.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route(SUBMIT_PATH, get(handlers::save_txt))
        .route("/reset", get(handlers::reset))
        .route("/health", get(handlers::health))
        .fallback(handlers::fallback)
        .layer(middleware::from_fn(cors_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Answers every `OPTIONS` request with an empty 200 and stamps permissive
/// CORS headers on all responses, static files included.
pub async fn cors_middleware(request: Request, next: Next) -> Response {
    let mut response = if request.method() == Method::OPTIONS {
        StatusCode::OK.into_response()
    } else {
        next.run(request).await
    };

    let headers = response.headers_mut();
    headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    headers.insert(
        ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, POST, OPTIONS")
    );
    headers.insert(ACCESS_CONTROL_ALLOW_HEADERS, HeaderValue::from_static("*"));
    response
}
