//! Application state for the capture server.

use std::sync::Arc;
use tokio::sync::Mutex;

use crate::config::CaptureConfig;
use crate::session::CaptureSession;

/// Shared application state for Axum handlers.
///
/// The session sits behind a single mutex held for the whole of a
/// submission, so session-touching requests run strictly one at a time.
pub struct AppState {
    /// Server configuration.
    pub config: Arc<CaptureConfig>,
    /// The capture session owned by this server.
    pub session: Mutex<CaptureSession>
}

impl AppState {
    /// Creates state with an inactive session exporting into the root dir.
    #[must_use]
    pub fn new(config: CaptureConfig) -> Self {
        let session = CaptureSession::new(config.root_dir.clone());
        Self {
            config: Arc::new(config),
            session: Mutex::new(session)
        }
    }
}
