//! Server setup and lifecycle for the capture server.

use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;

use crate::config::CaptureConfig;
use crate::error::{CaptureError, Result};
use crate::handlers::SUBMIT_PATH;
use crate::routes::create_router;
use crate::session::SessionSummary;
use crate::state::AppState;

/// The capture server.
pub struct CaptureServer {
    state: Arc<AppState>
}

impl CaptureServer {
    /// Creates a new server instance with the given configuration.
    pub fn new(config: CaptureConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            state: Arc::new(AppState::new(config))
        })
    }

    /// Binds the configured address and runs until Ctrl+C or SIGTERM.
    pub async fn run(self) -> Result<()> {
        let addr = self.state.config.socket_addr()?;
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| CaptureError::Server(format!("Failed to bind to {addr}: {e}")))?;

        self.serve(listener, shutdown_signal()).await
    }

    /// Serves on an already bound listener until `shutdown` resolves, then
    /// reports the session that was active.
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static
    {
        let addr = listener
            .local_addr()
            .map_err(|e| CaptureError::Server(format!("Failed to read local address: {e}")))?;
        log_banner(addr, &self.state.config);

        let router = create_router(self.state.clone());
        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| CaptureError::Server(format!("Server error: {e}")))?;

        let summary = self.state.session.lock().await.summary();
        log_shutdown(&summary);
        Ok(())
    }

    /// Returns a reference to the application state.
    #[must_use]
    pub fn state(&self) -> &Arc<AppState> {
        &self.state
    }
}

fn log_banner(addr: SocketAddr, config: &CaptureConfig) {
    tracing::info!(%addr, "Capture server running at http://{addr}/");
    tracing::info!("Submit endpoint: http://{addr}{SUBMIT_PATH}?txt=<message>");
    tracing::info!("Reset endpoint: http://{addr}/reset");
    tracing::info!(
        root_dir = %config.root_dir.display(),
        "Messages saved to messenger_export_YYYYMMDD_HHMMSS.txt"
    );
}

fn log_shutdown(summary: &SessionSummary) {
    tracing::info!("Capture server stopped");
    if let Some(file) = &summary.session_file {
        tracing::info!(
            session_file = %file,
            total_lines = summary.total_lines,
            "Final export saved as {file} ({} messages)",
            summary.total_lines
        );
    }
}

/// Signal handler for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        },
        () = terminate => {
            tracing::info!("Received terminate signal, initiating graceful shutdown");
        },
    }
}

/// Entry point for running the server from configuration.
pub async fn run_server(config: CaptureConfig) -> Result<()> {
    let server = CaptureServer::new(config)?;
    server.run().await
}

/// Entry point for running the server from environment variables.
pub async fn run_from_env() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let config = CaptureConfig::from_env()?;
    run_server(config).await
}
