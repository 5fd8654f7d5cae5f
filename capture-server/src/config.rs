//! Configuration for the capture server.

use std::net::SocketAddr;
use std::path::PathBuf;

use crate::error::{CaptureError, Result};

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 3010;

/// Runtime configuration for the capture server.
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Host to bind the server to.
    pub host: String,
    /// Port to bind the server to.
    pub port: u16,
    /// Directory served as static files and receiving the export files.
    pub root_dir: PathBuf
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            root_dir: PathBuf::from(".")
        }
    }
}

impl CaptureConfig {
    /// Creates a new configuration from environment variables.
    ///
    /// Reads `CAPTURE_HOST`, `CAPTURE_PORT` and `CAPTURE_ROOT_DIR`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a configuration from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut builder = Self::builder();
        if let Some(host) = lookup("CAPTURE_HOST") {
            builder = builder.host(host);
        }
        if let Some(port) = lookup("CAPTURE_PORT").and_then(|p| p.parse().ok()) {
            builder = builder.port(port);
        }
        if let Some(root) = lookup("CAPTURE_ROOT_DIR") {
            builder = builder.root_dir(root);
        }
        builder.build()
    }

    /// Creates a builder for configuration.
    #[must_use]
    pub fn builder() -> CaptureConfigBuilder {
        CaptureConfigBuilder::default()
    }

    /// The socket address the server listens on.
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| CaptureError::Configuration(format!("Invalid address: {e}")))
    }

    /// Checks that the root directory exists and is a directory.
    pub fn validate(&self) -> Result<()> {
        if !self.root_dir.is_dir() {
            return Err(CaptureError::Configuration(format!(
                "root directory {} does not exist or is not a directory",
                self.root_dir.display()
            )));
        }
        Ok(())
    }
}

/// Builder for `CaptureConfig`.
#[derive(Default)]
pub struct CaptureConfigBuilder {
    host: Option<String>,
    port: Option<u16>,
    root_dir: Option<PathBuf>
}

impl CaptureConfigBuilder {
    /// Sets the host to bind to.
    #[must_use]
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Sets the port to bind to.
    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Sets the static root and export directory.
    #[must_use]
    pub fn root_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.root_dir = Some(dir.into());
        self
    }

    /// Builds and validates the configuration.
    pub fn build(self) -> Result<CaptureConfig> {
        let config = CaptureConfig {
            host: self.host.unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: self.port.unwrap_or(DEFAULT_PORT),
            root_dir: self.root_dir.unwrap_or_else(|| PathBuf::from("."))
        };
        config.validate()?;
        Ok(config)
    }
}
