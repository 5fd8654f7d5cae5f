//! # Messenger Capture Server
//!
//! A small local HTTP server that receives scraped message fragments from a
//! browser-side scraper, drops duplicates and appends every new fragment as
//! one line of a session export file.
//!
//! ## Endpoints
//!
//! - `GET /saveTxt.js?txt=<text>` - Records a fragment unless it is a duplicate
//! - `GET /reset` - Clears dedup state and detaches the export file
//! - `GET /health` - Reports the active session
//! - `OPTIONS *` - Empty 200 for CORS pre-flight
//! - anything else - Static files from the configured root directory
//!
//! ## Duplicate detection
//!
//! Fragments are compared after lower-casing and trimming. An exact match
//! against an earlier fragment is rejected first; otherwise a fragment whose
//! first 100 normalized characters and normalized length match an earlier
//! one is rejected as "similar".

pub mod client;
pub mod config;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod server;
pub mod session;
pub mod state;
pub mod telemetry;

pub use client::CaptureClient;
pub use config::CaptureConfig;
pub use error::CaptureError;
pub use server::CaptureServer;
pub use session::CaptureSession;
pub use state::AppState;
