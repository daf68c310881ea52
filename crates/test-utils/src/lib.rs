//! Shared test utilities for the object-notify workspace.
//!
//! This crate provides common testing infrastructure including:
//! - A stub HTTP server that serves canned responses and records requests
//! - Envelope and notification fixtures
//!
//! # Usage
//!
//! Add to your crate's `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! test-utils = { path = "../test-utils" }
//! ```
//!
//! Then in an async test:
//!
//! ```ignore
//! use test_utils::{StubRoute, StubServer};
//!
//! let server = StubServer::start(vec![StubRoute::ok("/foo.nc", b"data")]).await;
//! let url = server.url("/foo.nc");
//! ```

pub mod fixtures;
pub mod stub_server;

// Re-export commonly used items at the crate root
pub use fixtures::*;
pub use stub_server::{RecordedRequest, StubRoute, StubServer};

/// Create a temporary directory for downloads, removed on drop.
pub fn temp_download_dir() -> tempfile::TempDir {
    tempfile::Builder::new()
        .prefix("object-notify-")
        .tempdir()
        .expect("failed to create temp dir")
}
