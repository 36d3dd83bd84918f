//! # Docker Module Interface (`common::docker`)
//!
//! File: cli/src/common/docker/mod.rs
//!
//! ## Overview
//!
//! Everything that talks to the Docker daemon. Two clients share the same
//! `[daemon]` configuration:
//!
//! - `transport::DaemonClient`, a small hyper client for the streaming
//!   endpoints (build context upload, progress streams, logs, export).
//! - `bollard::Docker` (from `connect`), for the plain request/response calls.
//!
//! ## Architecture
//!
//! - **`transport`**: daemon address parsing and `send_streaming_request`.
//! - **`connect`**: builds the `bollard` client.
//! - **`state`**: container inspection (TTY flag, not-found mapping).
//! - **`images`**: image references, built-image ids, image removal.
//! - **`lifecycle`**: short-lived helper containers.
//! - **`operations`**: build, pull, upload.
//! - **`interaction`**: logs, export.
//!
//! ## Usage
//!
//! ```rust
//! use crate::common::docker;
//!
//! # async fn run(config: &crate::core::config::Config) -> crate::core::error::Result<()> {
//! let client = docker::DaemonClient::from_config(&config.daemon)?;
//! docker::pull_image(&client, "busybox:latest").await?;
//! # Ok(())
//! # }
//! ```
//!

/// Builds the `bollard` client.
pub mod connect;
/// Image references and removal.
pub mod images;
/// Logs and export.
pub mod interaction;
/// Helper container lifecycle.
pub mod lifecycle;
/// Build, pull and upload.
pub mod operations;
/// Container inspection.
pub mod state;
/// Streaming HTTP client for the daemon.
pub mod transport;

pub use connect::connect_docker;
pub use interaction::{export_container, get_container_logs, LogTail};
pub use operations::{build_image, pull_image, upload, BuildOptions, UploadTarget};
pub use transport::DaemonClient;
