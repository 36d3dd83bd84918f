//! # Docker REST Connection Helper (`common::docker::connect`)
//!
//! File: cli/src/common/docker/connect.rs
//!
//! ## Overview
//!
//! Builds the `bollard::Docker` client used for the request/response calls of
//! the Engine API (inspect, info, create/start/wait/remove). It talks to the
//! same daemon as the streaming `DaemonClient`, as configured in `[daemon]`.
//!
//! ## Usage
//!
//! ```rust
//! use super::connect::connect_docker;
//!
//! async fn inspect(config: &DaemonConfig) -> Result<()> {
//!     let docker = connect_docker(config).await?;
//!     docker.inspect_container("web", None).await?;
//!     Ok(())
//! }
//! ```
//!
use crate::core::config::DaemonConfig;
use crate::core::error::{DockhandError, Result};
use anyhow::{anyhow, Context};
use bollard::{Docker, API_DEFAULT_VERSION};
use tracing::{debug, instrument};

use super::transport::DaemonAddress;

/// Connects `bollard` to the configured daemon.
///
/// # Errors
///
/// `DockhandError::DockerApi` if the client cannot be constructed for the
/// configured address.
#[instrument(skip(config), fields(host = %config.host))]
pub async fn connect_docker(config: &DaemonConfig) -> Result<Docker> {
    let docker = match DaemonAddress::parse(&config.host)? {
        DaemonAddress::Unix(path) => {
            debug!("Connecting to Docker over unix socket {}", path.display());
            Docker::connect_with_socket(
                &path.to_string_lossy(),
                config.timeout_secs,
                API_DEFAULT_VERSION,
            )
        }
        DaemonAddress::Tcp(authority) => {
            debug!("Connecting to Docker over TCP at {}", authority);
            Docker::connect_with_http(
                &format!("tcp://{}", authority),
                config.timeout_secs,
                API_DEFAULT_VERSION,
            )
        }
    };
    docker
        .map_err(|e| anyhow!(DockhandError::DockerApi { source: e }))
        .context("Failed to connect to Docker daemon. Is it running and accessible?")
}

// --- Unit Tests ---
#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_client_construction_does_not_touch_the_daemon() {
        // Constructing the client is lazy; no socket needs to exist yet.
        let config = DaemonConfig {
            host: "unix:///nonexistent/docker.sock".into(),
            ..Default::default()
        };
        assert!(connect_docker(&config).await.is_ok());
    }

    #[tokio::test]
    async fn test_unsupported_host_is_rejected() {
        let config = DaemonConfig {
            host: "ssh://example".into(),
            ..Default::default()
        };
        assert!(connect_docker(&config).await.is_err());
    }

    /// Requires a running Docker daemon. Run with `cargo test -- --ignored`.
    #[tokio::test]
    #[ignore]
    async fn test_connect_docker_success() {
        let docker = connect_docker(&DaemonConfig::default()).await.unwrap();
        assert!(docker.ping().await.is_ok());
    }
}
