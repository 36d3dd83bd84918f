//! # Docker Container State Querying (`common::docker::state`)
//!
//! File: cli/src/common/docker/state.rs
//!
//! ## Overview
//!
//! Read-only lookups against containers, through `bollard`:
//!
//! - `inspect_container` fetches the inspect document, mapping a 404 to
//!   `DockhandError::ContainerNotFound`.
//! - `container_uses_tty` reports whether the container was created with a TTY,
//!   which decides whether its log output is framed.
//!
use crate::core::error::{DockhandError, Result};
use anyhow::anyhow;
use bollard::{
    container::InspectContainerOptions, models::ContainerInspectResponse, Docker,
};
use tracing::{debug, error, instrument, warn};

/// Inspects a container by name or ID.
///
/// # Errors
///
/// * `DockhandError::ContainerNotFound` - the daemon answered 404.
/// * `DockhandError::DockerApi` - any other API failure.
#[instrument(skip(docker))]
pub async fn inspect_container(
    docker: &Docker,
    name_or_id: &str,
) -> Result<ContainerInspectResponse> {
    debug!("Inspecting container: {}", name_or_id);
    docker
        .inspect_container(name_or_id, None::<InspectContainerOptions>)
        .await
        .map_err(|e| match e {
            bollard::errors::Error::DockerResponseServerError {
                status_code: 404, ..
            } => {
                warn!("Container '{}' was not found.", name_or_id);
                anyhow!(DockhandError::ContainerNotFound {
                    name: name_or_id.to_string()
                })
            }
            _ => {
                error!("Failed to inspect container '{}': {:?}", name_or_id, e);
                anyhow!(DockhandError::DockerApi { source: e })
                    .context(format!("Failed to inspect container '{}'", name_or_id))
            }
        })
}

/// Whether the inspected container has a TTY allocated.
pub fn uses_tty(details: &ContainerInspectResponse) -> bool {
    details
        .config
        .as_ref()
        .and_then(|config| config.tty)
        .unwrap_or(false)
}

/// Inspects `name_or_id` and reports whether it uses a TTY.
pub async fn container_uses_tty(docker: &Docker, name_or_id: &str) -> Result<bool> {
    let details = inspect_container(docker, name_or_id).await?;
    let tty = uses_tty(&details);
    debug!("Container '{}' tty: {}", name_or_id, tty);
    Ok(tty)
}
