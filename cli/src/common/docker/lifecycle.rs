//! # Docker Helper Container Lifecycle (`common::docker::lifecycle`)
//!
//! File: cli/src/common/docker/lifecycle.rs
//!
//! ## Overview
//!
//! Short-lived helper containers: create one from an image with a set of bind
//! mounts, start it, wait for it to exit, and remove it again. `container upload`
//! uses this to run its copy step against the target container's filesystem.
//!
//! ## Architecture
//!
//! - `run_to_completion` owns the whole lifecycle. Removal is attempted even
//!   when starting or waiting fails; the first failure is what gets returned.
//! - A non-zero exit code is an error carrying the code.
//!
use crate::core::error::{DockhandError, Result};
use anyhow::{anyhow, Context};
use bollard::{
    container::{
        Config, CreateContainerOptions, RemoveContainerOptions, StartContainerOptions,
        WaitContainerOptions,
    },
    models::HostConfig,
    Docker,
};
use futures_util::TryStreamExt;
use tracing::{debug, info, instrument, warn};

/// Runs `image` with `binds` (`HOST:CONTAINER` strings) until it exits, then
/// removes the container.
#[instrument(skip(docker))]
pub async fn run_to_completion(docker: &Docker, image: &str, binds: &[String]) -> Result<()> {
    let config = Config::<String> {
        image: Some(image.to_string()),
        host_config: Some(HostConfig {
            binds: Some(binds.to_vec()),
            ..Default::default()
        }),
        ..Default::default()
    };
    let created = docker
        .create_container(None::<CreateContainerOptions<String>>, config)
        .await
        .map_err(|e| anyhow!(DockhandError::DockerApi { source: e }))
        .with_context(|| format!("Failed to create helper container from '{}'", image))?;
    let id = created.id;
    debug!("Created helper container {}", id);

    let outcome = start_and_wait(docker, &id).await;
    remove_container(docker, &id).await;
    outcome
}

async fn start_and_wait(docker: &Docker, id: &str) -> Result<()> {
    docker
        .start_container(id, None::<StartContainerOptions<String>>)
        .await
        .map_err(|e| anyhow!(DockhandError::DockerApi { source: e }))
        .with_context(|| format!("Failed to start helper container {}", id))?;

    let responses = docker
        .wait_container(id, None::<WaitContainerOptions<String>>)
        .try_collect::<Vec<_>>()
        .await;
    match responses {
        Ok(responses) => {
            let code = responses.last().map(|r| r.status_code).unwrap_or(0);
            if code != 0 {
                return Err(anyhow!(
                    "Helper container {} exited with status {}",
                    id,
                    code
                ));
            }
            info!("Helper container {} finished", id);
            Ok(())
        }
        Err(bollard::errors::Error::DockerContainerWaitError { error, code }) => Err(anyhow!(
            "Helper container {} exited with status {}: {}",
            id,
            code,
            error
        )),
        Err(e) => Err(anyhow!(DockhandError::DockerApi { source: e }))
            .with_context(|| format!("Failed to wait for helper container {}", id)),
    }
}

/// Force-removes a container. Failures are logged, not returned.
#[instrument(skip(docker))]
pub async fn remove_container(docker: &Docker, id: &str) {
    let options = Some(RemoveContainerOptions {
        force: true,
        ..Default::default()
    });
    match docker.remove_container(id, options).await {
        Ok(()) => debug!("Removed container {}", id),
        Err(e) => warn!("Failed to remove container {}: {}", id, e),
    }
}

// --- Unit Tests ---
#[cfg(test)]
mod tests {
    use super::*;

    /// Requires a running Docker daemon with `busybox:latest` available.
    /// Run with `cargo test -- --ignored`.
    #[tokio::test]
    #[ignore]
    async fn test_run_to_completion_with_missing_image_fails() {
        let docker = Docker::connect_with_local_defaults().unwrap();
        let result = run_to_completion(&docker, "dockhand-test/no-such-image:none", &[]).await;
        assert!(result.is_err());
    }
}
