//! # Docker Image Management (`common::docker::images`)
//!
//! File: cli/src/common/docker/images.rs
//!
//! ## Overview
//!
//! Image helpers used around the streaming operations:
//!
//! - `split_image_reference` separates `NAME[:TAG]` for `POST /images/create`.
//! - `parse_built_image_id` pulls the id out of a `Successfully built <id>` summary.
//! - `remove_image` deletes an image through `bollard`.
//!
use crate::core::error::{DockhandError, Result};
use anyhow::anyhow;
use bollard::{image::RemoveImageOptions, Docker};
use tracing::{debug, info, instrument, warn};

/// Tag used when a reference names none.
pub const DEFAULT_TAG: &str = "latest";

/// Splits `NAME[:TAG]` into name and tag. A colon that belongs to a registry
/// port (`host:5000/app`) is not a tag separator. Digest references
/// (`name@sha256:...`) are returned whole with no tag.
pub fn split_image_reference(reference: &str) -> (&str, Option<&str>) {
    if reference.contains('@') {
        return (reference, None);
    }
    let last_slash = reference.rfind('/').map(|i| i + 1).unwrap_or(0);
    match reference[last_slash..].rfind(':') {
        Some(i) => {
            let split = last_slash + i;
            (&reference[..split], Some(&reference[split + 1..]))
        }
        None => (reference, Some(DEFAULT_TAG)),
    }
}

/// `Successfully built 4f2a9c` → `4f2a9c`. Quiet builds on newer daemons
/// print only the digest (`sha256:...`), which is returned as is.
pub fn parse_built_image_id(summary: &str) -> Option<&str> {
    let summary = summary.trim();
    if summary.starts_with("sha256:") {
        return summary.split_whitespace().next();
    }
    summary
        .strip_prefix("Successfully built ")
        .and_then(|rest| rest.split_whitespace().next())
}

/// Removes an image.
///
/// # Errors
///
/// `DockhandError::DockerApi` for any API failure other than "not found",
/// which is logged and treated as already removed.
#[instrument(skip(docker))]
pub async fn remove_image(docker: &Docker, name_or_id: &str, force: bool) -> Result<()> {
    let options = Some(RemoveImageOptions {
        force,
        noprune: false,
    });
    match docker.remove_image(name_or_id, options, None).await {
        Ok(results) => {
            for result in results {
                if let Some(deleted) = result.deleted {
                    debug!("Deleted: {}", deleted);
                }
                if let Some(untagged) = result.untagged {
                    debug!("Untagged: {}", untagged);
                }
            }
            info!("Image '{}' removed.", name_or_id);
            Ok(())
        }
        Err(bollard::errors::Error::DockerResponseServerError {
            status_code: 404, ..
        }) => {
            warn!("Image '{}' not found, nothing to remove.", name_or_id);
            Ok(())
        }
        Err(e) => Err(anyhow!(DockhandError::DockerApi { source: e })
            .context(format!("Failed to remove image '{}'", name_or_id))),
    }
}

// --- Unit Tests ---
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_image_reference() {
        assert_eq!(split_image_reference("busybox"), ("busybox", Some("latest")));
        assert_eq!(split_image_reference("busybox:1.36"), ("busybox", Some("1.36")));
        assert_eq!(
            split_image_reference("registry.local:5000/team/app"),
            ("registry.local:5000/team/app", Some("latest"))
        );
        assert_eq!(
            split_image_reference("registry.local:5000/team/app:v2"),
            ("registry.local:5000/team/app", Some("v2"))
        );
        assert_eq!(
            split_image_reference("alpine@sha256:abcd"),
            ("alpine@sha256:abcd", None)
        );
    }

    #[test]
    fn test_parse_built_image_id() {
        assert_eq!(parse_built_image_id("Successfully built 4f2a9c"), Some("4f2a9c"));
        assert_eq!(parse_built_image_id("Successfully built 4f2a9c\n"), Some("4f2a9c"));
        assert_eq!(parse_built_image_id("Step 3/3 : CMD sh"), None);
        assert_eq!(parse_built_image_id("Successfully built "), None);
        assert_eq!(
            parse_built_image_id("sha256:9d2f0c1e\n"),
            Some("sha256:9d2f0c1e")
        );
    }
}
