//! # Docker Streaming Operations (`common::docker::operations`)
//!
//! File: cli/src/common/docker/operations.rs
//!
//! ## Overview
//!
//! The operations that stream data through the daemon:
//!
//! - **`build_image`**: streams a build context into `POST /build` while the JSON
//!   progress comes back and is rendered.
//! - **`pull_image`**: `POST /images/create`, rendered live.
//! - **`upload`**: copies a local file or directory into a container's root
//!   filesystem by building a throwaway image and running it with the
//!   container's filesystem bind-mounted.
//!
//! ## Architecture
//!
//! The build context is produced on the blocking pool and handed to hyper
//! through a bounded `pipe`, so the request body is streaming:
//!
//! ```text
//! ArchiveBuilder --(BufWriter 32 KiB)--> PipeWriter ==> PipeReader --> POST /build
//!                                                                          |
//! stdout <-- TerminalRenderer <-- MessageDecoder <-------------------------+
//! ```
//!
//! If the request fails, the reader is dropped, the producer's next write
//! fails with `BrokenPipe` and the walk stops. A build that succeeded joins the
//! producer and surfaces any failure it had.
//!
use crate::common::archive::{ArchiveBuilder, ArchiveSummary};
use crate::common::archive::ignore::clean_path;
use crate::common::stream::{self, pipe};
use crate::common::ui::TerminalInfo;
use crate::core::error::{DockhandError, Result};
use anyhow::{anyhow, Context};
use bollard::{models::ContainerInspectResponse, Docker};
use hyper::Method;
use std::{
    collections::HashMap,
    io::{self, BufWriter},
    path::{Path, PathBuf},
};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use super::images::{parse_built_image_id, remove_image, split_image_reference};
use super::lifecycle::run_to_completion;
use super::state::inspect_container;
use super::transport::DaemonClient;

/// Mount point of the destination inside the upload helper container.
const UPLOAD_MOUNT: &str = "/.destination";

/// Options for `POST /build`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildOptions {
    pub tag: Option<String>,
    pub no_cache: bool,
    pub remove_intermediate: bool,
    pub quiet: bool,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            tag: None,
            no_cache: false,
            remove_intermediate: true,
            quiet: false,
        }
    }
}

/// What a finished build reported.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildOutcome {
    /// Last stream line or status of the build.
    pub summary: Option<String>,
    /// Image id parsed from the summary.
    pub image_id: Option<String>,
}

/// Query string for `POST /build`.
pub fn build_query(options: &BuildOptions) -> String {
    let mut params = Vec::new();
    if options.remove_intermediate {
        params.push("rm=1".to_string());
    }
    if let Some(tag) = &options.tag {
        params.push(format!("t={}", encode_query_value(tag)));
    }
    if options.no_cache {
        params.push("nocache=1".to_string());
    }
    if options.quiet {
        params.push("q=1".to_string());
    }
    params.join("&")
}

/// Starts writing `builder`'s archive into a new pipe on the blocking pool.
///
/// Returns the read half and the producer task, which resolves to the archive
/// summary or to the error that stopped it (`BrokenPipe` once the reader is
/// dropped). With `report`, the `---> Sent` line is printed to stderr once the
/// archive is complete.
pub fn spawn_archive_producer(
    builder: ArchiveBuilder,
    report: bool,
) -> (pipe::PipeReader, JoinHandle<Result<ArchiveSummary>>) {
    let (writer, reader) = pipe::pipe();
    let producer = tokio::task::spawn_blocking(move || {
        let out = BufWriter::with_capacity(pipe::WRITE_BUFFER_SIZE, writer);
        let summary = builder.write_to(out)?;
        info!("Build context sent: {:?}", summary);
        if report {
            eprintln!("{}", summary.report_line());
        }
        Ok(summary)
    });
    (reader, producer)
}

/// Waits for a producer whose consumer has finished.
async fn join_archive_producer(producer: JoinHandle<Result<ArchiveSummary>>) -> Result<()> {
    match producer.await {
        Ok(Ok(_)) => Ok(()),
        Ok(Err(e)) if is_broken_pipe(&e) => {
            debug!("Build context consumer went away: {:#}", e);
            Ok(())
        }
        Ok(Err(e)) => Err(e.context("Failed to produce the build context")),
        Err(e) => Err(anyhow!("Build context producer did not complete: {}", e)),
    }
}

/// Builds an image from `builder`'s context.
///
/// Progress goes to stdout (or nowhere, with `options.quiet`). The returned
/// outcome carries the build's last line and, when present, the image id.
#[instrument(skip(client, builder), fields(root = %builder.root().display()))]
pub async fn build_image(
    client: &DaemonClient,
    builder: ArchiveBuilder,
    options: &BuildOptions,
) -> Result<BuildOutcome> {
    let query = build_query(options);
    let path = if query.is_empty() {
        client.versioned_path("/build")
    } else {
        client.versioned_path(&format!("/build?{}", query))
    };

    if !options.quiet {
        eprintln!("Sending build context to Docker daemon");
    }
    let (reader, producer) = spawn_archive_producer(builder, !options.quiet);
    let body = reader.into_body();
    let headers = HashMap::from([("Content-Type".to_string(), "application/tar".to_string())]);
    let response = client
        .send_streaming_request(Method::POST, &path, Some(body), &headers)
        .await?;

    let is_json = response.is_json();
    let summary = if options.quiet {
        stream::forward_response(response.into_stream(), is_json, io::sink(), TerminalInfo::plain())
            .await?
    } else {
        stream::forward_response(
            response.into_stream(),
            is_json,
            io::stdout(),
            TerminalInfo::detect_stdout(),
        )
        .await?
    };

    join_archive_producer(producer).await?;

    let image_id = summary
        .as_deref()
        .and_then(parse_built_image_id)
        .map(str::to_string);
    debug!("Build finished, image id: {:?}", image_id);
    Ok(BuildOutcome { summary, image_id })
}

/// Pulls `reference` (`NAME[:TAG]`) and renders the daemon's progress.
#[instrument(skip(client))]
pub async fn pull_image(client: &DaemonClient, reference: &str) -> Result<Option<String>> {
    let (image, tag) = split_image_reference(reference);
    let mut query = format!("fromImage={}", encode_query_value(image));
    if let Some(tag) = tag {
        query.push_str(&format!("&tag={}", encode_query_value(tag)));
    }
    let path = client.versioned_path(&format!("/images/create?{}", query));
    let response = client
        .send_streaming_request(Method::POST, &path, None, &HashMap::new())
        .await?;
    let is_json = response.is_json();
    stream::forward_response(
        response.into_stream(),
        is_json,
        io::stdout(),
        TerminalInfo::detect_stdout(),
    )
    .await
}

/// `NAME:PATH` argument of `container upload`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadTarget {
    pub container: String,
    pub path: String,
}

impl UploadTarget {
    pub fn parse(arg: &str) -> Result<Self> {
        match arg.split_once(':') {
            Some((container, path)) if !container.is_empty() && !path.is_empty() => Ok(Self {
                container: container.to_string(),
                path: path.to_string(),
            }),
            _ => Err(anyhow!(DockhandError::ArgumentParsing(format!(
                "Needs <NAME:PATH> for the destination, got '{}'",
                arg
            )))),
        }
    }
}

/// Copies `source` into `target.path` inside `target.container`.
#[instrument(skip(client, docker))]
pub async fn upload(
    client: &DaemonClient,
    docker: &Docker,
    source: &Path,
    target: &UploadTarget,
) -> Result<()> {
    let builder = ArchiveBuilder::for_upload(source)?;

    let info = docker
        .info()
        .await
        .map_err(|e| anyhow!(DockhandError::DockerApi { source: e }))
        .context("Failed to query daemon info")?;
    let driver = info.driver.clone().unwrap_or_default();
    let storage_root = storage_root(
        info.driver_status.as_deref().unwrap_or_default(),
        info.docker_root_dir.as_deref(),
        &driver,
    )?;
    let container = inspect_container(docker, &target.container).await?;
    let rootfs = container_rootfs(&driver, &storage_root, &container)?;
    let destination = resolve_destination(&rootfs, &target.path)?;
    debug!("Upload destination on host: {}", destination.display());

    println!(
        "Uploading {} into {}:{}",
        source.display(),
        target.container,
        target.path
    );
    let options = BuildOptions {
        quiet: true,
        ..Default::default()
    };
    let outcome = build_image(client, builder, &options).await?;
    let image = outcome.image_id.ok_or_else(|| {
        anyhow!(
            "Could not determine the helper image id from the build output ({:?})",
            outcome.summary
        )
    })?;

    let binds = vec![format!("{}:{}", destination.display(), UPLOAD_MOUNT)];
    let copied = run_to_completion(docker, &image, &binds).await;
    if let Err(e) = remove_image(docker, &image, true).await {
        warn!("Failed to remove helper image {}: {:#}", image, e);
    }
    copied?;
    println!("Successfully uploaded");
    Ok(())
}

/// Storage-driver root: the driver's own `Root Dir` status entry, else
/// `<DockerRootDir>/<driver>`.
pub fn storage_root(
    driver_status: &[Vec<String>],
    docker_root_dir: Option<&str>,
    driver: &str,
) -> Result<PathBuf> {
    let reported = driver_status
        .iter()
        .filter(|pair| pair.len() >= 2 && pair[0] == "Root Dir")
        .map(|pair| pair[1].clone())
        .last();
    if let Some(root) = reported {
        return Ok(PathBuf::from(root));
    }
    match docker_root_dir {
        Some(dir) if !dir.is_empty() => Ok(Path::new(dir).join(driver)),
        _ => Err(anyhow!("Can't get the root dir for the container")),
    }
}

/// Host path of a container's root filesystem for the given storage driver.
pub fn container_rootfs(
    driver: &str,
    storage_root: &Path,
    container: &ContainerInspectResponse,
) -> Result<PathBuf> {
    let id = container
        .id
        .as_deref()
        .ok_or_else(|| anyhow!("Container inspect response has no id"))?;
    let rootfs = match driver {
        "aufs" => storage_root.join("mnt").join(id),
        "btrfs" => storage_root.join("subvolumes").join(id),
        "devicemapper" => storage_root.join("mnt").join(id).join("rootfs"),
        "overlay" => storage_root.join(id).join("merged"),
        // Layer directories are not named after the container; the daemon reports the path.
        "overlay2" => container
            .graph_driver
            .as_ref()
            .and_then(|g| g.data.get("MergedDir"))
            .map(PathBuf::from)
            .ok_or_else(|| anyhow!("overlay2 did not report a MergedDir for container {}", id))?,
        "vfs" => storage_root.join("dir").join(id),
        other => return Err(anyhow!("Unknown driver: {}", other)),
    };
    Ok(rootfs)
}

/// Joins `path` onto `rootfs`, rejecting results that escape it.
pub fn resolve_destination(rootfs: &Path, path: &str) -> Result<PathBuf> {
    let joined = format!("{}/{}", rootfs.to_string_lossy(), path);
    let destination = PathBuf::from(clean_path(&joined));
    if !destination.starts_with(rootfs) {
        return Err(anyhow!(DockhandError::ArgumentParsing(
            "Can't upload to outside of the container".to_string()
        )));
    }
    Ok(destination)
}

fn is_broken_pipe(error: &anyhow::Error) -> bool {
    error.chain().any(|cause| {
        cause
            .downcast_ref::<io::Error>()
            .is_some_and(|e| e.kind() == io::ErrorKind::BrokenPipe)
    })
}

/// Percent-encodes everything outside the URL unreserved set.
fn encode_query_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}

// --- Unit Tests ---
#[cfg(test)]
mod tests {
    use super::*;
    use bollard::models::DriverData;
    use futures_util::StreamExt;
    use std::fs;
    use tempfile::tempdir;

    fn inspected(id: &str) -> ContainerInspectResponse {
        ContainerInspectResponse {
            id: Some(id.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_build_query() {
        assert_eq!(build_query(&BuildOptions::default()), "rm=1");
        let options = BuildOptions {
            tag: Some("team/app:v1".into()),
            no_cache: true,
            remove_intermediate: true,
            quiet: true,
        };
        assert_eq!(build_query(&options), "rm=1&t=team%2Fapp%3Av1&nocache=1&q=1");
        let bare = BuildOptions {
            remove_intermediate: false,
            ..Default::default()
        };
        assert_eq!(build_query(&bare), "");
    }

    #[test]
    fn test_upload_target_parse() -> Result<()> {
        assert_eq!(
            UploadTarget::parse("web:/srv/www")?,
            UploadTarget {
                container: "web".into(),
                path: "/srv/www".into()
            }
        );
        assert!(UploadTarget::parse("web").is_err());
        assert!(UploadTarget::parse("web:").is_err());
        assert!(UploadTarget::parse(":/srv").is_err());
        Ok(())
    }

    #[test]
    fn test_storage_root_prefers_driver_status() -> Result<()> {
        let status = vec![
            vec!["Backing Filesystem".to_string(), "extfs".to_string()],
            vec!["Root Dir".to_string(), "/mnt/sda1/docker/aufs".to_string()],
        ];
        assert_eq!(
            storage_root(&status, Some("/var/lib/docker"), "aufs")?,
            PathBuf::from("/mnt/sda1/docker/aufs")
        );
        assert_eq!(
            storage_root(&[], Some("/var/lib/docker"), "vfs")?,
            PathBuf::from("/var/lib/docker/vfs")
        );
        assert!(storage_root(&[], None, "vfs").is_err());
        Ok(())
    }

    #[test]
    fn test_container_rootfs_per_driver() -> Result<()> {
        let root = Path::new("/var/lib/docker/x");
        let c = inspected("abc");
        assert_eq!(container_rootfs("aufs", root, &c)?, root.join("mnt/abc"));
        assert_eq!(container_rootfs("btrfs", root, &c)?, root.join("subvolumes/abc"));
        assert_eq!(
            container_rootfs("devicemapper", root, &c)?,
            root.join("mnt/abc/rootfs")
        );
        assert_eq!(container_rootfs("overlay", root, &c)?, root.join("abc/merged"));
        assert_eq!(container_rootfs("vfs", root, &c)?, root.join("dir/abc"));
        assert!(container_rootfs("zfs", root, &c).is_err());
        assert!(container_rootfs("overlay2", root, &c).is_err());

        let mut with_layers = inspected("abc");
        with_layers.graph_driver = Some(DriverData {
            name: "overlay2".into(),
            data: HashMap::from([(
                "MergedDir".to_string(),
                "/var/lib/docker/overlay2/l1/merged".to_string(),
            )]),
        });
        assert_eq!(
            container_rootfs("overlay2", root, &with_layers)?,
            PathBuf::from("/var/lib/docker/overlay2/l1/merged")
        );
        Ok(())
    }

    #[test]
    fn test_resolve_destination_stays_inside_root() -> Result<()> {
        let root = Path::new("/var/lib/docker/vfs/dir/abc");
        assert_eq!(
            resolve_destination(root, "/srv/www/")?,
            root.join("srv/www")
        );
        assert_eq!(resolve_destination(root, "tmp/../opt")?, root.join("opt"));
        assert!(resolve_destination(root, "/../../etc").is_err());
        // A sibling sharing the prefix is still outside.
        assert!(resolve_destination(root, "../abcdef").is_err());
        Ok(())
    }

    #[test]
    fn test_encode_query_value() {
        assert_eq!(encode_query_value("busybox"), "busybox");
        assert_eq!(encode_query_value("a b&c"), "a%20b%26c");
    }

    #[tokio::test]
    async fn test_producer_streams_complete_archive() -> Result<()> {
        let temp_dir = tempdir()?;
        fs::write(temp_dir.path().join("Dockerfile"), "FROM scratch\n")?;
        fs::write(temp_dir.path().join("payload.bin"), vec![7u8; 100_000])?;
        let builder = ArchiveBuilder::for_build(temp_dir.path(), "Dockerfile")?;

        let (mut reader, producer) = spawn_archive_producer(builder, false);
        let mut bytes = Vec::new();
        while let Some(chunk) = reader.next().await {
            bytes.extend_from_slice(&chunk?);
        }
        let summary = producer.await??;
        assert_eq!(summary.files, 2);

        let mut archive = tar::Archive::new(bytes.as_slice());
        let names: Vec<String> = archive
            .entries()?
            .map(|e| e.unwrap().path().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["Dockerfile", "payload.bin"]);
        Ok(())
    }

    #[tokio::test]
    async fn test_producer_stops_when_reader_is_dropped() -> Result<()> {
        let temp_dir = tempdir()?;
        fs::write(temp_dir.path().join("Dockerfile"), "FROM scratch\n")?;
        fs::write(temp_dir.path().join("big.bin"), vec![1u8; 2_000_000])?;
        let builder = ArchiveBuilder::for_build(temp_dir.path(), "Dockerfile")?;

        let (reader, producer) = spawn_archive_producer(builder, false);
        drop(reader);
        let outcome = tokio::time::timeout(std::time::Duration::from_secs(10), producer)
            .await
            .expect("producer kept running after its reader was dropped")?;
        let err = outcome.unwrap_err();
        assert!(is_broken_pipe(&err), "unexpected producer error: {:#}", err);
        assert!(join_archive_producer(tokio::spawn(async move { Err(err) })).await.is_ok());
        Ok(())
    }
}
