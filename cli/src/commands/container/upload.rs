//! # Container Upload Handler
//!
//! File: cli/src/commands/container/upload.rs
//!
//! ## Overview
//!
//! Implements `dockhand container upload SRC NAME:PATH`, copying a local file
//! or directory into a container's filesystem.
//!
//! ## Architecture
//!
//! The copy is done by the daemon: SRC is packaged together with a generated
//! Dockerfile into a throwaway `busybox` image, and a container of that image
//! runs `cp -r` with the target container's root filesystem bind-mounted.
//! The helper container and image are removed afterwards. See
//! `common::docker::operations::upload`.
//!
use crate::common::docker::{self, DaemonClient, UploadTarget};
use crate::core::config;
use crate::core::error::Result;
use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
pub struct UploadArgs {
    /// Local file or directory to copy.
    #[arg(required = true)]
    source: PathBuf,

    /// Destination, `NAME:PATH`.
    #[arg(required = true)]
    destination: String,
}

pub async fn handle_upload(args: UploadArgs, host: Option<&str>) -> Result<()> {
    info!(
        "Handling container upload of {} to {}",
        args.source.display(),
        args.destination
    );
    let target = UploadTarget::parse(&args.destination)?;

    let cfg = config::load_config(host).context("Failed to load dockhand configuration")?;
    let client = DaemonClient::from_config(&cfg.daemon)?;
    let docker = docker::connect_docker(&cfg.daemon).await?;
    docker::upload(&client, &docker, &args.source, &target)
        .await
        .with_context(|| format!("Failed to upload {}", args.source.display()))
}
