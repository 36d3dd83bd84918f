//! # Container Export Handler
//!
//! File: cli/src/commands/container/export.rs
//!
//! Implements `dockhand container export NAME [-o FILE]`: the container's
//! filesystem, as the tar stream the daemon produces, written to FILE or to
//! stdout.
//!
use crate::common::docker::{self, DaemonClient};
use crate::core::config;
use crate::core::error::Result;
use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
pub struct ExportArgs {
    /// Name or ID of the container.
    #[arg(required = true)]
    container_name_or_id: String,

    /// Write to this file instead of stdout.
    #[arg(short, long)]
    output: Option<PathBuf>,
}

pub async fn handle_export(args: ExportArgs, host: Option<&str>) -> Result<()> {
    info!("Handling container export command for '{}'", args.container_name_or_id);
    let cfg = config::load_config(host).context("Failed to load dockhand configuration")?;
    let client = DaemonClient::from_config(&cfg.daemon)?;
    let written = docker::export_container(
        &client,
        &args.container_name_or_id,
        args.output.as_deref(),
    )
    .await?;
    if let Some(path) = &args.output {
        info!("Wrote {} byte(s) to {}", written, path.display());
    }
    Ok(())
}
