//! # Image Pull Handler
//!
//! File: cli/src/commands/image/pull.rs
//!
//! Implements `dockhand image pull NAME[:TAG]`, rendering the daemon's
//! per-layer progress as it arrives.
//!
use crate::common::docker::{self, DaemonClient};
use crate::core::config;
use crate::core::error::Result;
use anyhow::Context;
use clap::Parser;
use tracing::info;

#[derive(Parser, Debug)]
pub struct PullArgs {
    /// Image to pull, `NAME[:TAG]`. The tag defaults to `latest`.
    #[arg(required = true)]
    image: String,
}

pub async fn handle_pull(args: PullArgs, host: Option<&str>) -> Result<()> {
    info!("Handling image pull command for '{}'", args.image);
    let cfg = config::load_config(host).context("Failed to load dockhand configuration")?;
    let client = DaemonClient::from_config(&cfg.daemon)?;
    docker::pull_image(&client, &args.image)
        .await
        .with_context(|| format!("Failed to pull '{}'", args.image))?;
    Ok(())
}
