//! # Image Build Handler
//!
//! File: cli/src/commands/image/build.rs
//!
//! ## Overview
//!
//! Implements `dockhand image build [PATH]`. PATH is the context directory
//! (default `.`) or a Dockerfile, whose parent directory then becomes the
//! context. The context is checked before anything is sent: a missing
//! Dockerfile or a broken `.dockerignore` fails without touching the daemon.
//!
//! ## Architecture
//!
//! 1. Load configuration (`[build]` defaults, `[daemon]` address).
//! 2. Prepare the `ArchiveBuilder` for the context.
//! 3. Stream it to the daemon with `docker::build_image`, rendering progress.
//! 4. Report the built image id.
//!
use crate::common::archive::ArchiveBuilder;
use crate::common::docker::{self, BuildOptions, DaemonClient};
use crate::core::config;
use crate::core::error::Result;
use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use tracing::{debug, info};

#[derive(Parser, Debug)]
pub struct BuildArgs {
    /// Context directory, or the Dockerfile to build from.
    #[arg(default_value = ".")]
    path: PathBuf,

    /// Name and optionally a tag (`name:tag`) for the built image.
    #[arg(short, long)]
    tag: Option<String>,

    /// Dockerfile name inside the context directory. Defaults to `[build] dockerfile`.
    #[arg(short, long)]
    file: Option<String>,

    /// Do not use the daemon's layer cache.
    #[arg(long)]
    no_cache: bool,

    /// Print only the final result.
    #[arg(short, long)]
    quiet: bool,
}

pub async fn handle_build(args: BuildArgs, host: Option<&str>) -> Result<()> {
    info!("Handling image build command...");
    debug!("Build args: {:?}", args);

    let cfg = config::load_config(host).context("Failed to load dockhand configuration")?;
    let dockerfile = args.file.as_deref().unwrap_or(&cfg.build.dockerfile);
    let builder = ArchiveBuilder::for_build(&args.path, dockerfile)?;

    let options = BuildOptions {
        tag: args.tag.clone(),
        no_cache: args.no_cache,
        remove_intermediate: cfg.build.remove_intermediate,
        quiet: args.quiet || cfg.build.quiet,
    };
    let client = DaemonClient::from_config(&cfg.daemon)?;
    let outcome = docker::build_image(&client, builder, &options)
        .await
        .with_context(|| format!("Failed to build image from {}", args.path.display()))?;

    match (&outcome.image_id, options.quiet) {
        (Some(id), true) => println!("{}", id),
        (None, true) => {
            if let Some(summary) = &outcome.summary {
                println!("{}", summary);
            }
        }
        (Some(id), false) => info!("Built image {}", id),
        (None, false) => debug!("Build output carried no image id"),
    }
    Ok(())
}
