//! # Container Command Group
//!
//! File: cli/src/commands/container/mod.rs
//!
//! ## Overview
//!
//! Router for `dockhand container <subcommand>`: reading logs, exporting a
//! container's filesystem, and uploading local files into a container.
//!
//! ## Examples
//!
//! ```bash
//! # Last 50 lines of logs, with timestamps
//! dockhand container logs web --tail 50 -t
//!
//! # Export the filesystem of a container to a tarball
//! dockhand container export web -o web.tar
//!
//! # Copy a directory into a container
//! dockhand container upload ./site web:/usr/share/nginx/html
//! ```
//!
use crate::core::error::Result;
use clap::{Parser, Subcommand};

/// Implements `dockhand container export`.
mod export;
/// Implements `dockhand container logs`.
mod logs;
/// Implements `dockhand container upload`.
mod upload;

#[derive(Parser, Debug)]
pub struct ContainerArgs {
    #[command(subcommand)]
    command: ContainerCommand,
}

#[derive(Subcommand, Debug)]
enum ContainerCommand {
    /// Export a container's filesystem as a tar archive.
    Export(export::ExportArgs),
    /// Fetch the logs of a container.
    Logs(logs::LogsArgs),
    /// Copy a local file or directory into a container.
    Upload(upload::UploadArgs),
}

/// Dispatches `dockhand container` subcommands.
pub async fn handle_container(args: ContainerArgs, host: Option<&str>) -> Result<()> {
    match args.command {
        ContainerCommand::Export(args) => export::handle_export(args, host).await,
        ContainerCommand::Logs(args) => logs::handle_logs(args, host).await,
        ContainerCommand::Upload(args) => upload::handle_upload(args, host).await,
    }
}
