//! # Image Command Group
//!
//! File: cli/src/commands/image/mod.rs
//!
//! ## Overview
//!
//! Router for `dockhand image <subcommand>`.
//!
//! ## Examples
//!
//! ```bash
//! # Build the current directory and tag the result
//! dockhand image build -t web:dev
//!
//! # Build from an alternate Dockerfile
//! dockhand image build ./services/api/Dockerfile.release
//!
//! # Pull an image
//! dockhand image pull busybox:1.36
//! ```
//!
use crate::core::error::Result;
use clap::{Parser, Subcommand};

/// Implements `dockhand image build`.
mod build;
/// Implements `dockhand image pull`.
mod pull;

#[derive(Parser, Debug)]
pub struct ImageArgs {
    #[command(subcommand)]
    command: ImageCommand,
}

#[derive(Subcommand, Debug)]
enum ImageCommand {
    /// Build an image from a directory or a Dockerfile.
    Build(build::BuildArgs),
    /// Pull an image from a registry.
    Pull(pull::PullArgs),
}

/// Dispatches `dockhand image` subcommands.
pub async fn handle_image(args: ImageArgs, host: Option<&str>) -> Result<()> {
    match args.command {
        ImageCommand::Build(args) => build::handle_build(args, host).await,
        ImageCommand::Pull(args) => pull::handle_pull(args, host).await,
    }
}

// --- Unit Tests ---
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_subcommands_parse() {
        let args = ImageArgs::try_parse_from(["image", "pull", "busybox"]).unwrap();
        assert!(matches!(args.command, ImageCommand::Pull(_)));
        let args = ImageArgs::try_parse_from(["image", "build"]).unwrap();
        assert!(matches!(args.command, ImageCommand::Build(_)));
        assert!(ImageArgs::try_parse_from(["image", "push"]).is_err());
    }
}
