//! # Container Logs Handler
//!
//! File: cli/src/commands/container/logs.rs
//!
//! ## Overview
//!
//! Implements `dockhand container logs NAME`. The logs are fetched to
//! completion; the container's stdout goes to stdout and its stderr to stderr.
//!
//! ```bash
//! dockhand container logs web
//! dockhand container logs web --tail 20 --timestamps
//! ```
//!
use crate::common::docker::{self, DaemonClient, LogTail};
use crate::core::config;
use crate::core::error::Result;
use anyhow::Context;
use clap::Parser;
use tracing::info;

#[derive(Parser, Debug)]
pub struct LogsArgs {
    /// Name or ID of the container.
    #[arg(required = true)]
    container_name_or_id: String,

    /// Number of lines to show from the end of the logs, or `all`.
    #[arg(long, default_value = "all")]
    tail: String,

    /// Prefix every line with its timestamp.
    #[arg(short, long)]
    timestamps: bool,
}

pub async fn handle_logs(args: LogsArgs, host: Option<&str>) -> Result<()> {
    info!(
        "Handling container logs command for '{}' (tail: {}, timestamps: {})",
        args.container_name_or_id, args.tail, args.timestamps
    );
    let tail = LogTail::parse(&args.tail)?;

    let cfg = config::load_config(host).context("Failed to load dockhand configuration")?;
    let client = DaemonClient::from_config(&cfg.daemon)?;
    let docker = docker::connect_docker(&cfg.daemon).await?;
    docker::get_container_logs(
        &client,
        &docker,
        &args.container_name_or_id,
        tail,
        args.timestamps,
    )
    .await
    .with_context(|| {
        format!(
            "Failed to get logs for container '{}'",
            args.container_name_or_id
        )
    })
}

// --- Unit Tests ---
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logs_args_parsing() {
        let args = LogsArgs::try_parse_from(["logs", "web", "--tail", "500", "-t"]).unwrap();
        assert_eq!(args.container_name_or_id, "web");
        assert_eq!(args.tail, "500");
        assert!(args.timestamps);
    }

    #[test]
    fn test_logs_args_defaults_to_all() {
        let args = LogsArgs::try_parse_from(["logs", "web"]).unwrap();
        assert_eq!(args.tail, "all");
        assert!(!args.timestamps);
    }

    #[test]
    fn test_logs_args_requires_name() {
        assert!(LogsArgs::try_parse_from(["logs"]).is_err());
    }
}
