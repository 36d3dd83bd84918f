//! # Docker Container Interaction (`common::docker::interaction`)
//!
//! File: cli/src/common/docker/interaction.rs
//!
//! ## Overview
//!
//! Reads data back out of existing containers:
//!
//! - **`get_container_logs`**: fetches a container's logs to completion and
//!   splits them back into stdout and stderr.
//! - **`export_container`**: copies a container's filesystem export (a tar
//!   stream) to a file or stdout.
//!
//! ## Architecture
//!
//! Logs of a container created without a TTY arrive as a framed stream (see
//! `common::stream::demux`); with a TTY they are raw bytes and are written to
//! stdout unchanged. The TTY flag comes from an inspect call made first, which
//! also turns a missing container into `DockhandError::ContainerNotFound`.
//!
//! Export is a plain byte copy; nothing in it is decoded.
//!
use crate::common::stream::{self, demux};
use crate::core::error::{DockhandError, Result};
use anyhow::{anyhow, Context};
use bollard::Docker;
use hyper::Method;
use std::{
    collections::HashMap,
    fs::File,
    io::{self, BufWriter, Write},
    path::Path,
};
use tracing::{debug, info, instrument};

use super::state::container_uses_tty;
use super::transport::DaemonClient;

/// `--tail` value: a line count or `all`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogTail {
    All,
    Lines(u64),
}

impl LogTail {
    pub fn parse(value: &str) -> Result<Self> {
        let value = value.trim();
        if value.eq_ignore_ascii_case("all") {
            return Ok(LogTail::All);
        }
        value.parse::<u64>().map(LogTail::Lines).map_err(|_| {
            anyhow!(DockhandError::ArgumentParsing(format!(
                "Invalid --tail value '{}': expected a number or 'all'",
                value
            )))
        })
    }
}

impl std::fmt::Display for LogTail {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogTail::All => write!(f, "all"),
            LogTail::Lines(n) => write!(f, "{}", n),
        }
    }
}

/// Query string for `GET /containers/{name}/logs`.
pub fn logs_query(tail: LogTail, timestamps: bool) -> String {
    let mut query = format!("stdout=1&stderr=1&tail={}", tail);
    if timestamps {
        query.push_str("&timestamps=1");
    }
    query
}

/// Writes a container's logs to stdout and stderr.
#[instrument(skip(client, docker))]
pub async fn get_container_logs(
    client: &DaemonClient,
    docker: &Docker,
    name_or_id: &str,
    tail: LogTail,
    timestamps: bool,
) -> Result<()> {
    let tty = container_uses_tty(docker, name_or_id).await?;
    let path = client.versioned_path(&format!(
        "/containers/{}/logs?{}",
        name_or_id,
        logs_query(tail, timestamps)
    ));
    let response = client
        .send_streaming_request(Method::GET, &path, None, &HashMap::new())
        .await?;
    let data = response
        .read_to_end()
        .await
        .with_context(|| format!("Failed to read logs of container '{}'", name_or_id))?;
    info!("Received {} byte(s) of logs (tty: {})", data.len(), tty);

    let logs = if tty {
        demux::DemuxResult::raw(data)
    } else {
        demux::demultiplex(&data)
    };
    write_logs(&logs, io::stdout().lock(), io::stderr().lock())
}

fn write_logs<O: Write, E: Write>(logs: &demux::DemuxResult, mut out: O, mut err: E) -> Result<()> {
    out.write_all(&logs.stdout)
        .and_then(|_| out.flush())
        .context("Failed to write container stdout")?;
    err.write_all(&logs.stderr)
        .and_then(|_| err.flush())
        .context("Failed to write container stderr")?;
    Ok(())
}

/// Streams `GET /containers/{name}/export` to `output`, or stdout when `None`.
#[instrument(skip(client))]
pub async fn export_container(
    client: &DaemonClient,
    name_or_id: &str,
    output: Option<&Path>,
) -> Result<u64> {
    let path = client.versioned_path(&format!("/containers/{}/export", name_or_id));
    let response = client
        .send_streaming_request(Method::GET, &path, None, &HashMap::new())
        .await
        .with_context(|| format!("Failed to export container '{}'", name_or_id))?;

    let copied = match output {
        Some(file_path) => {
            let file = File::create(file_path)
                .with_context(|| format!("Failed to create {}", file_path.display()))?;
            stream::copy_raw(response.into_stream(), BufWriter::new(file)).await?
        }
        None => stream::copy_raw(response.into_stream(), io::stdout().lock()).await?,
    };
    debug!("Exported {} byte(s) from '{}'", copied, name_or_id);
    Ok(copied)
}

// --- Unit Tests ---
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_tail_parse() -> Result<()> {
        assert_eq!(LogTail::parse("all")?, LogTail::All);
        assert_eq!(LogTail::parse("ALL")?, LogTail::All);
        assert_eq!(LogTail::parse(" 25 ")?, LogTail::Lines(25));
        assert!(LogTail::parse("-3").is_err());
        assert!(LogTail::parse("lots").is_err());
        Ok(())
    }

    #[test]
    fn test_logs_query() {
        assert_eq!(
            logs_query(LogTail::All, false),
            "stdout=1&stderr=1&tail=all"
        );
        assert_eq!(
            logs_query(LogTail::Lines(10), true),
            "stdout=1&stderr=1&tail=10&timestamps=1"
        );
    }

    #[test]
    fn test_write_logs_splits_streams() -> Result<()> {
        let framed = [
            vec![1u8, 0, 0, 0, 0, 0, 0, 3],
            b"out".to_vec(),
            vec![2u8, 0, 0, 0, 0, 0, 0, 3],
            b"err".to_vec(),
        ]
        .concat();
        let logs = demux::demultiplex(&framed);
        let (mut out, mut err) = (Vec::new(), Vec::new());
        write_logs(&logs, &mut out, &mut err)?;
        assert_eq!(out, b"out");
        assert_eq!(err, b"err");
        Ok(())
    }
}
