//! # Dockhand Streaming Core (`common::stream`)
//!
//! File: cli/src/common/stream/mod.rs
//!
//! ## Overview
//!
//! The byte-level plumbing between the daemon and the user's terminal:
//!
//! - **`pipe`**: bounded channel from the blocking archive producer to the
//!   async request body.
//! - **`demux`**: splits multiplexed container log frames into stdout/stderr.
//! - **`progress`**: incremental decoding of back-to-back JSON messages.
//! - **`render`**: draws decoded messages, with in-place row updates on a terminal.
//!
//! `forward_response` is the single entry point used for streamed responses:
//! JSON bodies go through the decoder and renderer, anything else is copied
//! through unchanged.
//!
pub mod demux;
pub mod pipe;
pub mod progress;
pub mod render;

use crate::common::ui::TerminalInfo;
use crate::core::error::Result;
use anyhow::Context;
use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use std::io::{self, Write};
use tracing::debug;

pub use self::render::TerminalRenderer;

/// Sends a response body to `out`.
///
/// With `is_json`, messages are decoded and rendered and the summary line is
/// returned. Otherwise bytes are copied verbatim and the result is `None`.
pub async fn forward_response<S, W>(
    body: S,
    is_json: bool,
    out: W,
    terminal: TerminalInfo,
) -> Result<Option<String>>
where
    S: Stream<Item = io::Result<Bytes>> + Unpin,
    W: Write,
{
    if is_json {
        let mut renderer = TerminalRenderer::new(out, terminal);
        progress::display_message_stream(body, &mut renderer).await
    } else {
        let copied = copy_raw(body, out).await?;
        debug!("Copied {} raw byte(s) from response", copied);
        Ok(None)
    }
}

/// Copies every chunk of `body` to `out`, returning the byte count.
pub async fn copy_raw<S, W>(mut body: S, mut out: W) -> Result<u64>
where
    S: Stream<Item = io::Result<Bytes>> + Unpin,
    W: Write,
{
    let mut copied = 0u64;
    while let Some(chunk) = body.next().await {
        let chunk = chunk.context("Failed to read response body")?;
        out.write_all(&chunk).context("Failed to write response body")?;
        copied += chunk.len() as u64;
    }
    out.flush().context("Failed to flush response body")?;
    Ok(copied)
}

// --- Unit Tests ---
#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::stream;

    fn body(parts: &[&'static [u8]]) -> impl Stream<Item = io::Result<Bytes>> + Unpin {
        stream::iter(
            parts
                .iter()
                .map(|p| Ok(Bytes::from_static(p)))
                .collect::<Vec<_>>(),
        )
    }

    #[tokio::test]
    async fn test_non_json_is_copied_verbatim() -> Result<()> {
        let mut out = Vec::new();
        let summary = forward_response(
            body(&[b"{\"not\":", b" parsed}"]),
            false,
            &mut out,
            TerminalInfo::plain(),
        )
        .await?;
        assert!(summary.is_none());
        assert_eq!(out, b"{\"not\": parsed}");
        Ok(())
    }

    #[tokio::test]
    async fn test_json_is_rendered() -> Result<()> {
        let mut out = Vec::new();
        let summary = forward_response(
            body(&[b"{\"status\":\"Pulling from library/busybox\"}"]),
            true,
            &mut out,
            TerminalInfo::plain(),
        )
        .await?;
        assert_eq!(summary.as_deref(), Some("Pulling from library/busybox"));
        assert_eq!(out, b"Pulling from library/busybox\n");
        Ok(())
    }

    #[tokio::test]
    async fn test_copy_raw_propagates_read_errors() {
        let failing = stream::iter(vec![
            Ok(Bytes::from_static(b"partial")),
            Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset")),
        ]);
        let mut out = Vec::new();
        assert!(copy_raw(failing, &mut out).await.is_err());
        assert_eq!(out, b"partial");
    }
}
