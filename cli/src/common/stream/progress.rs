//! # JSON Progress Message Decoding (`common::stream::progress`)
//!
//! File: cli/src/common/stream/progress.rs
//!
//! ## Overview
//!
//! Build and pull responses are a sequence of JSON objects written back to back
//! with no delimiter. Object boundaries are unrelated to HTTP chunk boundaries,
//! so one chunk may hold several objects, or half of one.
//!
//! - `ProgressMessage` mirrors one object. Every field is optional.
//! - `MessageDecoder` is the incremental decoder: push bytes, pull complete
//!   messages. At end of input, anything left other than whitespace means the
//!   stream was cut mid-object (`TruncatedStream`).
//! - `display_message_stream` drives a decoder over a byte stream and hands
//!   each message to a `TerminalRenderer`, stopping at the first failure.
//!
//! ## Message semantics
//!
//! A message carrying `errorDetail` (or the deprecated top-level `error`)
//! reports a failure. Code 401 becomes `AuthenticationRequired`; any other code
//! becomes `DaemonMessage` with the daemon's text.
//!
use crate::core::error::{DockhandError, Result};
use anyhow::{anyhow, Context};
use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use serde::Deserialize;
use std::io::{self, Write};
use tracing::{debug, trace};

use super::render::TerminalRenderer;

/// Numeric progress of one operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct ProgressDetail {
    #[serde(default)]
    pub current: i64,
    #[serde(default)]
    pub total: i64,
    /// Unix seconds at which the operation started.
    #[serde(default)]
    pub start: i64,
}

/// Structured failure reported inside the stream.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ErrorDetail {
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub message: String,
}

/// One decoded message. Absent text fields decode as empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ProgressMessage {
    pub stream: String,
    pub status: String,
    #[serde(rename = "progressDetail")]
    pub progress_detail: Option<ProgressDetail>,
    /// Preformatted progress text from older daemons.
    pub progress: String,
    pub id: String,
    pub from: String,
    /// Unix seconds; `0` when absent.
    pub time: i64,
    #[serde(rename = "errorDetail")]
    pub error_detail: Option<ErrorDetail>,
    /// Deprecated top-level error text.
    pub error: String,
}

impl ProgressMessage {
    /// Whether this message updates a progress row.
    pub fn is_progress(&self) -> bool {
        self.progress_detail.is_some() || !self.progress.is_empty()
    }

    /// The failure this message reports, if any.
    pub fn failure(&self) -> Option<DockhandError> {
        match &self.error_detail {
            Some(detail) if detail.code == 401 => Some(DockhandError::AuthenticationRequired),
            Some(detail) => Some(DockhandError::DaemonMessage {
                code: detail.code,
                message: if detail.message.is_empty() {
                    self.error.clone()
                } else {
                    detail.message.clone()
                },
            }),
            None if !self.error.is_empty() => Some(DockhandError::DaemonMessage {
                code: 0,
                message: self.error.clone(),
            }),
            None => None,
        }
    }
}

/// Incremental decoder for back-to-back JSON objects.
#[derive(Debug, Default)]
pub struct MessageDecoder {
    buf: Vec<u8>,
}

impl MessageDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a chunk of input.
    pub fn push(&mut self, chunk: &[u8]) {
        self.buf.extend_from_slice(chunk);
    }

    /// Returns the next complete message, or `None` if more input is needed.
    /// Malformed JSON is a `Protocol` error.
    pub fn next_message(&mut self) -> Result<Option<ProgressMessage>> {
        let mut iter =
            serde_json::Deserializer::from_slice(&self.buf).into_iter::<ProgressMessage>();
        let decoded = match iter.next() {
            None => {
                // Only whitespace is buffered.
                self.buf.clear();
                return Ok(None);
            }
            Some(Ok(message)) => message,
            Some(Err(e)) if e.is_eof() => return Ok(None),
            Some(Err(e)) => return Err(anyhow!(DockhandError::from(e))),
        };
        let consumed = iter.byte_offset();
        self.buf.drain(..consumed);
        trace!("Decoded message: {:?}", decoded);
        Ok(Some(decoded))
    }

    /// Bytes buffered but not yet decoded.
    #[cfg(test)]
    fn pending(&self) -> usize {
        self.buf.len()
    }

    /// Ends the input. Leftover non-whitespace bytes mean the stream was cut.
    pub fn finish(self) -> Result<()> {
        let pending = self
            .buf
            .iter()
            .filter(|b| !b.is_ascii_whitespace())
            .count();
        if pending > 0 {
            return Err(anyhow!(DockhandError::TruncatedStream {
                pending: self.buf.len()
            }));
        }
        Ok(())
    }
}

/// Decodes every message in `body` and renders it, in order.
///
/// Returns the renderer's summary line. Stops at the first transport error,
/// malformed object, or daemon-reported failure.
pub async fn display_message_stream<S, W>(
    mut body: S,
    renderer: &mut TerminalRenderer<W>,
) -> Result<Option<String>>
where
    S: Stream<Item = io::Result<Bytes>> + Unpin,
    W: Write,
{
    let mut decoder = MessageDecoder::new();
    let mut count = 0usize;
    while let Some(chunk) = body.next().await {
        let chunk = chunk.context("Failed to read message stream from daemon")?;
        decoder.push(&chunk);
        while let Some(message) = decoder.next_message()? {
            renderer.render(&message)?;
            count += 1;
        }
    }
    decoder.finish()?;
    debug!("Message stream finished after {} message(s)", count);
    Ok(renderer.summary().map(str::to_string))
}
