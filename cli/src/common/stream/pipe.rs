//! # Bounded Producer/Consumer Pipe (`common::stream::pipe`)
//!
//! File: cli/src/common/stream/pipe.rs
//!
//! ## Overview
//!
//! Connects the synchronous archive producer to the asynchronous HTTP request
//! body without buffering the whole archive in memory.
//!
//! - `PipeWriter` implements `std::io::Write` and is used from a blocking
//!   thread (`tokio::task::spawn_blocking`). Each write blocks while the
//!   channel is full.
//! - `PipeReader` implements `Stream<Item = io::Result<Bytes>>` and is polled by
//!   hyper as the request body.
//!
//! Dropping the writer ends the stream for the reader. Dropping the reader makes
//! every further write fail with `BrokenPipe`, which stops the archive walk.
//!
//! ```rust
//! let (writer, reader) = pipe::pipe();
//! tokio::task::spawn_blocking(move || {
//!     let mut out = std::io::BufWriter::with_capacity(pipe::WRITE_BUFFER_SIZE, writer);
//!     out.write_all(b"payload")
//! });
//! let body = reader.into_body();
//! ```
//!
use bytes::Bytes;
use futures_util::{Stream, TryStreamExt};
use http_body_util::{BodyExt, StreamBody};
use hyper::body::Frame;
use std::{
    io::{self, Write},
    pin::Pin,
    task::{Context, Poll},
};
use tokio::sync::mpsc;

use crate::common::docker::transport::RequestBody;

/// Chunks that may be in flight before the producer blocks.
pub const PIPE_CAPACITY: usize = 8;
/// Buffer size producers should put in front of a `PipeWriter`.
pub const WRITE_BUFFER_SIZE: usize = 32 * 1024;

/// Creates a connected writer/reader pair.
pub fn pipe() -> (PipeWriter, PipeReader) {
    let (tx, rx) = mpsc::channel(PIPE_CAPACITY);
    (PipeWriter { tx }, PipeReader { rx })
}

/// Blocking write half. Must not be used from inside an async task.
#[derive(Debug)]
pub struct PipeWriter {
    tx: mpsc::Sender<Bytes>,
}

impl Write for PipeWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        self.tx
            .blocking_send(Bytes::copy_from_slice(buf))
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "pipe reader was closed"))?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Async read half.
#[derive(Debug)]
pub struct PipeReader {
    rx: mpsc::Receiver<Bytes>,
}

impl PipeReader {
    /// Wraps the reader as a streaming HTTP request body.
    pub fn into_body(self) -> RequestBody {
        StreamBody::new(self.map_ok(Frame::data)).boxed_unsync()
    }
}

impl Stream for PipeReader {
    type Item = io::Result<Bytes>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx).map(|chunk| chunk.map(Ok))
    }
}
