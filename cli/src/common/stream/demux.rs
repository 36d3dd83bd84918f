//! # Multiplexed Log Stream Splitting (`common::stream::demux`)
//!
//! File: cli/src/common/stream/demux.rs
//!
//! ## Overview
//!
//! A container without a TTY returns its logs as a sequence of frames, each an
//! 8-byte header followed by a payload:
//!
//! ```text
//! [tag][0][0][0][len: u32 big-endian][payload: len bytes]
//! ```
//!
//! where `tag` is `0` (stdin), `1` (stdout) or `2` (stderr). `demultiplex`
//! splits such a buffer into stdout and stderr text. Stdin payloads are
//! reported on stdout. Frames with any other tag are skipped, and a truncated
//! trailing frame ends the parse with whatever was complete.
//!
//! TTY containers write raw bytes with no framing; `DemuxResult::raw` covers
//! that case without parsing.
//!
use tracing::debug;

/// Size of a frame header.
pub const HEADER_LEN: usize = 8;

/// Stream a frame belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    Stdin,
    Stdout,
    Stderr,
}

impl StreamKind {
    fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(Self::Stdin),
            1 => Some(Self::Stdout),
            2 => Some(Self::Stderr),
            _ => None,
        }
    }
}

/// One decoded frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame<'a> {
    pub tag: u8,
    pub payload: &'a [u8],
}

impl Frame<'_> {
    pub fn kind(&self) -> Option<StreamKind> {
        StreamKind::from_tag(self.tag)
    }
}

/// Iterator over the complete frames in a buffer.
#[derive(Debug, Clone)]
pub struct Frames<'a> {
    rest: &'a [u8],
}

/// Iterates over the frames of `src`, stopping at the first incomplete one.
pub fn frames(src: &[u8]) -> Frames<'_> {
    Frames { rest: src }
}

impl<'a> Iterator for Frames<'a> {
    type Item = Frame<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.rest.is_empty() {
            return None;
        }
        if self.rest.len() < HEADER_LEN {
            debug!(
                "Dropping {} trailing byte(s) shorter than a frame header",
                self.rest.len()
            );
            self.rest = &[];
            return None;
        }
        let tag = self.rest[0];
        let len =
            u32::from_be_bytes([self.rest[4], self.rest[5], self.rest[6], self.rest[7]]) as usize;
        let body = &self.rest[HEADER_LEN..];
        if body.len() < len {
            debug!(
                "Dropping truncated frame: header announced {} byte(s), {} available",
                len,
                body.len()
            );
            self.rest = &[];
            return None;
        }
        let (payload, rest) = body.split_at(len);
        self.rest = rest;
        Some(Frame { tag, payload })
    }
}

/// Text extracted from a log response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DemuxResult {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl DemuxResult {
    /// Output of a TTY container: everything is stdout, nothing is parsed.
    pub fn raw(data: Vec<u8>) -> Self {
        Self {
            stdout: data,
            stderr: Vec::new(),
        }
    }
}

/// Splits a multiplexed log buffer into stdout and stderr.
pub fn demultiplex(src: &[u8]) -> DemuxResult {
    let mut result = DemuxResult::default();
    for frame in frames(src) {
        match frame.kind() {
            Some(StreamKind::Stdin) | Some(StreamKind::Stdout) => {
                result.stdout.extend_from_slice(frame.payload)
            }
            Some(StreamKind::Stderr) => result.stderr.extend_from_slice(frame.payload),
            None => debug!("Skipping frame with unknown stream tag {}", frame.tag),
        }
    }
    result
}

// --- Unit Tests ---
#[cfg(test)]
mod tests {
    use super::*;

    fn frame(tag: u8, payload: &[u8]) -> Vec<u8> {
        let mut out = vec![tag, 0, 0, 0];
        out.extend_from_slice(&(payload.len() as u32).to_be_bytes());
        out.extend_from_slice(payload);
        out
    }

    #[test]
    fn test_split_stdout_and_stderr() {
        let mut src = frame(1, b"A");
        src.extend(frame(2, b"C"));
        src.extend(frame(1, b"B"));
        let result = demultiplex(&src);
        assert_eq!(result.stdout, b"AB");
        assert_eq!(result.stderr, b"C");
    }

    #[test]
    fn test_stdin_frames_go_to_stdout() {
        let result = demultiplex(&frame(0, b"typed"));
        assert_eq!(result.stdout, b"typed");
        assert!(result.stderr.is_empty());
    }

    #[test]
    fn test_unknown_tag_is_skipped() {
        let mut src = frame(7, b"junk");
        src.extend(frame(1, b"ok"));
        let result = demultiplex(&src);
        assert_eq!(result.stdout, b"ok");
        assert!(result.stderr.is_empty());
    }

    #[test]
    fn test_truncated_payload_keeps_prior_frames() {
        let mut src = frame(1, b"complete");
        let mut partial = frame(2, b"cut short");
        partial.truncate(HEADER_LEN + 3);
        src.extend(partial);
        let result = demultiplex(&src);
        assert_eq!(result.stdout, b"complete");
        assert!(result.stderr.is_empty());
    }

    #[test]
    fn test_truncated_header() {
        let mut src = frame(2, b"err");
        src.extend_from_slice(&[1, 0, 0]);
        let result = demultiplex(&src);
        assert_eq!(result.stderr, b"err");
        assert!(result.stdout.is_empty());
    }

    #[test]
    fn test_empty_payload_frame() {
        let mut src = frame(1, b"");
        src.extend(frame(1, b"x"));
        assert_eq!(frames(&src).count(), 2);
        assert_eq!(demultiplex(&src).stdout, b"x");
    }

    #[test]
    fn test_raw_bypass() {
        let result = DemuxResult::raw(b"\x01\x00 not a header".to_vec());
        assert_eq!(result.stdout, b"\x01\x00 not a header");
        assert!(result.stderr.is_empty());
    }
}
