//! # Dockhand Common Utilities (`common`)
//!
//! File: cli/src/common/mod.rs
//!
//! ## Overview
//!
//! Shared building blocks used by the command handlers in `commands::`:
//!
//! - **`archive`**: `.dockerignore` matching and build-context tar archives.
//! - **`docker`**: the daemon clients and the operations built on them.
//! - **`stream`**: the byte pipe feeding request bodies, log demultiplexing,
//!   and decoding plus rendering of JSON progress streams.
//! - **`ui`**: terminal capabilities captured once per session.
//!

/// Build-context archives and ignore rules.
pub mod archive;
/// Docker daemon access.
pub mod docker;
/// Streaming plumbing between the daemon and the terminal.
pub mod stream;
/// Terminal capabilities.
pub mod ui;
