//! # Dockhand Build Context Archiving (`common::archive`)
//!
//! File: cli/src/common/archive/mod.rs
//!
//! ## Overview
//!
//! Everything needed to turn a directory on disk into the tar stream the Docker
//! daemon expects as a build context:
//!
//! - **`ignore`**: `.dockerignore` parsing and glob matching (`IgnoreMatcher`).
//! - **`tar`**: the directory walk and tar serialization (`ArchiveBuilder`),
//!   in both whole-directory and single-source (upload) modes.
//!
//! The archive is written to any `std::io::Write`. In production that writer is
//! the producer half of a `common::stream::pipe`, so the daemon starts receiving
//! bytes before the walk has finished.
//!
//! ## Examples
//!
//! ```rust
//! use crate::common::archive::ArchiveBuilder;
//! use std::path::Path;
//!
//! # fn run() -> anyhow::Result<()> {
//! let builder = ArchiveBuilder::for_build(Path::new("./app"), "Dockerfile")?;
//! let mut bytes = Vec::new();
//! let summary = builder.write_to(&mut bytes)?;
//! println!("{} file(s), {} bytes", summary.files, summary.total_bytes);
//! # Ok(())
//! # }
//! ```
//!

pub mod ignore;
pub mod tar;

pub use self::ignore::IgnoreMatcher;
pub use self::tar::{ArchiveBuilder, ArchiveSummary};

/// Name of the ignore file read from the context root.
pub const DOCKERIGNORE: &str = ".dockerignore";
/// Name the daemon looks for inside the context.
pub const DOCKERFILE: &str = "Dockerfile";
