//! # Dockhand Command Modules
//!
//! File: cli/src/commands/mod.rs
//!
//! ## Overview
//!
//! The top-level command groups of the CLI, routed from `main.rs`:
//!
//! - `image`: `build` and `pull`.
//! - `container`: `logs`, `export` and `upload`.
//!
//! Each group defines a clap `XArgs` struct holding a subcommand enum and an
//! async `handle_x` dispatcher. Handlers load the configuration themselves,
//! applying the global `--host` override.
//!

/// Commands acting on existing containers.
pub mod container;
/// Commands producing images.
pub mod image;
