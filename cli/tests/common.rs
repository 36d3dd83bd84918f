//! # Dockhand CLI Integration Test Common Helpers
//!
//! File: cli/tests/common.rs
//!
//! ## Overview
//!
//! Shared helpers for the integration test crates in `cli/tests/`.
//!

// Not every test crate uses every helper.
#![allow(dead_code)]

pub use assert_cmd::Command;

/// Daemon address that is guaranteed not to answer.
pub const UNREACHABLE_HOST: &str = "unix:///nonexistent/dockhand-test.sock";

/// `assert_cmd` command for the compiled `dockhand` binary, pointed at an
/// unreachable daemon so nothing in the test run can touch a real one.
pub fn dockhand_cmd() -> Command {
    let mut cmd =
        Command::cargo_bin("dockhand").expect("Failed to find dockhand binary for testing");
    cmd.env("DOCKER_HOST", UNREACHABLE_HOST).env_remove("RUST_LOG");
    cmd
}
