//! # Dockhand CLI Image Integration Tests
//!
//! File: cli/tests/image.rs
//!
//! ## Overview
//!
//! Integration tests for `dockhand image build` and `dockhand image pull`.
//! Everything here runs against an unreachable daemon address; the tests
//! check what happens before (or instead of) talking to the daemon.
//!
//! Tests needing a live daemon are `#[ignore]`d. Run them with
//! `cargo test -- --ignored` on a machine with Docker.
//!

mod common;
use common::*;
use predicates::prelude::*;
use std::fs;
use tempfile::tempdir;

#[test]
fn test_build_missing_dockerfile_fails_before_connecting() {
    let temp_dir = tempdir().unwrap();
    fs::write(temp_dir.path().join("main.c"), "int main(){}\n").unwrap();

    dockhand_cmd()
        .current_dir(temp_dir.path())
        .args(["image", "build", "."])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("No Dockerfile found"))
        .stderr(predicate::str::contains("Sending build context").not());
}

#[test]
fn test_build_malformed_dockerignore_fails_before_connecting() {
    let temp_dir = tempdir().unwrap();
    fs::write(temp_dir.path().join("Dockerfile"), "FROM scratch\n").unwrap();
    fs::write(temp_dir.path().join(".dockerignore"), "[abc\n").unwrap();

    dockhand_cmd()
        .current_dir(temp_dir.path())
        .args(["image", "build"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid ignore pattern"))
        .stderr(predicate::str::contains("Sending build context").not());
}

#[test]
fn test_build_unreachable_daemon_reports_transport_error() {
    let temp_dir = tempdir().unwrap();
    fs::write(temp_dir.path().join("Dockerfile"), "FROM scratch\n").unwrap();

    dockhand_cmd()
        .current_dir(temp_dir.path())
        .args(["image", "build", "-q"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Error: "));
}

#[test]
fn test_build_rejects_unknown_flag() {
    dockhand_cmd()
        .args(["image", "build", "--squash"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unexpected argument"));
}

#[test]
fn test_pull_requires_image() {
    dockhand_cmd()
        .args(["image", "pull"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("<IMAGE>"));
}

/// Requires a running Docker daemon with network access.
#[test]
#[ignore]
fn test_pull_busybox() {
    Command::cargo_bin("dockhand")
        .unwrap()
        .args(["image", "pull", "busybox:latest"])
        .assert()
        .success();
}
