//! # Dockhand CLI Container Integration Tests
//!
//! File: cli/tests/container.rs
//!
//! ## Overview
//!
//! Integration tests for `dockhand container logs`, `export` and `upload`.
//! Argument errors are checked against the binary directly; anything that
//! needs a container is `#[ignore]`d and needs a running Docker daemon.
//!

mod common;
use common::*;
use predicates::prelude::*;

#[test]
fn test_logs_requires_container() {
    dockhand_cmd()
        .args(["container", "logs"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("<CONTAINER_NAME_OR_ID>"));
}

#[test]
fn test_logs_rejects_bad_tail_before_connecting() {
    dockhand_cmd()
        .args(["container", "logs", "web", "--tail", "lots"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Invalid --tail value 'lots'"));
}

#[test]
fn test_upload_rejects_destination_without_path() {
    let temp_dir = tempfile::tempdir().unwrap();
    std::fs::write(temp_dir.path().join("index.html"), "<h1>hi</h1>\n").unwrap();

    dockhand_cmd()
        .current_dir(temp_dir.path())
        .args(["container", "upload", "index.html", "web"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("NAME:PATH"));
}

#[test]
fn test_export_unreachable_daemon_fails() {
    let temp_dir = tempfile::tempdir().unwrap();
    dockhand_cmd()
        .current_dir(temp_dir.path())
        .args(["container", "export", "web", "-o", "web.tar"])
        .assert()
        .failure()
        .code(1);
    assert!(!temp_dir.path().join("web.tar").exists());
}

/// Requires a running Docker daemon and a container named `dockhand-test`.
#[test]
#[ignore]
fn test_logs_of_running_container() {
    Command::cargo_bin("dockhand")
        .unwrap()
        .args(["container", "logs", "dockhand-test", "--tail", "5"])
        .assert()
        .success();
}
