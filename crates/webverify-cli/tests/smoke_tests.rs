//! Smoke tests for the webverify binary
//!
//! None of these launch a browser; they cover parsing, config and the
//! error paths that exit before a session opens.

#![allow(deprecated)] // Command::cargo_bin
#![allow(clippy::expect_used, clippy::unwrap_used)]

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn webverify() -> Command {
    let mut cmd = Command::cargo_bin("webverify").expect("webverify binary should exist");
    cmd.env_remove("WEBVERIFY_CONFIG")
        .env_remove("WEBVERIFY_BASE_URL")
        .env_remove("RUST_LOG");
    cmd
}

const HOME_SCENARIO: &str = r"
name: home
description: Landing page renders
steps:
  - name: Home renders
    navigate: /
    expect: { type: visible, locator: { css: h2 } }
";

// ============================================================================
// Basic CLI Tests
// ============================================================================

#[test]
fn test_version_flag() {
    webverify()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_help_flag() {
    webverify()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("cleanup"))
        .stdout(predicate::str::contains("validate"));
}

#[test]
fn test_no_subcommand_fails() {
    webverify().assert().failure();
}

#[test]
fn test_list_shows_builtins() {
    webverify()
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("login"))
        .stdout(predicate::str::contains("full-features"))
        .stdout(predicate::str::contains("map-pin"));
}

// ============================================================================
// Validate
// ============================================================================

#[test]
fn test_validate_good_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("home.yaml");
    fs::write(&path, HOME_SCENARIO).unwrap();

    webverify()
        .args(["validate", path.to_str().unwrap()])
        .assert()
        .code(0)
        .stderr(predicate::str::contains("'home' with 1 step(s)"));
}

#[test]
fn test_validate_bad_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("bad.yaml");
    fs::write(&path, "name: bad\nsteps: []\n").unwrap();

    webverify()
        .args(["validate", path.to_str().unwrap()])
        .assert()
        .code(2);
}

// ============================================================================
// Config
// ============================================================================

#[test]
fn test_config_base_url_flag() {
    let dir = TempDir::new().unwrap();
    webverify()
        .current_dir(dir.path())
        .args(["config", "--base-url", "http://localhost:3003"])
        .assert()
        .success()
        .stdout(predicate::str::contains("base_url: http://localhost:3003"));
}

#[test]
fn test_config_file_is_layered() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("webverify.yaml"),
        "base_url: http://staging:3000\nwait:\n  timeout_ms: 9000\n",
    )
    .unwrap();
    webverify()
        .current_dir(dir.path())
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("http://staging:3000"))
        .stdout(predicate::str::contains("9000"));
}

#[test]
fn test_config_defaults() {
    webverify()
        .args(["config", "--defaults"])
        .assert()
        .success()
        .stdout(predicate::str::contains("http://localhost:3000"));
}

#[test]
fn test_invalid_base_url_is_config_error() {
    let dir = TempDir::new().unwrap();
    webverify()
        .current_dir(dir.path())
        .args(["config", "--base-url", "localhost:3003"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Error:"));
}

// ============================================================================
// Errors before launch
// ============================================================================

#[test]
fn test_run_without_scenarios() {
    let dir = TempDir::new().unwrap();
    webverify()
        .current_dir(dir.path())
        .arg("run")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("no scenarios selected"));
}

#[test]
fn test_run_unknown_scenario() {
    let dir = TempDir::new().unwrap();
    webverify()
        .current_dir(dir.path())
        .args(["run", "checkout"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Unknown scenario 'checkout'"));
}

#[test]
fn test_cleanup_scenario_without_cleanup() {
    let dir = TempDir::new().unwrap();
    webverify()
        .current_dir(dir.path())
        .args(["cleanup", "login"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("has no cleanup"));
}
