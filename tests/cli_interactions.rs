//! CLI options interaction tests
//!
//! These tests exercise argument parsing and the failure paths of the
//! `netdiag` binary; none of them needs network access.

use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::process::Command;
use tempfile::TempDir;

const DIAG_VARS: &[&str] = &[
    "DIAG_DOMAINS",
    "DIAG_APP_NAME",
    "DIAG_APP_VERSION",
    "DIAG_USER_ID",
    "DIAG_TRACE_ENGINE",
    "DIAG_PING_COUNT",
    "DIAG_MAX_HOPS",
    "DIAG_TIMEOUT_SECONDS",
    "DIAG_SOCKET_PROBE",
    "DIAG_OPERATOR_URL",
    "ENABLE_COLOR",
];

/// Helper function to create a test command isolated from the caller's env
fn create_test_cmd(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("netdiag").unwrap();
    cmd.current_dir(dir.path());
    for var in DIAG_VARS {
        cmd.env_remove(var);
    }
    cmd
}

#[test]
fn test_help_lists_options() {
    let dir = TempDir::new().unwrap();
    create_test_cmd(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--domain"))
        .stdout(predicate::str::contains("--engine"))
        .stdout(predicate::str::contains("--socket-probe"));
}

#[test]
fn test_version_flag() {
    let dir = TempDir::new().unwrap();
    create_test_cmd(&dir)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_missing_domains_exit_code() {
    let dir = TempDir::new().unwrap();
    create_test_cmd(&dir)
        .arg("--no-color")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Domain list is empty"));
}

#[test]
fn test_invalid_engine_rejected() {
    let dir = TempDir::new().unwrap();
    create_test_cmd(&dir)
        .args(["--domain", "a.example.com", "--engine", "icmp"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("icmp"));
}

#[test]
fn test_count_bounds() {
    let dir = TempDir::new().unwrap();
    create_test_cmd(&dir)
        .args(["--domain", "a.example.com", "--count", "0"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("greater than 0"));

    create_test_cmd(&dir)
        .args(["--domain", "a.example.com", "--max-hops", "65"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("cannot exceed 64"));
}

#[test]
fn test_conflicting_color_flags() {
    let dir = TempDir::new().unwrap();
    create_test_cmd(&dir)
        .args(["--domain", "a.example.com", "--color", "--no-color"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Cannot specify both --color and --no-color"));
}

#[test]
fn test_blank_domain_rejected() {
    let dir = TempDir::new().unwrap();
    create_test_cmd(&dir)
        .args(["--no-color", "--domain", "a.example.com", "--domain", " "])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("--domain #2 is blank"));
}

#[test]
fn test_invalid_domain_in_env_file() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join(".env"), "DIAG_DOMAINS=https://a.example.com/path\n").unwrap();

    create_test_cmd(&dir)
        .arg("--no-color")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("CONFIG").or(predicate::str::contains("VALIDATION")));
}

#[test]
fn test_malformed_env_value() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join(".env"), "DIAG_PING_COUNT=lots\n").unwrap();

    create_test_cmd(&dir)
        .args(["--no-color", "--domain", "a.example.com"])
        .assert()
        .failure();
}
