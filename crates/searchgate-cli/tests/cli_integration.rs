//! Integration tests for searchgate-cli
//!
//! Each test points the binary at its own temporary database. Tests run
//! serially to avoid database lock conflicts.

use assert_cmd::Command;
use predicates::prelude::*;
use serial_test::serial;
use tempfile::TempDir;

/// Get a Command for the searchgate binary against a throwaway database
fn searchgate(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("searchgate").unwrap();
    cmd.env("SEARCHGATE_DB_PATH", dir.path().join("searchgate.db"))
        .env_remove("RUST_LOG");
    cmd
}

fn add_provider(dir: &TempDir, id: &str, extra: &[&str]) {
    searchgate(dir)
        .args(["provider", "add", "--id", id, "--base-url", "https://search.example"])
        .args(extra)
        .assert()
        .success();
}

// =============================================================================
// Help and Version Tests
// =============================================================================

#[test]
#[serial]
fn test_cli_help() {
    let dir = TempDir::new().unwrap();
    searchgate(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("searchgate"))
        .stdout(predicate::str::contains("serve"))
        .stdout(predicate::str::contains("provider"));
}

#[test]
#[serial]
fn test_cli_version() {
    let dir = TempDir::new().unwrap();
    searchgate(&dir)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("searchgate"));
}

#[test]
#[serial]
fn test_serve_help_lists_options() {
    let dir = TempDir::new().unwrap();
    searchgate(&dir)
        .args(["serve", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--bind"))
        .stdout(predicate::str::contains("--upstream-timeout"))
        .stdout(predicate::str::contains("--admin-token"));
}

#[test]
#[serial]
fn test_provider_add_help() {
    let dir = TempDir::new().unwrap();
    searchgate(&dir)
        .args(["provider", "add", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--per-minute"))
        .stdout(predicate::str::contains("--per-month"));
}

// =============================================================================
// Provider Command Tests
// =============================================================================

#[test]
#[serial]
fn test_provider_list_empty() {
    let dir = TempDir::new().unwrap();
    searchgate(&dir)
        .args(["provider", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No providers registered."));
}

#[test]
#[serial]
fn test_provider_add_then_list_json() {
    let dir = TempDir::new().unwrap();
    add_provider(&dir, "brave", &["--api-key", "super-secret", "--per-minute", "60"]);

    searchgate(&dir)
        .args(["provider", "list", "--format", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"id\": \"brave\""))
        .stdout(predicate::str::contains("\"per_minute\": 60"))
        .stdout(predicate::str::contains("\"has_api_key\": true"))
        .stdout(predicate::str::contains("super-secret").not());
}

#[test]
#[serial]
fn test_provider_list_table_in_priority_order() {
    let dir = TempDir::new().unwrap();
    add_provider(&dir, "second", &["--priority", "2"]);
    add_provider(&dir, "first", &["--priority", "-1"]);

    let output = searchgate(&dir)
        .args(["provider", "list"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let text = String::from_utf8(output).unwrap();
    let first = text.find("first").unwrap();
    let second = text.find("second").unwrap();
    assert!(first < second, "unexpected order:\n{}", text);
}

#[test]
#[serial]
fn test_provider_list_active_only() {
    let dir = TempDir::new().unwrap();
    add_provider(&dir, "on", &[]);
    add_provider(&dir, "off", &["--inactive"]);

    searchgate(&dir)
        .args(["provider", "list", "--active", "--format", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"on\""))
        .stdout(predicate::str::contains("\"off\"").not());
}

#[test]
#[serial]
fn test_provider_add_rejects_bad_threshold() {
    let dir = TempDir::new().unwrap();
    searchgate(&dir)
        .args([
            "provider",
            "add",
            "--id",
            "p",
            "--base-url",
            "https://search.example",
            "--per-hour",
            "lots",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Validation error"));
}

#[test]
#[serial]
fn test_provider_add_rejects_bad_url() {
    let dir = TempDir::new().unwrap();
    searchgate(&dir)
        .args(["provider", "add", "--id", "p", "--base-url", "not a url"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Validation error"));
}

#[test]
#[serial]
fn test_provider_show_and_remove() {
    let dir = TempDir::new().unwrap();
    add_provider(&dir, "brave", &["--name", "Brave Search"]);

    searchgate(&dir)
        .args(["provider", "show", "brave", "--format", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"display_name\": \"Brave Search\""));

    searchgate(&dir)
        .args(["provider", "remove", "brave"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Removed provider brave"));

    searchgate(&dir)
        .args(["provider", "show", "brave"])
        .assert()
        .failure();
}

#[test]
#[serial]
fn test_provider_remove_unknown_fails() {
    let dir = TempDir::new().unwrap();
    searchgate(&dir)
        .args(["provider", "remove", "ghost"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Provider not found: ghost"));
}

#[test]
#[serial]
fn test_quiet_suppresses_success_message() {
    let dir = TempDir::new().unwrap();
    searchgate(&dir)
        .args(["--quiet", "provider", "add", "--id", "p", "--base-url", "https://search.example"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
}

// =============================================================================
// Argument Validation Tests
// =============================================================================

#[test]
#[serial]
fn test_invalid_command() {
    let dir = TempDir::new().unwrap();
    searchgate(&dir).arg("frobnicate").assert().failure();
}

#[test]
#[serial]
fn test_invalid_format_rejected() {
    let dir = TempDir::new().unwrap();
    searchgate(&dir)
        .args(["provider", "list", "--format", "yaml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid value 'yaml'"));
}
