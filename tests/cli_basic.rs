//! Integration tests for basic CLI behavior.
//!
//! Tests that the binary exists, accepts standard flags, each subcommand
//! responds to `--help`, and the offline subcommands work end to end.

#![allow(deprecated)] // cargo_bin deprecation: replacement not yet stable

use assert_cmd::Command;
use predicates::prelude::*;

/// Helper: get a Command for the `cinehub` binary that never reads the
/// user's real config file.
fn cinehub(dir: &tempfile::TempDir) -> Command {
    let mut cmd = Command::cargo_bin("cinehub").expect("binary 'cinehub' should be built");
    cmd.arg("--config")
        .arg(dir.path().join("absent.toml"))
        .arg("--providers-dir")
        .arg(dir.path());
    cmd
}

fn bare() -> Command {
    Command::cargo_bin("cinehub").expect("binary 'cinehub' should be built")
}

// ─── Top-level flags ─────────────────────────────────────────────────────────

#[test]
fn help_flag_shows_usage() {
    bare()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage: cinehub"))
        .stdout(predicate::str::contains("serve"))
        .stdout(predicate::str::contains("providers"))
        .stdout(predicate::str::contains("resolve"));
}

#[test]
fn version_flag_shows_semver() {
    bare()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::is_match(r"^cinehub \d+\.\d+\.\d+\n$").unwrap());
}

#[test]
fn no_args_shows_error_and_usage() {
    bare()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage: cinehub"));
}

#[test]
fn invalid_subcommand_fails() {
    bare()
        .arg("this-is-not-a-real-command")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unrecognized subcommand"));
}

// ─── Subcommand help ─────────────────────────────────────────────────────────

#[test]
fn serve_help() {
    bare()
        .args(["serve", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Run the HTTP API"))
        .stdout(predicate::str::contains("--bind"))
        .stdout(predicate::str::contains("--manifest-url"))
        .stdout(predicate::str::contains("--providers-dir"));
}

#[test]
fn providers_help() {
    bare()
        .args(["providers", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("provider manifest"))
        .stdout(predicate::str::contains("--all"))
        .stdout(predicate::str::contains("--json"));
}

#[test]
fn resolve_help() {
    bare()
        .args(["resolve", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("direct media URL"))
        .stdout(predicate::str::contains("<URL>"));
}

// ─── Argument validation ─────────────────────────────────────────────────────

#[test]
fn resolve_missing_url_fails() {
    bare()
        .arg("resolve")
        .assert()
        .failure()
        .stderr(predicate::str::contains("<URL>"));
}

#[test]
fn serve_rejects_bad_bind_address() {
    bare()
        .args(["serve", "--bind", "not-an-address"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid value"));
}

// ─── Offline behavior ────────────────────────────────────────────────────────

#[test]
fn providers_reads_local_manifest() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("manifest.json"),
        r#"[{"value":"mod","display_name":"Mod","type":"global","version":"1.0.0"},
            {"value":"old","display_name":"Old","type":"global","version":"0.1.0","disabled":true}]"#,
    )
    .unwrap();

    cinehub(&dir)
        .args(["providers", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"id\": \"mod\""))
        .stdout(predicate::str::contains("\"old\"").not());

    cinehub(&dir)
        .args(["providers", "--all"])
        .assert()
        .success()
        .stdout(predicate::str::contains("2 providers"))
        .stdout(predicate::str::contains("local fallback"));
}

#[test]
fn providers_without_manifest_fails() {
    let dir = tempfile::tempdir().unwrap();
    cinehub(&dir)
        .arg("providers")
        .assert()
        .failure()
        .stderr(predicate::str::contains("manifest unavailable"));
}

#[test]
fn resolve_playable_link_needs_no_extraction() {
    let dir = tempfile::tempdir().unwrap();
    cinehub(&dir)
        .args(["resolve", "https://cdn.example.com/video.mp4"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Directly playable"))
        .stdout(predicate::str::contains("https://cdn.example.com/video.mp4"));
}

#[test]
fn invalid_config_file_fails() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("config.toml");
    std::fs::write(&config, "bind = [").unwrap();
    bare()
        .arg("--config")
        .arg(&config)
        .args(["resolve", "https://cdn.example.com/video.mp4"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid TOML"));
}
