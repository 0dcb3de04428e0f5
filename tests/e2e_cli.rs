//! CLI end-to-end tests
//!
//! Tests for the watchlist command-line interface.

use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use std::process::Command;
use tempfile::tempdir;

/// Get a command for the watchlist binary
#[allow(deprecated)]
fn watchlist_cmd() -> Command {
    let mut cmd = Command::cargo_bin("watchlist").unwrap();
    cmd.env_remove("OMDB_API_KEY").env_remove("RUST_LOG");
    cmd
}

fn write_config(dir: &Path, extra: &str) -> std::path::PathBuf {
    let db = dir.join("movies.db");
    let path = dir.join("watchlist.json");
    let json = format!(
        r#"{{"server": {{"db_path": {db:?}}}{extra}}}"#,
        db = db.to_string_lossy()
    );
    fs::write(&path, json).unwrap();
    path
}

#[test]
fn test_cli_no_args_shows_help() {
    watchlist_cmd()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn test_cli_version_command() {
    watchlist_cmd()
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains("watchlist"));
}

#[test]
fn test_cli_validate_defaults() {
    watchlist_cmd()
        .arg("validate")
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration is valid"))
        .stdout(predicate::str::contains("OMDb key: missing"));
}

#[test]
fn test_cli_validate_rejects_zero_workers() {
    let dir = tempdir().unwrap();
    let config = write_config(dir.path(), r#", "enrichment": {"workers": 0}"#);

    watchlist_cmd()
        .arg("--config")
        .arg(&config)
        .arg("validate")
        .assert()
        .failure()
        .stderr(predicate::str::contains("workers"));
}

#[test]
fn test_cli_import_csv() {
    let dir = tempdir().unwrap();
    let config = write_config(dir.path(), "");
    let csv = dir.path().join("list.csv");
    fs::write(
        &csv,
        "Position,Const,Created,Modified,Description,Title,URL,Title Type,IMDb Rating,Runtime (mins),Year\n\
         1,tt0133093,,,,The Matrix,,movie,8.7,136,1999\n\
         2,tt0062622,,,,2001: A Space Odyssey,,movie,8.3,149,1968\n",
    )
    .unwrap();

    watchlist_cmd()
        .arg("--config")
        .arg(&config)
        .arg("import-csv")
        .arg(&csv)
        .assert()
        .success()
        .stdout(predicate::str::contains("Imported 2 movies"));

    assert!(dir.path().join("movies.db").exists());
}

#[test]
fn test_cli_import_csv_missing_file() {
    let dir = tempdir().unwrap();
    let config = write_config(dir.path(), "");

    watchlist_cmd()
        .arg("--config")
        .arg(&config)
        .arg("import-csv")
        .arg(dir.path().join("absent.csv"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("does not exist"));
}

#[test]
fn test_cli_enrich_without_key_fails() {
    let dir = tempdir().unwrap();
    let config = write_config(dir.path(), "");

    watchlist_cmd()
        .arg("--config")
        .arg(&config)
        .arg("enrich")
        .assert()
        .failure()
        .stderr(predicate::str::contains("OMDb API key"));
}
