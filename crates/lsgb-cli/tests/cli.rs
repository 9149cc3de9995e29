//! Integration tests for the lsgb binary surface.

use assert_cmd::Command;
use predicates::prelude::*;

#[test]
fn config_show_prints_defaults() {
    let mut cmd = Command::cargo_bin("lsgb").unwrap();
    cmd.arg("config")
        .arg("show")
        .assert()
        .success()
        .stdout(predicate::str::contains("orphan_lookahead"))
        .stdout(predicate::str::contains("stamp_blue_density"));
}

#[test]
fn config_init_writes_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("lsgb.json");

    let mut cmd = Command::cargo_bin("lsgb").unwrap();
    cmd.arg("config")
        .arg("init")
        .arg("--output")
        .arg(&path)
        .assert()
        .success();

    let content = std::fs::read_to_string(&path).unwrap();
    assert!(content.contains("min_text_length"));
}

#[test]
fn process_missing_input_fails() {
    let mut cmd = Command::cargo_bin("lsgb").unwrap();
    cmd.arg("process")
        .arg("does-not-exist.pdf")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Input file not found"));
}

#[test]
fn batch_empty_glob_fails() {
    let dir = tempfile::tempdir().unwrap();
    let pattern = dir.path().join("*.pdf");

    let mut cmd = Command::cargo_bin("lsgb").unwrap();
    cmd.arg("batch")
        .arg(pattern.to_string_lossy().to_string())
        .assert()
        .failure()
        .stderr(predicate::str::contains("No matching PDF files"));
}
