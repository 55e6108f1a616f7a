//! Basic CLI E2E tests.
//!
//! Tests invoke CLI commands via cargo run and verify outputs. Each
//! test points XDG dirs at its own scratch directory so nothing leaks
//! into the user's real data.

use chrono::Datelike;
use std::path::PathBuf;
use std::process::Command;

fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("flightbook-cli-{}-{}", name, std::process::id()));
    std::fs::create_dir_all(&dir).expect("Failed to create scratch dir");
    dir
}

/// Run a CLI command and return (stdout, stderr, exit code).
fn run_cli(home: &PathBuf, args: &[&str]) -> (String, String, i32) {
    let output = Command::new("cargo")
        .args(["run", "-p", "flightbook-cli", "--quiet", "--"])
        .args(args)
        .env("XDG_DATA_HOME", home)
        .env("XDG_CONFIG_HOME", home)
        .env("HOME", home)
        .output()
        .expect("Failed to execute CLI command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);

    (stdout, stderr, code)
}

#[test]
fn course_add_and_list() {
    let home = scratch_dir("course");
    let (_, stderr, code) = run_cli(
        &home,
        &[
            "course", "add", "1", "PPL", "--posting-wait", "7", "--on-hold", "30",
        ],
    );
    assert_eq!(code, 0, "course add failed: {stderr}");

    let (stdout, _, code) = run_cli(&home, &["course", "list"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("PPL"));
    assert!(stdout.contains("onhold=30"));
}

#[test]
fn sweep_runs_on_empty_database() {
    let home = scratch_dir("sweep");
    let (stdout, stderr, code) = run_cli(&home, &["sweep", "run"]);
    assert_eq!(code, 0, "sweep failed: {stderr}");
    assert!(stdout.contains("\"courses\": 0"));
}

#[test]
fn post_and_book_flow() {
    let home = scratch_dir("flow");
    run_cli(&home, &["course", "add", "1", "PPL"]);
    run_cli(&home, &["course", "enrol", "--course-id", "1", "7", "Student Seven"]);

    let (stdout, stderr, code) = run_cli(
        &home,
        &[
            "slot",
            "post",
            "--course-id",
            "1",
            "--student-id",
            "7",
            "--lookahead",
            "0",
            "--window",
            "2099-06-04T09:00:00Z/2099-06-04T10:00:00Z",
        ],
    );
    assert_eq!(code, 0, "slot post failed: {stderr}");
    assert!(stdout.contains("Posted 1 slot(s)"));

    let iso = chrono::NaiveDate::from_ymd_opt(2099, 6, 4)
        .unwrap()
        .iso_week();
    let (stdout, _, code) = run_cli(
        &home,
        &[
            "slot",
            "list",
            "--course-id",
            "1",
            "--student-id",
            "7",
            "--year",
            &iso.year().to_string(),
            "--week",
            &iso.week().to_string(),
        ],
    );
    assert_eq!(code, 0);
    let slots: serde_json::Value = serde_json::from_str(&stdout).expect("slot list is JSON");
    let slot_id = slots[0]["id"].as_i64().expect("slot id");

    let (stdout, stderr, code) = run_cli(
        &home,
        &[
            "booking",
            "create",
            "--instructor-id",
            "5",
            "--student-id",
            "7",
            "--exercise-id",
            "42",
            "--slot-id",
            &slot_id.to_string(),
        ],
    );
    assert_eq!(code, 0, "booking create failed: {stderr}");
    assert!(stdout.contains("Booking created:"));
}
