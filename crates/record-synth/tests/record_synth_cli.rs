//! End-to-end tests for the `record-synth` binary.

#![expect(
    clippy::expect_used,
    reason = "test code uses expect for clear failure messages"
)]

use std::process::{Command, Output};

use camino::Utf8PathBuf;

fn demo_plan() -> Utf8PathBuf {
    Utf8PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("demos/person/plan.json")
}

fn run(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_record-synth"))
        .args(args)
        .output()
        .expect("spawn record-synth")
}

#[test]
fn help_prints_usage() {
    let output = run(&["--help"]);

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).expect("utf8 stdout");
    assert!(stdout.starts_with("Usage: record-synth --plan <path>"));
}

#[test]
fn generates_requested_number_of_json_lines() {
    let plan = demo_plan();

    let output = run(&["--plan", plan.as_str(), "--count", "7", "--seed", "11"]);

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8(output.stdout).expect("utf8 stdout");
    assert_eq!(stdout.lines().count(), 7);
    for line in stdout.lines() {
        let parsed: serde_json::Value = serde_json::from_str(line).expect("json line");
        assert!(parsed.get("gender").is_some_and(serde_json::Value::is_string));
    }
    let stderr = String::from_utf8(output.stderr).expect("utf8 stderr");
    assert!(stderr.contains("Generated 7 records (seed=11)"));
}

#[test]
fn repeated_runs_are_identical() {
    let plan = demo_plan();
    let args = ["--plan", plan.as_str(), "--count", "5"];

    let first = run(&args);
    let second = run(&args);

    assert!(first.status.success());
    assert_eq!(first.stdout, second.stdout);
}

#[test]
fn missing_plan_flag_fails() {
    let output = run(&["--count", "3"]);

    assert!(!output.status.success());
    let stderr = String::from_utf8(output.stderr).expect("utf8 stderr");
    assert!(stderr.contains("missing required flag: --plan"));
}

#[test]
fn unreadable_plan_fails_with_message() {
    let output = run(&["--plan", "does/not/exist.json"]);

    assert!(!output.status.success());
    assert!(output.stdout.is_empty());
    let stderr = String::from_utf8(output.stderr).expect("utf8 stderr");
    assert!(stderr.contains("failed to read plan 'does/not/exist.json'"));
}
