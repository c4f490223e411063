//! Unit tests for the generation CLI helpers.

use std::sync::atomic::{AtomicUsize, Ordering};

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::{ambient_authority, fs::Dir};
use rstest::{fixture, rstest};

use super::*;
use crate::error::PlanError;

const NAMES_TABLE: &str = "JAMES 3.318\nJOHN 3.271\nnot-a-weight x\nROBERT 3.143\n";

const PLAN_JSON: &str = r#"{
    "version": 1,
    "seed": 2026,
    "tables": [{"name": "names", "path": "names.txt"}],
    "fields": [
        {"label": "id", "element": {"type": "uuid"}},
        {"label": "name", "element": {"type": "table", "table": "names"}}
    ]
}"#;

struct PlanFixture {
    dir: Utf8PathBuf,
}

impl PlanFixture {
    fn plan_path(&self) -> Utf8PathBuf {
        self.dir.join("plan.json")
    }

    fn options(&self) -> Options {
        Options {
            plan_path: self.plan_path(),
            count: 4,
            seed: None,
            output: None,
        }
    }

    fn read(&self, file_name: &str) -> String {
        let dir = Dir::open_ambient_dir(&self.dir, ambient_authority()).expect("open plan dir");
        dir.read_to_string(file_name).expect("read output")
    }
}

impl Drop for PlanFixture {
    fn drop(&mut self) {
        let root = Dir::open_ambient_dir(".", ambient_authority()).expect("open workspace dir");
        drop(root.remove_dir_all(&self.dir));
    }
}

#[fixture]
fn plan_fixture() -> PlanFixture {
    let dir = unique_temp_dir();
    let handle = Dir::open_ambient_dir(&dir, ambient_authority()).expect("open plan dir");
    handle.write("plan.json", PLAN_JSON).expect("write plan");
    handle.write("names.txt", NAMES_TABLE).expect("write table");
    PlanFixture { dir }
}

fn unique_temp_dir() -> Utf8PathBuf {
    static TEMP_COUNTER: AtomicUsize = AtomicUsize::new(0);
    let counter = TEMP_COUNTER.fetch_add(1, Ordering::Relaxed);
    let process_id = std::process::id();
    let dir = Utf8PathBuf::from("target")
        .join("record-synth-tests")
        .join(format!("generate-cli-{process_id}-{counter}"));
    let root = Dir::open_ambient_dir(".", ambient_authority()).expect("open workspace dir");
    root.create_dir_all(&dir).expect("create temp dir");
    dir
}

#[test]
fn parse_args_returns_help_for_help_flag() {
    let args = vec!["-h".to_owned()];

    let outcome = parse_args(args.into_iter()).expect("parse args");

    assert!(matches!(outcome, ParseOutcome::Help));
}

#[test]
fn parse_args_requires_plan_path() {
    let args = vec!["--count".to_owned(), "3".to_owned()];

    let err = parse_args(args.into_iter()).expect_err("expected error");

    assert_eq!(err, CliError::MissingPlanPath);
}

#[rstest]
#[case("--plan")]
#[case("--count")]
#[case("--seed")]
#[case("--output")]
fn parse_args_reports_missing_value(#[case] flag: &'static str) {
    let args = vec![flag.to_owned()];

    let err = parse_args(args.into_iter()).expect_err("expected error");

    assert_eq!(err, CliError::MissingValue { flag });
}

#[test]
fn parse_args_reports_unknown_arguments() {
    let args = vec![
        "--plan".to_owned(),
        "plan.json".to_owned(),
        "--verbose".to_owned(),
    ];

    let err = parse_args(args.into_iter()).expect_err("expected error");

    assert_eq!(
        err,
        CliError::UnknownArgument {
            value: "--verbose".to_owned(),
        }
    );
}

#[rstest]
#[case("--count", "-1")]
#[case("--seed", "twelve")]
fn parse_args_reports_invalid_numbers(#[case] flag: &'static str, #[case] raw: &str) {
    let args = vec![
        "--plan".to_owned(),
        "plan.json".to_owned(),
        flag.to_owned(),
        raw.to_owned(),
    ];

    let err = parse_args(args.into_iter()).expect_err("expected error");

    let CliError::InvalidNumber {
        flag: reported,
        value,
        ..
    } = err
    else {
        panic!("expected invalid number error");
    };
    assert_eq!(reported, flag);
    assert_eq!(value, raw);
}

#[test]
fn parse_args_parses_full_options() {
    let args = vec![
        "--plan".to_owned(),
        "plans/people.json".to_owned(),
        "--count".to_owned(),
        "50".to_owned(),
        "--seed".to_owned(),
        "7".to_owned(),
        "--output".to_owned(),
        "out/people.jsonl".to_owned(),
    ];

    let ParseOutcome::Options(options) = parse_args(args.into_iter()).expect("parse args") else {
        panic!("expected options");
    };

    assert_eq!(options.plan_path(), "plans/people.json");
    assert_eq!(options.count(), 50);
    assert_eq!(options.seed(), Some(7));
    assert_eq!(options.output(), Some(Utf8Path::new("out/people.jsonl")));
}

#[test]
fn parse_args_defaults_count() {
    let args = vec!["--plan".to_owned(), "plan.json".to_owned()];

    let ParseOutcome::Options(options) = parse_args(args.into_iter()).expect("parse args") else {
        panic!("expected options");
    };

    assert_eq!(options.count(), DEFAULT_RECORD_COUNT);
    assert_eq!(options.output(), None);
}

#[rstest]
fn run_generation_writes_json_lines_to_stdout(plan_fixture: PlanFixture) {
    let mut stdout = Vec::new();

    let summary = run_generation(&plan_fixture.options(), &mut stdout).expect("run");

    let text = String::from_utf8(stdout).expect("utf8 output");
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 4);
    for line in lines {
        let parsed: serde_json::Value = serde_json::from_str(line).expect("json line");
        let keys: Vec<&str> = parsed
            .as_object()
            .expect("object")
            .keys()
            .map(String::as_str)
            .collect();
        assert_eq!(keys, ["id", "name"]);
    }
    assert_eq!(
        summary,
        Summary {
            records: 4,
            seed: 2026,
            skipped_rows: 1,
            output: None,
        }
    );
}

#[rstest]
fn run_generation_is_reproducible(plan_fixture: PlanFixture) {
    let mut first = Vec::new();
    let mut second = Vec::new();

    run_generation(&plan_fixture.options(), &mut first).expect("first run");
    run_generation(&plan_fixture.options(), &mut second).expect("second run");

    assert_eq!(first, second);
}

#[rstest]
fn seed_override_changes_output(plan_fixture: PlanFixture) {
    let mut planned = Vec::new();
    let mut overridden = Vec::new();
    let options = Options {
        seed: Some(1),
        ..plan_fixture.options()
    };

    run_generation(&plan_fixture.options(), &mut planned).expect("planned run");
    let summary = run_generation(&options, &mut overridden).expect("override run");

    assert_eq!(summary.seed, 1);
    assert_ne!(planned, overridden);
}

#[rstest]
fn run_generation_writes_output_file(plan_fixture: PlanFixture) {
    let output = plan_fixture.dir.join("people.jsonl");
    let options = Options {
        output: Some(output.clone()),
        ..plan_fixture.options()
    };
    let mut stdout = Vec::new();

    let summary = run_generation(&options, &mut stdout).expect("run");

    assert!(stdout.is_empty());
    assert_eq!(summary.output, Some(output));
    assert_eq!(plan_fixture.read("people.jsonl").lines().count(), 4);
}

#[rstest]
fn failed_generation_leaves_no_output_file(plan_fixture: PlanFixture) {
    let broken_plan = r#"{
        "version": 1,
        "tables": [{"name": "names", "path": "names.txt"}],
        "fields": [
            {"label": "name", "element": {
                "type": "keyedTable",
                "selector": "/gender",
                "tables": {"male": "names"}
            }}
        ]
    }"#;
    let dir = Dir::open_ambient_dir(&plan_fixture.dir, ambient_authority()).expect("open plan dir");
    dir.write("plan.json", broken_plan).expect("overwrite plan");
    let options = Options {
        output: Some(plan_fixture.dir.join("people.jsonl")),
        ..plan_fixture.options()
    };

    let err = run_generation(&options, Vec::new()).expect_err("generation fails");

    assert!(matches!(err, CliError::Generation { .. }));
    let mut names: Vec<String> = dir
        .entries()
        .expect("list dir")
        .filter_map(Result::ok)
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    assert_eq!(names, ["names.txt", "plan.json"]);
}

#[test]
fn write_records_streams_one_line_per_record() {
    let mut composer = RecordComposer::new(9);
    composer
        .add_field("n", crate::element::Element::constant(crate::value::Value::from(1_i64)))
        .expect("label");
    let mut out = Vec::new();

    let written =
        write_records(&mut composer, 3, &mut out, Utf8Path::new("memory")).expect("write");

    assert_eq!(written, 3);
    assert_eq!(String::from_utf8(out).expect("utf8"), "{\"n\":1}\n".repeat(3));
}

#[test]
fn run_generation_reports_missing_plan() {
    let options = Options {
        plan_path: unique_temp_dir().join("absent.json"),
        count: 1,
        seed: None,
        output: None,
    };

    let err = run_generation(&options, Vec::new()).expect_err("expected error");

    assert!(matches!(
        err,
        CliError::Plan {
            source: PlanError::IoError { .. }
        }
    ));
}

#[test]
fn summary_message_formats_expected_output() {
    let summary = Summary {
        records: 12,
        seed: 2026,
        skipped_rows: 3,
        output: Some(Utf8PathBuf::from("people.jsonl")),
    };

    assert_eq!(
        summary_message(&summary),
        "Generated 12 records (seed=2026) to people.jsonl; skipped 3 malformed table rows"
    );
}
