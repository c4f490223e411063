//! CLI support for batch record generation.
//!
//! This module provides parsing and run helpers for the `record-synth`
//! binary. The binary delegates to these functions so they can be exercised
//! in tests without spawning a subprocess.

mod error;

use std::fmt;
use std::io::{self, BufWriter, Write};

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::ambient_authority;
use cap_std::fs::Dir;
use tracing::info;

pub use self::error::CliError;
use crate::atomic_io::write_atomic;
use crate::composer::RecordComposer;
use crate::plan::CompositionPlan;

const DEFAULT_RECORD_COUNT: usize = 10;
const STDOUT_LABEL: &str = "<stdout>";

/// Parsed options for the generation CLI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    plan_path: Utf8PathBuf,
    count: usize,
    seed: Option<u64>,
    output: Option<Utf8PathBuf>,
}

impl Options {
    /// Returns the plan path supplied on the command line.
    ///
    /// # Example
    ///
    /// ```
    /// use record_synth::generate_cli::{ParseOutcome, parse_args};
    ///
    /// let args = vec!["--plan".to_owned(), "people.json".to_owned()];
    /// let ParseOutcome::Options(options) = parse_args(args.into_iter()).expect("parse") else {
    ///     panic!("expected options");
    /// };
    ///
    /// assert_eq!(options.plan_path(), "people.json");
    /// ```
    #[must_use]
    pub fn plan_path(&self) -> &Utf8Path {
        &self.plan_path
    }

    /// Returns the number of records to generate.
    #[must_use]
    pub const fn count(&self) -> usize {
        self.count
    }

    /// Returns the seed override, if any.
    #[must_use]
    pub const fn seed(&self) -> Option<u64> {
        self.seed
    }

    /// Returns the output file, or `None` for stdout.
    #[must_use]
    pub fn output(&self) -> Option<&Utf8Path> {
        self.output.as_deref()
    }
}

/// Outcome of parsing CLI arguments.
#[derive(Debug, Clone)]
pub enum ParseOutcome {
    /// Show help output and exit successfully.
    Help,
    /// Continue with the parsed options.
    Options(Options),
}

/// Result of a generation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary {
    /// Number of records written.
    pub records: usize,
    /// Seed the composer ran with.
    pub seed: u64,
    /// Malformed table rows skipped while loading the plan.
    pub skipped_rows: usize,
    /// Output file, or `None` when records went to stdout.
    pub output: Option<Utf8PathBuf>,
}

/// Parses CLI arguments into generation options.
///
/// # Errors
///
/// Returns [`CliError`] when required flags are missing or values cannot be
/// parsed.
///
/// # Example
///
/// ```
/// use record_synth::generate_cli::{ParseOutcome, parse_args};
///
/// let args = vec![
///     "--plan".to_owned(),
///     "people.json".to_owned(),
///     "--count".to_owned(),
///     "25".to_owned(),
/// ];
///
/// let outcome = parse_args(args.into_iter()).expect("parse args");
/// assert!(matches!(outcome, ParseOutcome::Options(_)));
/// ```
pub fn parse_args<I>(mut args: I) -> Result<ParseOutcome, CliError>
where
    I: Iterator<Item = String>,
{
    let mut plan_path: Option<Utf8PathBuf> = None;
    let mut count: Option<usize> = None;
    let mut seed: Option<u64> = None;
    let mut output: Option<Utf8PathBuf> = None;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-h" | "--help" => return Ok(ParseOutcome::Help),
            "--plan" => {
                let value = next_value(&mut args, "--plan")?;
                plan_path = Some(Utf8PathBuf::from(value));
            }
            "--count" => {
                let value = next_value(&mut args, "--count")?;
                count = Some(parse_number(&value, "--count")?);
            }
            "--seed" => {
                let value = next_value(&mut args, "--seed")?;
                seed = Some(parse_number(&value, "--seed")?);
            }
            "--output" => {
                let value = next_value(&mut args, "--output")?;
                output = Some(Utf8PathBuf::from(value));
            }
            _ => return Err(CliError::UnknownArgument { value: arg }),
        }
    }

    let resolved_plan_path = plan_path.ok_or(CliError::MissingPlanPath)?;
    Ok(ParseOutcome::Options(Options {
        plan_path: resolved_plan_path,
        count: count.unwrap_or(DEFAULT_RECORD_COUNT),
        seed,
        output,
    }))
}

/// Loads the plan, generates the requested records, and streams them as
/// JSON lines to the output file or to `stdout`.
///
/// Table paths in the plan are resolved relative to the plan's directory.
/// Records are written as they are generated, so memory use does not grow
/// with the record count. File output replaces the target only once every
/// record has been written; records already streamed to `stdout` stay there
/// when a later record fails.
///
/// # Errors
///
/// Returns [`CliError`] when the plan cannot be loaded or built, a record
/// fails to generate, or the output cannot be written.
pub fn run_generation<W: Write>(options: &Options, stdout: W) -> Result<Summary, CliError> {
    let loaded = CompositionPlan::from_file(&options.plan_path)?;
    let seed = options.seed.unwrap_or_else(|| loaded.seed());
    let base_dir = options
        .plan_path
        .parent()
        .unwrap_or_else(|| Utf8Path::new("."));
    let mut built = loaded.with_seed(seed).build(base_dir)?;
    let composer = built.composer_mut();

    let records = match &options.output {
        Some(path) => {
            write_output_file(path, |out| {
                write_records(composer, options.count, out, path)?;
                Ok(())
            })?;
            options.count
        }
        None => {
            let label = Utf8Path::new(STDOUT_LABEL);
            let mut out = BufWriter::new(stdout);
            let written = write_records(composer, options.count, &mut out, label)?;
            out.flush().map_err(|err| write_error(label, &err))?;
            written
        }
    };
    info!(records, seed, "wrote generated records");

    Ok(Summary {
        records,
        seed,
        skipped_rows: built.skipped_rows(),
        output: options.output.clone(),
    })
}

/// Generates `count` records from `composer`, writing each as one line of
/// JSON to `out` as soon as it is produced.
///
/// `destination` names `out` in write errors. Returns the number of records
/// written.
///
/// # Errors
///
/// Returns [`CliError::Generation`] for the first record that fails,
/// [`CliError::Serialize`] if a record cannot be serialised, and
/// [`CliError::WriteError`] if `out` rejects the bytes.
///
/// # Example
///
/// ```
/// use camino::Utf8Path;
/// use record_synth::generate_cli::write_records;
/// use record_synth::{Element, RecordComposer, Value};
///
/// let mut composer = RecordComposer::new(1);
/// composer
///     .add_field("gender", Element::constant(Value::from("F")))
///     .expect("unique label");
///
/// let mut out = Vec::new();
/// let written = write_records(&mut composer, 2, &mut out, Utf8Path::new("memory"))
///     .expect("write");
///
/// assert_eq!(written, 2);
/// assert_eq!(out, b"{\"gender\":\"F\"}\n{\"gender\":\"F\"}\n");
/// ```
pub fn write_records<W: Write + ?Sized>(
    composer: &mut RecordComposer,
    count: usize,
    out: &mut W,
    destination: &Utf8Path,
) -> Result<usize, CliError> {
    for _ in 0..count {
        let record = composer.generate()?;
        serde_json::to_writer(&mut *out, &record).map_err(|err| CliError::Serialize {
            message: err.to_string(),
        })?;
        out.write_all(b"\n")
            .map_err(|err| write_error(destination, &err))?;
    }
    Ok(count)
}

/// Formats the summary the CLI reports after a run.
///
/// # Example
///
/// ```
/// use record_synth::generate_cli::{Summary, summary_message};
///
/// let summary = Summary {
///     records: 5,
///     seed: 7,
///     skipped_rows: 2,
///     output: None,
/// };
///
/// assert!(summary_message(&summary).contains("skipped 2 malformed table rows"));
/// ```
#[must_use]
pub fn summary_message(summary: &Summary) -> String {
    let destination = summary
        .output
        .as_ref()
        .map_or(STDOUT_LABEL, |path| path.as_str());
    format!(
        "Generated {} records (seed={}) to {}; skipped {} malformed table rows",
        summary.records, summary.seed, destination, summary.skipped_rows
    )
}

fn write_output_file<F>(path: &Utf8Path, fill: F) -> Result<(), CliError>
where
    F: FnOnce(&mut dyn Write) -> Result<(), CliError>,
{
    let file_name = path.file_name().ok_or_else(|| CliError::WriteError {
        path: path.to_path_buf(),
        message: "output path must name a file".to_owned(),
    })?;
    let parent = path
        .parent()
        .filter(|parent| !parent.as_str().is_empty())
        .unwrap_or_else(|| Utf8Path::new("."));
    let dir = Dir::open_ambient_dir(parent, ambient_authority())
        .map_err(|err| write_error(path, &err))?;

    write_atomic(&dir, Utf8Path::new(file_name), path, fill)
}

fn write_error(path: &Utf8Path, err: &io::Error) -> CliError {
    CliError::WriteError {
        path: path.to_path_buf(),
        message: err.to_string(),
    }
}

fn next_value<I>(args: &mut I, flag: &'static str) -> Result<String, CliError>
where
    I: Iterator<Item = String>,
{
    args.next().ok_or(CliError::MissingValue { flag })
}

fn parse_number<T>(value: &str, flag: &'static str) -> Result<T, CliError>
where
    T: std::str::FromStr,
    T::Err: fmt::Display,
{
    value.parse::<T>().map_err(|err| CliError::InvalidNumber {
        flag,
        value: value.to_owned(),
        message: err.to_string(),
    })
}

#[cfg(test)]
mod tests;
