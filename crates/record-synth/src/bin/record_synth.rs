//! Batch generator for synthetic records.
//!
//! This binary delegates to `record_synth::generate_cli` for parsing and the
//! generation run, keeping the CLI behaviour testable without spawning a
//! process. Diagnostics go to stderr and are filtered with `RUST_LOG`.

use std::env;
use std::io::{self, Write};
use std::process::ExitCode;

use record_synth::generate_cli::{
    CliError, ParseOutcome, parse_args, run_generation, summary_message,
};
use tracing::warn;
use tracing_subscriber::{EnvFilter, fmt};

fn main() -> ExitCode {
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            write_stderr(&err.to_string());
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), CliError> {
    match parse_args(env::args().skip(1))? {
        ParseOutcome::Help => {
            print_usage(io::stdout().lock());
            Ok(())
        }
        ParseOutcome::Options(options) => {
            let summary = run_generation(&options, io::stdout().lock())?;
            write_stderr(&summary_message(&summary));
            Ok(())
        }
    }
}

fn print_usage(mut out: impl Write) {
    let usage = concat!(
        "Usage: record-synth --plan <path> [options]\n",
        "\n",
        "Options:\n",
        "  --plan <path>        Path to the composition plan JSON file\n",
        "  --count <n>          Number of records to generate (defaults to 10)\n",
        "  --seed <seed>        RNG seed (defaults to the plan's seed)\n",
        "  --output <path>      Write JSON lines to a file instead of stdout\n",
        "  -h, --help           Print this help output\n",
    );
    if let Err(err) = out.write_all(usage.as_bytes()) {
        drop(err);
    }
}

fn write_stderr(message: &str) {
    if let Err(err) = writeln!(io::stderr().lock(), "{message}") {
        drop(err);
    }
}
