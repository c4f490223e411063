//! Error types for the batch generation CLI.

use camino::Utf8PathBuf;
use thiserror::Error;

use crate::error::{GenerationError, PlanError};

/// Errors surfaced by CLI parsing and the generation run.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CliError {
    /// Plan path was not supplied.
    #[error("missing required flag: --plan")]
    MissingPlanPath,
    /// A flag expected a value but none was provided.
    #[error("missing value for {flag}")]
    MissingValue {
        /// Flag that was missing its value.
        flag: &'static str,
    },
    /// An unsupported argument was supplied.
    #[error("unknown argument: {value}")]
    UnknownArgument {
        /// Argument value that was not recognised.
        value: String,
    },
    /// A numeric value failed to parse.
    #[error("invalid number for {flag}: '{value}' ({message})")]
    InvalidNumber {
        /// Flag associated with the invalid number.
        flag: &'static str,
        /// Raw value supplied for the flag.
        value: String,
        /// Parser error message.
        message: String,
    },
    /// The plan could not be loaded or built.
    #[error("plan error: {source}")]
    Plan {
        /// Underlying plan error.
        #[from]
        source: PlanError,
    },
    /// A record could not be generated.
    #[error("generation error: {source}")]
    Generation {
        /// Underlying generation error.
        #[from]
        source: GenerationError,
    },
    /// A record could not be serialised.
    #[error("failed to serialise record: {message}")]
    Serialize {
        /// Serialiser error message.
        message: String,
    },
    /// Output could not be written.
    #[error("failed to write '{path}': {message}")]
    WriteError {
        /// Destination that failed.
        path: Utf8PathBuf,
        /// Description of the I/O error.
        message: String,
    },
}
