//! Error types for the record-synth crate.
//!
//! Errors are grouped by the phase in which they surface: loading reference
//! tables, drawing from them, assembling the element tree, producing a
//! record, and loading a composition plan. Each group is a `thiserror` enum
//! so callers can match on the exact failure.

use camino::Utf8PathBuf;
use thiserror::Error;

/// Errors raised while loading a weighted reference table.
///
/// Load-time errors are fatal for the table being built. Malformed rows are
/// not errors; they are skipped and counted instead.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TableError {
    /// The table source could not be opened or read.
    #[error("failed to read table source '{origin}': {message}")]
    IoError {
        /// Display name of the source (usually a file path).
        origin: String,
        /// Description of the I/O error.
        message: String,
    },

    /// A cumulative table carried a weight lower than the row before it.
    #[error(
        "cumulative weights must be non-decreasing: line {line} has {found} after {previous}"
    )]
    NonMonotonic {
        /// One-based line number of the offending row.
        line: usize,
        /// Running cumulative weight before the offending row.
        previous: f64,
        /// Weight found on the offending row.
        found: f64,
    },

    /// The column configuration cannot select a label and a weight.
    #[error("invalid table options: {message}")]
    InvalidOptions {
        /// Description of the misconfiguration.
        message: String,
    },
}

/// Errors raised when drawing a label from a weighted table.
///
/// Both variants indicate a programming or configuration mistake rather than
/// a data-dependent failure.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SampleError {
    /// The table holds no reachable entries.
    #[error("weighted table has no reachable entries")]
    EmptyTable,

    /// The uniform draw was outside `[0, 1)`.
    #[error("uniform draw {draw} is outside [0, 1)")]
    InvalidDraw {
        /// The rejected draw.
        draw: f64,
    },
}

/// Errors raised while assembling an element tree or count policy.
///
/// These are configuration errors: they surface when the tree is built and
/// are never recovered silently.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompositionError {
    /// A field label was registered twice on the same record.
    #[error("duplicate field label '{label}'")]
    DuplicateLabel {
        /// The repeated label.
        label: String,
    },

    /// A field label was empty.
    #[error("field labels must not be empty")]
    EmptyLabel,

    /// Children were added to an element that cannot hold them.
    #[error("{kind} elements cannot accept child fields")]
    NotAContainer {
        /// Kind of the element that rejected the child.
        kind: &'static str,
    },

    /// A uniform count range was empty or inverted.
    #[error("invalid count range: max ({max}) must be greater than min ({min})")]
    InvalidRange {
        /// Inclusive lower bound.
        min: u32,
        /// Exclusive upper bound.
        max: u32,
    },

    /// A normal count policy was given an unusable standard deviation.
    #[error("invalid standard deviation for normal count policy: {stdev}")]
    InvalidStdDev {
        /// The rejected standard deviation.
        stdev: f64,
    },

    /// A probability lay outside `[0, 1]`.
    #[error("probability {value} is outside [0, 1]")]
    InvalidProbability {
        /// The rejected probability.
        value: f64,
    },

    /// A keyed table leaf was configured without any tables.
    #[error("keyed table leaf requires at least one table")]
    NoKeyedTables,
}

/// Errors raised while producing a record.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GenerationError {
    /// A path addressed a key that has not been produced yet.
    #[error("path '{path}' not found: no value at '{segment}'")]
    PathNotFound {
        /// The full path being resolved.
        path: String,
        /// The segment at which traversal failed.
        segment: String,
    },

    /// A resolved value had a different shape than the caller required.
    #[error("path '{path}' resolved to a value that is not {expected}")]
    UnexpectedValue {
        /// The path that was resolved.
        path: String,
        /// Description of the expected value shape.
        expected: &'static str,
    },

    /// A weighted table could not be sampled.
    #[error("sampling failed: {0}")]
    Sample(#[from] SampleError),

    /// A domain producer reported its own failure.
    #[error("producer failed: {message}")]
    Producer {
        /// Description supplied by the producer.
        message: String,
    },
}

/// Errors raised while loading or building a composition plan.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlanError {
    /// The plan file could not be read.
    #[error("failed to read plan '{path}': {message}")]
    IoError {
        /// Path that was read.
        path: Utf8PathBuf,
        /// Description of the I/O error.
        message: String,
    },

    /// The plan JSON was malformed or missing required fields.
    #[error("failed to parse plan JSON: {message}")]
    ParseError {
        /// Description of the parse error.
        message: String,
    },

    /// The plan declares a version this crate cannot read.
    #[error("unsupported plan version {actual}, expected {expected}")]
    UnsupportedVersion {
        /// Supported version.
        expected: u32,
        /// Version found in the plan.
        actual: u32,
    },

    /// Two tables share a name.
    #[error("duplicate table name '{name}'")]
    DuplicateTable {
        /// The repeated name.
        name: String,
    },

    /// An element refers to a table the plan does not declare.
    #[error("unknown table '{name}'")]
    UnknownTable {
        /// The missing table name.
        name: String,
    },

    /// A declared table failed to load.
    #[error("failed to load table '{name}': {source}")]
    Table {
        /// Name of the table.
        name: String,
        /// Underlying load error.
        #[source]
        source: TableError,
    },

    /// The element tree described by the plan is invalid.
    #[error("invalid plan composition: {0}")]
    Composition(#[from] CompositionError),
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[test]
    fn table_error_io_formats_correctly() {
        let err = TableError::IoError {
            origin: "/data/male.dat.gz".to_owned(),
            message: "file not found".to_owned(),
        };
        assert_eq!(
            err.to_string(),
            "failed to read table source '/data/male.dat.gz': file not found"
        );
    }

    #[test]
    fn table_error_non_monotonic_formats_correctly() {
        let err = TableError::NonMonotonic {
            line: 3,
            previous: 2.5,
            found: 1.0,
        };
        assert_eq!(
            err.to_string(),
            "cumulative weights must be non-decreasing: line 3 has 1 after 2.5"
        );
    }

    #[rstest]
    #[case(SampleError::EmptyTable, "weighted table has no reachable entries")]
    #[case(SampleError::InvalidDraw { draw: 1.5 }, "uniform draw 1.5 is outside [0, 1)")]
    fn sample_errors_format_correctly(#[case] err: SampleError, #[case] expected: &str) {
        assert_eq!(err.to_string(), expected);
    }

    #[rstest]
    #[case(
        CompositionError::DuplicateLabel { label: "name".to_owned() },
        "duplicate field label 'name'"
    )]
    #[case(
        CompositionError::NotAContainer { kind: "leaf" },
        "leaf elements cannot accept child fields"
    )]
    #[case(
        CompositionError::InvalidRange { min: 5, max: 1 },
        "invalid count range: max (1) must be greater than min (5)"
    )]
    #[case(
        CompositionError::InvalidProbability { value: 1.5 },
        "probability 1.5 is outside [0, 1]"
    )]
    fn composition_errors_format_correctly(
        #[case] err: CompositionError,
        #[case] expected: &str,
    ) {
        assert_eq!(err.to_string(), expected);
    }

    #[test]
    fn generation_error_path_not_found_formats_correctly() {
        let err = GenerationError::PathNotFound {
            path: "/a/c".to_owned(),
            segment: "c".to_owned(),
        };
        assert_eq!(err.to_string(), "path '/a/c' not found: no value at 'c'");
    }

    #[rstest]
    #[case(
        PlanError::UnsupportedVersion { expected: 1, actual: 3 },
        "unsupported plan version 3, expected 1"
    )]
    #[case(
        PlanError::UnknownTable { name: "surnames".to_owned() },
        "unknown table 'surnames'"
    )]
    #[case(
        PlanError::Composition(CompositionError::EmptyLabel),
        "invalid plan composition: field labels must not be empty"
    )]
    fn plan_errors_format_correctly(#[case] err: PlanError, #[case] expected: &str) {
        assert_eq!(err.to_string(), expected);
    }

    #[test]
    fn plan_table_errors_name_the_table() {
        let err = PlanError::Table {
            name: "male".to_owned(),
            source: TableError::InvalidOptions {
                message: "label and weight columns overlap".to_owned(),
            },
        };
        assert_eq!(
            err.to_string(),
            "failed to load table 'male': invalid table options: label and weight columns overlap"
        );
    }

    #[test]
    fn generation_error_wraps_sample_errors() {
        let err = GenerationError::from(SampleError::EmptyTable);
        assert_eq!(
            err.to_string(),
            "sampling failed: weighted table has no reachable entries"
        );
    }
}
