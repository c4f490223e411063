//! Weighted reference tables and label sampling.
//!
//! A [`WeightedTable`] is loaded once from a line-oriented text source and is
//! immutable afterwards, so a single table can be shared read-only (through an
//! `Arc`) by any number of generators. Each row contributes a label and a
//! weight; weights are either relative (summed while loading) or already
//! cumulative (validated to be non-decreasing).
//!
//! Sampling scales a uniform draw in `[0, 1)` by the total weight and selects
//! the first entry whose cumulative weight is strictly greater than the scaled
//! draw, so entry `i` owns the half-open interval
//! `[cumulative[i - 1], cumulative[i])`.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::Path;

use flate2::bufread::MultiGzDecoder;
use rand::Rng;
use tracing::{debug, warn};

use crate::error::{SampleError, TableError};

/// Leading bytes of a gzip stream.
const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// How a table row is split into columns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Delimiter {
    /// Split on runs of whitespace.
    #[default]
    Whitespace,
    /// Split on a single character; surrounding whitespace is trimmed from
    /// each column.
    Char(char),
}

/// Parsing options for a weighted table source.
///
/// # Example
///
/// ```
/// use record_synth::TableOptions;
///
/// let options = TableOptions::default().with_delimiter('|').cumulative();
/// assert!(options.cumulative);
/// assert_eq!(options.weight_column, 1);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableOptions {
    /// Column separator.
    pub delimiter: Delimiter,
    /// Zero-based index of the label column.
    pub label_column: usize,
    /// Zero-based index of the weight column.
    pub weight_column: usize,
    /// Treat weights as an already-cumulative distribution.
    pub cumulative: bool,
    /// Ignore the first line of the source.
    pub skip_header: bool,
    /// Exact number of columns a row must carry, when set.
    pub expected_columns: Option<usize>,
}

impl Default for TableOptions {
    fn default() -> Self {
        Self {
            delimiter: Delimiter::Whitespace,
            label_column: 0,
            weight_column: 1,
            cumulative: false,
            skip_header: false,
            expected_columns: None,
        }
    }
}

impl TableOptions {
    /// Splits rows on `delimiter` instead of whitespace.
    #[must_use]
    pub const fn with_delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = Delimiter::Char(delimiter);
        self
    }

    /// Selects the label and weight columns.
    #[must_use]
    pub const fn with_columns(mut self, label_column: usize, weight_column: usize) -> Self {
        self.label_column = label_column;
        self.weight_column = weight_column;
        self
    }

    /// Reads weights as a cumulative distribution.
    #[must_use]
    pub const fn cumulative(mut self) -> Self {
        self.cumulative = true;
        self
    }

    /// Skips the first line of the source.
    #[must_use]
    pub const fn skip_header(mut self) -> Self {
        self.skip_header = true;
        self
    }

    /// Requires every row to carry exactly `columns` columns.
    #[must_use]
    pub const fn with_expected_columns(mut self, columns: usize) -> Self {
        self.expected_columns = Some(columns);
        self
    }

    fn validate(&self) -> Result<(), TableError> {
        if self.label_column == self.weight_column {
            return Err(TableError::InvalidOptions {
                message: format!(
                    "label and weight both read column {}",
                    self.label_column
                ),
            });
        }
        let widest = self.label_column.max(self.weight_column);
        match self.expected_columns {
            Some(columns) if columns <= widest => Err(TableError::InvalidOptions {
                message: format!("expected {columns} columns but column {widest} is selected"),
            }),
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Entry {
    label: Option<String>,
    cumulative: f64,
}

/// An immutable table of labels with cumulative weights.
///
/// # Example
///
/// ```
/// use record_synth::WeightedTable;
///
/// let table = WeightedTable::from_entries([("JOHN", 38.0), ("MARY", 26.0), ("ROBERT", 31.0)], false)
///     .expect("valid table");
///
/// assert_eq!(table.total_weight(), 95.0);
/// assert_eq!(table.sample(0.0), Ok(Some("JOHN")));
/// assert_eq!(table.sample(0.41), Ok(Some("MARY")));
/// assert_eq!(table.sample(0.9999), Ok(Some("ROBERT")));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct WeightedTable {
    entries: Vec<Entry>,
    skipped_rows: usize,
}

impl WeightedTable {
    /// Loads a table from a file, decompressing gzip sources transparently.
    ///
    /// # Errors
    ///
    /// Returns [`TableError`] if the file cannot be read, the options are
    /// inconsistent, or a cumulative table is not sorted.
    pub fn from_file(path: &Path, options: &TableOptions) -> Result<Self, TableError> {
        let origin = path.display().to_string();
        let file = File::open(path).map_err(|err| io_error(&origin, &err))?;
        Self::from_reader(file, &origin, options)
    }

    /// Loads a table from any byte source.
    ///
    /// `origin` names the source in errors and log output. Gzip streams are
    /// recognised by their magic bytes.
    ///
    /// # Errors
    ///
    /// Returns [`TableError`] if the source cannot be read, the options are
    /// inconsistent, or a cumulative table is not sorted.
    pub fn from_reader<R: Read>(
        reader: R,
        origin: &str,
        options: &TableOptions,
    ) -> Result<Self, TableError> {
        options.validate()?;
        let mut buffered = BufReader::new(reader);
        let is_gzip = buffered
            .fill_buf()
            .map_err(|err| io_error(origin, &err))?
            .starts_with(&GZIP_MAGIC);

        let table = if is_gzip {
            parse_rows(
                BufReader::new(MultiGzDecoder::new(buffered)),
                origin,
                options,
            )?
        } else {
            parse_rows(buffered, origin, options)?
        };

        if table.skipped_rows > 0 {
            warn!(
                origin,
                skipped_rows = table.skipped_rows,
                "skipped malformed table rows"
            );
        }
        debug!(
            origin,
            entries = table.entries.len(),
            total_weight = table.total_weight(),
            "loaded weighted table"
        );
        Ok(table)
    }

    /// Builds a table from in-memory `(label, weight)` pairs.
    ///
    /// Empty labels become the absent label. Weights that would be skipped
    /// when loading from text (negative relative weights, non-finite values)
    /// are skipped here too and counted in [`Self::skipped_rows`].
    ///
    /// # Errors
    ///
    /// Returns [`TableError::NonMonotonic`] if `cumulative` is set and the
    /// weights decrease.
    pub fn from_entries<I, S>(entries: I, cumulative: bool) -> Result<Self, TableError>
    where
        I: IntoIterator<Item = (S, f64)>,
        S: AsRef<str>,
    {
        let mut builder = TableBuilder::new(cumulative);
        for (index, (label, weight)) in entries.into_iter().enumerate() {
            let line = index + 1;
            match check_weight(weight, cumulative) {
                Ok(()) => builder.push(line, label_from(label.as_ref()), weight)?,
                Err(reason) => builder.skip("<entries>", line, reason),
            }
        }
        Ok(builder.finish())
    }

    /// Draws the label owning the uniform draw `u`.
    ///
    /// Returns `Ok(None)` when the selected entry has an absent label.
    ///
    /// # Errors
    ///
    /// Returns [`SampleError::InvalidDraw`] if `u` is not in `[0, 1)` and
    /// [`SampleError::EmptyTable`] if no entry is reachable.
    pub fn sample(&self, u: f64) -> Result<Option<&str>, SampleError> {
        if !(0.0..1.0).contains(&u) {
            return Err(SampleError::InvalidDraw { draw: u });
        }
        let total = self.total_weight();
        if total <= 0.0 {
            return Err(SampleError::EmptyTable);
        }

        let scaled = u * total;
        let mut index = self
            .entries
            .partition_point(|entry| entry.cumulative <= scaled);
        if index >= self.entries.len() {
            // Rounding pushed the draw onto the upper bound; the entry that
            // reached the total owns it.
            index = self
                .entries
                .partition_point(|entry| entry.cumulative < total);
        }

        self.entries
            .get(index)
            .map(|entry| entry.label.as_deref())
            .ok_or(SampleError::EmptyTable)
    }

    /// Draws a label using a uniform draw taken from `rng`.
    ///
    /// # Errors
    ///
    /// Returns [`SampleError::EmptyTable`] if no entry is reachable.
    pub fn sample_with<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Option<&str>, SampleError> {
        self.sample(rng.random::<f64>())
    }

    /// Returns the number of loaded entries, reachable or not.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no entries were loaded.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the final cumulative weight, which bounds the sampling range.
    #[must_use]
    pub fn total_weight(&self) -> f64 {
        self.entries.last().map_or(0.0, |entry| entry.cumulative)
    }

    /// Returns the number of malformed rows skipped while loading.
    #[must_use]
    pub const fn skipped_rows(&self) -> usize {
        self.skipped_rows
    }

    /// Iterates over the labels in load order.
    pub fn labels(&self) -> impl Iterator<Item = Option<&str>> {
        self.entries.iter().map(|entry| entry.label.as_deref())
    }
}

/// Accumulates entries and skip counts while a table loads.
struct TableBuilder {
    cumulative: bool,
    running: f64,
    entries: Vec<Entry>,
    skipped_rows: usize,
}

impl TableBuilder {
    const fn new(cumulative: bool) -> Self {
        Self {
            cumulative,
            running: 0.0,
            entries: Vec::new(),
            skipped_rows: 0,
        }
    }

    fn push(&mut self, line: usize, label: Option<String>, weight: f64) -> Result<(), TableError> {
        if self.cumulative {
            if weight < self.running {
                return Err(TableError::NonMonotonic {
                    line,
                    previous: self.running,
                    found: weight,
                });
            }
            self.running = weight;
        } else {
            self.running += weight;
        }
        self.entries.push(Entry {
            label,
            cumulative: self.running,
        });
        Ok(())
    }

    fn skip(&mut self, origin: &str, line: usize, reason: &'static str) {
        debug!(origin, line, reason, "skipping table row");
        self.skipped_rows += 1;
    }

    fn finish(self) -> WeightedTable {
        WeightedTable {
            entries: self.entries,
            skipped_rows: self.skipped_rows,
        }
    }
}

fn parse_rows<R: BufRead>(
    reader: R,
    origin: &str,
    options: &TableOptions,
) -> Result<WeightedTable, TableError> {
    let mut builder = TableBuilder::new(options.cumulative);

    for (index, line) in reader.split(b'\n').enumerate() {
        let bytes = line.map_err(|err| io_error(origin, &err))?;
        if options.skip_header && index == 0 {
            continue;
        }
        let line_number = index + 1;
        let Ok(text) = std::str::from_utf8(&bytes) else {
            builder.skip(origin, line_number, "row is not valid UTF-8");
            continue;
        };
        let row = text.trim();
        if row.is_empty() {
            continue;
        }
        match parse_row(row, options) {
            Ok((label, weight)) => builder.push(line_number, label, weight)?,
            Err(reason) => builder.skip(origin, line_number, reason),
        }
    }

    Ok(builder.finish())
}

fn parse_row(row: &str, options: &TableOptions) -> Result<(Option<String>, f64), &'static str> {
    let fields: Vec<&str> = match options.delimiter {
        Delimiter::Whitespace => row.split_whitespace().collect(),
        Delimiter::Char(separator) => row.split(separator).map(str::trim).collect(),
    };

    if options
        .expected_columns
        .is_some_and(|columns| columns != fields.len())
    {
        return Err("unexpected column count");
    }
    let label = fields
        .get(options.label_column)
        .ok_or("missing label column")?;
    let raw_weight = fields
        .get(options.weight_column)
        .ok_or("missing weight column")?;
    let weight: f64 = raw_weight.parse().map_err(|_| "weight is not numeric")?;
    check_weight(weight, options.cumulative)?;

    Ok((label_from(label), weight))
}

fn check_weight(weight: f64, cumulative: bool) -> Result<(), &'static str> {
    if !weight.is_finite() {
        return Err("weight is not finite");
    }
    if !cumulative && weight < 0.0 {
        return Err("relative weight is negative");
    }
    Ok(())
}

fn label_from(raw: &str) -> Option<String> {
    (!raw.is_empty()).then(|| raw.to_owned())
}

fn io_error(origin: &str, err: &io::Error) -> TableError {
    TableError::IoError {
        origin: origin.to_owned(),
        message: err.to_string(),
    }
}
