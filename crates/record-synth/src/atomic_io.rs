//! Atomic file writes for generated output.
//!
//! Output is streamed into a hidden temporary file in the target directory
//! and renamed over the target once complete, so a reader never observes a
//! half-written batch.

use std::io::{self, BufWriter, Write};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use camino::{Utf8Component, Utf8Path};
use cap_std::fs::{Dir, OpenOptions};

use crate::generate_cli::CliError;

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Streams `fill` into `file_name` inside `dir` via a temp file and rename.
///
/// The target is only replaced when `fill` succeeds; otherwise the temp file
/// is removed and the error returned. `display_path` is only used in error
/// messages.
///
/// # Errors
///
/// Returns [`CliError::WriteError`] if `file_name` is not a plain file name
/// or the file cannot be written, and any error raised by `fill`.
pub(crate) fn write_atomic<F>(
    dir: &Dir,
    file_name: &Utf8Path,
    display_path: &Utf8Path,
    fill: F,
) -> Result<(), CliError>
where
    F: FnOnce(&mut dyn Write) -> Result<(), CliError>,
{
    let write_error = |message: String| CliError::WriteError {
        path: display_path.to_path_buf(),
        message,
    };
    let mut components = file_name.components();
    let (Some(Utf8Component::Normal(name)), None) = (components.next(), components.next()) else {
        return Err(write_error("output path must name a file".to_owned()));
    };
    let counter = TEMP_COUNTER.fetch_add(1, Ordering::Relaxed);
    let suffix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| elapsed.as_nanos());
    let tmp_name = format!(".{name}.tmp.{}.{suffix}.{counter}", std::process::id());

    if let Err(err) = write_temp_file(dir, &tmp_name, display_path, fill) {
        drop(dir.remove_file(&tmp_name));
        return Err(err);
    }
    if let Err(err) = rename_into_place(dir, &tmp_name, name) {
        drop(dir.remove_file(&tmp_name));
        return Err(write_error(err.to_string()));
    }
    // Directory sync is best effort.
    drop(dir.open(".").and_then(|handle| handle.sync_all()));

    Ok(())
}

fn write_temp_file<F>(
    dir: &Dir,
    tmp_name: &str,
    display_path: &Utf8Path,
    fill: F,
) -> Result<(), CliError>
where
    F: FnOnce(&mut dyn Write) -> Result<(), CliError>,
{
    let io_error = |err: &io::Error| CliError::WriteError {
        path: display_path.to_path_buf(),
        message: err.to_string(),
    };
    let mut options = OpenOptions::new();
    options.write(true).create_new(true);
    let file = dir
        .open_with(tmp_name, &options)
        .map_err(|err| io_error(&err))?;
    let mut writer = BufWriter::new(file);
    fill(&mut writer)?;
    let flushed = writer
        .into_inner()
        .map_err(|err| io_error(err.error()))?;
    flushed.sync_all().map_err(|err| io_error(&err))
}

#[cfg(windows)]
fn rename_into_place(dir: &Dir, tmp_name: &str, target_name: &str) -> io::Result<()> {
    match dir.remove_file(target_name) {
        Ok(()) => {}
        Err(err) if err.kind() == io::ErrorKind::NotFound => {}
        Err(err) => return Err(err),
    }
    dir.rename(tmp_name, dir, target_name)
}

#[cfg(not(windows))]
fn rename_into_place(dir: &Dir, tmp_name: &str, target_name: &str) -> io::Result<()> {
    dir.rename(tmp_name, dir, target_name)
}
