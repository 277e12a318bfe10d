//! Durable batched writes to the output dataset
//!
//! The first batch of a fresh run truncates the sink and writes the header;
//! every later batch, and every batch of a resumed run, appends data rows
//! only. Each flush is synced to stable storage before it returns, so after
//! abrupt termination the sink holds exactly the batches that completed.

use crate::app::models::{Record, Schema};
use crate::constants::FAILURE_NOTICE_HEADER;
use crate::{Error, Result};
use csv::{Terminator, Writer, WriterBuilder};
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Output sink tracking header state across flushes
#[derive(Debug)]
pub struct BatchWriter {
    path: PathBuf,
    schema: Schema,
    header_pending: bool,
    resuming: bool,
    rows_written: usize,
    batches_flushed: usize,
}

impl BatchWriter {
    /// Inspect the target and prepare to write `schema` rows to it
    ///
    /// A target that already exists and is non-empty puts the writer in
    /// append-only mode for the whole run; the header is never re-emitted.
    /// A failure notice left by an earlier run is replaced instead.
    pub fn new(path: impl Into<PathBuf>, schema: Schema) -> Self {
        let path = path.into();
        let resuming = sink_is_resumable(&path);
        if !resuming && sink_has_content(&path) {
            info!(
                "Replacing failure notice left in {} by an earlier run",
                path.display()
            );
        }
        if resuming {
            debug!(
                "Output {} already has content, appending without header",
                path.display()
            );
        }
        Self {
            path,
            schema,
            header_pending: !resuming,
            resuming,
            rows_written: 0,
            batches_flushed: 0,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the run appends to pre-existing output
    pub fn is_resuming(&self) -> bool {
        self.resuming
    }

    pub fn rows_written(&self) -> usize {
        self.rows_written
    }

    pub fn batches_flushed(&self) -> usize {
        self.batches_flushed
    }

    /// Durably write one batch
    ///
    /// On failure the batch is presumed lost; the header stays pending if it
    /// was never written so the next successful flush still creates it.
    pub fn flush_batch(&mut self, records: &[Record]) -> Result<()> {
        flush(&self.path, records, &self.schema, self.header_pending)?;
        self.header_pending = false;
        self.rows_written += records.len();
        self.batches_flushed += 1;
        Ok(())
    }

    /// Write the header alone if nothing has been written yet
    pub fn finish_header_only(&mut self) -> Result<bool> {
        if !self.header_pending {
            return Ok(false);
        }
        self.flush_batch(&[])?;
        Ok(true)
    }
}

/// Write `records` to `path` and sync before returning
///
/// With `is_first_write_for_path` the sink is truncated and the header row
/// precedes the records; otherwise data rows are appended.
pub fn flush(
    path: &Path,
    records: &[Record],
    schema: &Schema,
    is_first_write_for_path: bool,
) -> Result<()> {
    if records.is_empty() && !is_first_write_for_path {
        return Ok(());
    }

    ensure_parent_dir(path)?;

    let file = if is_first_write_for_path {
        File::create(path)
    } else {
        OpenOptions::new().append(true).create(true).open(path)
    }
    .map_err(|e| write_error(path, "cannot open output", e))?;

    let mut writer = csv_writer(file);

    if is_first_write_for_path {
        writer
            .write_record(schema.columns())
            .map_err(|e| write_error(path, "cannot write header", e.into()))?;
    }

    for record in records {
        writer
            .write_record(record.values_for(schema))
            .map_err(|e| {
                write_error(
                    path,
                    format!("cannot write row {}", record.ordinal()),
                    e.into(),
                )
            })?;
    }

    let file = writer
        .into_inner()
        .map_err(|e| write_error(path, "cannot flush output", e.into_error()))?;
    file.sync_all()
        .map_err(|e| write_error(path, "cannot sync output", e))?;

    debug!(
        "Flushed {} rows to {}{}",
        records.len(),
        path.display(),
        if is_first_write_for_path {
            " (with header)"
        } else {
            ""
        }
    );
    Ok(())
}

/// Whether `path` exists and holds at least one byte
pub fn sink_has_content(path: &Path) -> bool {
    fs::metadata(path)
        .map(|m| m.is_file() && m.len() > 0)
        .unwrap_or(false)
}

/// Whether `path` holds rows a new run should append to
///
/// An earlier run's failure notice is not output, so it does not count.
pub fn sink_is_resumable(path: &Path) -> bool {
    sink_has_content(path) && !holds_failure_notice(path)
}

/// Whether the first line of `path` is the failure notice header
fn holds_failure_notice(path: &Path) -> bool {
    let Ok(file) = File::open(path) else {
        return false;
    };
    let mut first_line = String::new();
    match BufReader::new(file).read_line(&mut first_line) {
        Ok(_) => first_line.trim_end_matches(['\r', '\n']) == FAILURE_NOTICE_HEADER,
        Err(_) => false,
    }
}

/// Best-effort failure notice for runs that end before producing rows
///
/// Never clobbers a sink that holds output rows. Returns whether the notice
/// was written.
pub fn write_failure_notice(path: &Path, reason: &str) -> bool {
    if sink_is_resumable(path) {
        return false;
    }

    let result = ensure_parent_dir(path).and_then(|_| {
        let file = File::create(path).map_err(|e| write_error(path, "cannot open output", e))?;
        let mut writer = csv_writer(file);
        writer
            .write_record([FAILURE_NOTICE_HEADER])
            .and_then(|_| writer.write_record([reason]))
            .map_err(|e| write_error(path, "cannot write failure notice", e.into()))?;
        let file = writer
            .into_inner()
            .map_err(|e| write_error(path, "cannot flush output", e.into_error()))?;
        file.sync_all()
            .map_err(|e| write_error(path, "cannot sync output", e))
    });

    match result {
        Ok(()) => true,
        Err(e) => {
            warn!("Could not write failure notice: {}", e);
            false
        }
    }
}

pub(crate) fn ensure_parent_dir(path: &Path) -> Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() && !parent.exists() => {
            fs::create_dir_all(parent).map_err(|e| {
                Error::write(
                    parent.display().to_string(),
                    "cannot create directory",
                    Some(e),
                )
            })
        }
        _ => Ok(()),
    }
}

fn csv_writer(file: File) -> Writer<File> {
    WriterBuilder::new()
        .has_headers(false)
        .terminator(Terminator::Any(b'\n'))
        .from_writer(file)
}

fn write_error(path: &Path, message: impl Into<String>, source: io::Error) -> Error {
    Error::write(path.display().to_string(), message, Some(source))
}
