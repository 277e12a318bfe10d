//! Append-only diagnostics log of per-record anomalies
//!
//! Entries are buffered per batch and flushed right after the matching output
//! batch, so an entry referencing a record implies the record's row was
//! already written. Each entry is also mirrored to the operator surface
//! through `tracing`.

use super::batch_writer::ensure_parent_dir;
use crate::app::models::{LogEntry, Severity};
use crate::constants::{LOG_FILE_EXTENSION, LOG_FILE_PREFIX, LOG_FILE_TIMESTAMP_FORMAT};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use std::fs::OpenOptions;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

/// Buffered diagnostics log for one run
#[derive(Debug)]
pub struct DiagnosticsLog {
    path: PathBuf,
    pending: Vec<LogEntry>,
    entries_written: usize,
}

impl DiagnosticsLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            pending: Vec::new(),
            entries_written: 0,
        }
    }

    /// Log named after the run's start time inside `log_dir`
    ///
    /// A name already taken by an earlier log gets a numeric suffix.
    pub fn for_run(log_dir: &Path, started_at: DateTime<Utc>) -> Self {
        Self::new(unused_log_path(log_dir, started_at))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn pending(&self) -> &[LogEntry] {
        &self.pending
    }

    pub fn entries_written(&self) -> usize {
        self.entries_written
    }

    /// Buffer an entry and mirror it to the console
    pub fn push(&mut self, entry: LogEntry) {
        match entry.severity {
            Severity::Info => info!("{}", entry.message),
            Severity::Warn => warn!("{}", entry.message),
            Severity::Error => error!("{}", entry.message),
            Severity::Fail => error!("FAIL: {}", entry.message),
        }
        self.pending.push(entry);
    }

    /// Append buffered entries durably
    ///
    /// Entries stay buffered when the append fails and are retried on the
    /// next flush.
    pub fn flush(&mut self) -> Result<()> {
        if self.pending.is_empty() {
            return Ok(());
        }
        append(&self.path, &self.pending)?;
        self.entries_written += self.pending.len();
        self.pending.clear();
        Ok(())
    }
}

/// Append `entries` to `path`, creating the directory, then sync
pub fn append(path: &Path, entries: &[LogEntry]) -> Result<()> {
    ensure_parent_dir(path)?;

    let file = OpenOptions::new()
        .append(true)
        .create(true)
        .open(path)
        .map_err(|e| log_error(path, "cannot open log", e))?;

    let mut writer = BufWriter::new(file);
    for entry in entries {
        writeln!(writer, "{}", entry.format_line())
            .map_err(|e| log_error(path, "cannot write log entry", e))?;
    }

    let file = writer
        .into_inner()
        .map_err(|e| log_error(path, "cannot flush log", e.into_error()))?;
    file.sync_all()
        .map_err(|e| log_error(path, "cannot sync log", e))
}

/// `geocode-YYYYMMDD-HHMMSS-mmm.log`
pub fn log_file_name(started_at: DateTime<Utc>) -> String {
    format!(
        "{}{}.{}",
        LOG_FILE_PREFIX,
        started_at.format(LOG_FILE_TIMESTAMP_FORMAT),
        LOG_FILE_EXTENSION
    )
}

/// First of `geocode-<stamp>.log`, `geocode-<stamp>-2.log`, ... not on disk
fn unused_log_path(log_dir: &Path, started_at: DateTime<Utc>) -> PathBuf {
    let path = log_dir.join(log_file_name(started_at));
    if !path.exists() {
        return path;
    }

    let stamp = started_at.format(LOG_FILE_TIMESTAMP_FORMAT).to_string();
    (2..)
        .map(|n| {
            log_dir.join(format!(
                "{}{}-{}.{}",
                LOG_FILE_PREFIX, stamp, n, LOG_FILE_EXTENSION
            ))
        })
        .find(|candidate| !candidate.exists())
        .unwrap_or(path)
}

fn log_error(path: &Path, message: &str, source: io::Error) -> Error {
    Error::write(path.display().to_string(), message, Some(source))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_log_file_name() {
        let started = Utc.with_ymd_and_hms(2026, 3, 9, 7, 5, 1).unwrap();
        assert_eq!(log_file_name(started), "geocode-20260309-070501-000.log");

        let later = started + chrono::Duration::milliseconds(42);
        assert_eq!(log_file_name(later), "geocode-20260309-070501-042.log");
    }

    #[test]
    fn test_runs_started_together_get_distinct_logs() {
        let temp_dir = TempDir::new().unwrap();
        let started = Utc.with_ymd_and_hms(2026, 3, 9, 7, 5, 1).unwrap();

        let mut first = DiagnosticsLog::for_run(temp_dir.path(), started);
        first.push(LogEntry::new(Severity::Warn, "Row 1: first run"));
        first.flush().unwrap();

        let mut second = DiagnosticsLog::for_run(temp_dir.path(), started);
        assert_ne!(second.path(), first.path());
        assert_eq!(
            second.path(),
            temp_dir.path().join("geocode-20260309-070501-000-2.log")
        );
        second.push(LogEntry::new(Severity::Warn, "Row 1: second run"));
        second.flush().unwrap();

        let first_contents = fs::read_to_string(first.path()).unwrap();
        assert_eq!(first_contents.lines().count(), 1);
        assert!(first_contents.contains("first run"));
    }

    #[test]
    fn test_flush_appends_in_order() {
        let temp_dir = TempDir::new().unwrap();
        let log_dir = temp_dir.path().join("logs");
        let started = Utc.with_ymd_and_hms(2026, 3, 9, 7, 5, 1).unwrap();
        let mut log = DiagnosticsLog::for_run(&log_dir, started);

        log.push(LogEntry::new(Severity::Info, "Row 2: address is empty"));
        log.push(LogEntry::new(Severity::Fail, "Row 3: no results"));
        log.flush().unwrap();
        assert!(log.pending().is_empty());

        log.push(LogEntry::new(Severity::Error, "Row 4: key missing"));
        log.flush().unwrap();
        assert_eq!(log.entries_written(), 3);

        let contents = fs::read_to_string(log.path()).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].ends_with("] INFO: Row 2: address is empty"));
        assert!(lines[1].ends_with("] FAIL: Row 3: no results"));
        assert!(lines[2].ends_with("] ERROR: Row 4: key missing"));
        assert!(lines[0].starts_with("[20"));
    }

    #[test]
    fn test_empty_flush_creates_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let mut log = DiagnosticsLog::new(temp_dir.path().join("run.log"));
        log.flush().unwrap();
        assert!(!log.path().exists());
    }

    #[test]
    fn test_failed_flush_keeps_entries() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("run.log");
        fs::create_dir(&path).unwrap();

        let mut log = DiagnosticsLog::new(&path);
        log.push(LogEntry::new(Severity::Warn, "Row 1: ragged"));
        assert!(log.flush().is_err());
        assert_eq!(log.pending().len(), 1);

        fs::remove_dir(&path).unwrap();
        log.flush().unwrap();
        assert_eq!(log.entries_written(), 1);
    }
}
