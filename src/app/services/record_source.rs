//! Record source for the input CSV dataset
//!
//! Opens the input, captures the header row as the [`Schema`] and then streams
//! data rows as [`Record`]s in input order. The header is available before
//! any row is read, so schema validation always precedes the first write.

use crate::app::models::{Record, Schema};
use crate::{Error, Result};
use csv::{Reader, ReaderBuilder, StringRecordsIntoIter, Trim};
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Streaming reader over the input dataset
#[derive(Debug)]
pub struct RecordSource {
    path: PathBuf,
    schema: Schema,
    reader: Reader<File>,
}

impl RecordSource {
    /// Open the input and read its header row
    ///
    /// An unreadable path or undecodable header is an ingest error. An empty
    /// file yields an empty schema.
    pub fn open(path: &Path) -> Result<Self> {
        let mut reader = reader_builder().from_path(path).map_err(|e| {
            Error::ingest(
                path.display().to_string(),
                "cannot open input file",
                Some(e),
            )
        })?;

        let headers = reader.headers().map_err(|e| {
            Error::ingest(
                path.display().to_string(),
                "cannot read header row",
                Some(e),
            )
        })?;

        // A file holding only a blank line parses as a single empty header
        let columns: Vec<String> = if headers.len() == 1 && headers[0].is_empty() {
            Vec::new()
        } else {
            headers.iter().map(|h| h.to_string()).collect()
        };

        debug!(
            "Opened {} with {} columns: {:?}",
            path.display(),
            columns.len(),
            columns
        );

        Ok(Self {
            path: path.to_path_buf(),
            schema: Schema::new(columns),
            reader,
        })
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Stream the data rows with 1-based ordinals
    pub fn into_records(self) -> Records {
        Records {
            path: self.path,
            schema: self.schema,
            rows: self.reader.into_records(),
            next_ordinal: 1,
        }
    }
}

/// Iterator of records in input order
pub struct Records {
    path: PathBuf,
    schema: Schema,
    rows: StringRecordsIntoIter<File>,
    next_ordinal: usize,
}

impl Iterator for Records {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        let row = self.rows.next()?;
        let ordinal = self.next_ordinal;
        self.next_ordinal += 1;

        Some(
            row.map(|row| {
                Record::from_row(
                    ordinal,
                    &self.schema,
                    row.iter().map(|v| v.to_string()).collect(),
                )
            })
            .map_err(|e| {
                Error::ingest(
                    self.path.display().to_string(),
                    format!("cannot read row {}", ordinal),
                    Some(e),
                )
            }),
        )
    }
}

/// Read the schema and every record into memory
pub fn load(path: &Path) -> Result<(Schema, Vec<Record>)> {
    let source = RecordSource::open(path)?;
    let schema = source.schema().clone();
    let records = source.into_records().collect::<Result<Vec<_>>>()?;
    Ok((schema, records))
}

/// Count data rows without building records
pub fn count_records(path: &Path) -> Result<usize> {
    let mut reader = reader_builder().from_path(path).map_err(|e| {
        Error::ingest(
            path.display().to_string(),
            "cannot open input file",
            Some(e),
        )
    })?;

    let mut count = 0;
    let mut row = csv::ByteRecord::new();
    while reader.read_byte_record(&mut row).map_err(|e| {
        Error::ingest(
            path.display().to_string(),
            format!("cannot read row {}", count + 1),
            Some(e),
        )
    })? {
        count += 1;
    }
    Ok(count)
}

fn reader_builder() -> ReaderBuilder {
    let mut builder = ReaderBuilder::new();
    builder.has_headers(true).flexible(true).trim(Trim::Headers);
    builder
}
