//! Core data models for geocoding runs
//!
//! This module defines the record, schema, outcome and diagnostics types that
//! flow between the record source, the geocode client, the batch writer and
//! the diagnostics log.

use crate::constants::{LATITUDE_COLUMN, LOG_ENTRY_TIMESTAMP_FORMAT, LONGITUDE_COLUMN, placeholders};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

/// Ordered column names taken from the input header row
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Schema {
    columns: Vec<String>,
}

impl Schema {
    /// Create a schema from header names
    pub fn new(columns: Vec<String>) -> Self {
        Self { columns }
    }

    /// Column names in input order
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Reject schemas that do not reach the address column
    pub fn validate_address_column(&self, address_column: usize) -> Result<()> {
        if self.columns.len() > address_column {
            Ok(())
        } else {
            Err(Error::schema_too_narrow(self.columns.len(), address_column))
        }
    }

    /// Derive the output schema
    ///
    /// Any existing `latitude`/`longitude` column (case-insensitive) is dropped
    /// and `Latitude`, `Longitude` are appended at the end.
    pub fn output_schema(&self) -> Schema {
        let mut columns: Vec<String> = self
            .columns
            .iter()
            .filter(|name| !is_coordinate_column(name))
            .cloned()
            .collect();
        columns.push(LATITUDE_COLUMN.to_string());
        columns.push(LONGITUDE_COLUMN.to_string());
        Schema { columns }
    }
}

/// Whether a column name collides with the appended coordinate columns
pub fn is_coordinate_column(name: &str) -> bool {
    name.eq_ignore_ascii_case(LATITUDE_COLUMN) || name.eq_ignore_ascii_case(LONGITUDE_COLUMN)
}

/// One input row as an ordered field-name to value mapping
///
/// Records are immutable once read except for the coordinate fields added by
/// [`Record::annotate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    ordinal: usize,
    fields: Vec<(String, String)>,
    raw_width: usize,
}

impl Record {
    /// Build a record by pairing header names with row values
    ///
    /// Short rows are padded with empty values; values beyond the header are
    /// dropped. `raw_width` keeps the original value count for diagnostics.
    pub fn from_row(ordinal: usize, schema: &Schema, values: Vec<String>) -> Self {
        let raw_width = values.len();
        let mut values = values.into_iter();
        let fields = schema
            .columns()
            .iter()
            .map(|name| (name.clone(), values.next().unwrap_or_default()))
            .collect();
        Self {
            ordinal,
            fields,
            raw_width,
        }
    }

    /// 1-based position in the input
    pub fn ordinal(&self) -> usize {
        self.ordinal
    }

    pub fn fields(&self) -> &[(String, String)] {
        &self.fields
    }

    /// Number of values present in the input row
    pub fn raw_width(&self) -> usize {
        self.raw_width
    }

    /// First value stored under `name`
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value.as_str())
    }

    /// Value at a zero-based column position
    pub fn value_at(&self, index: usize) -> Option<&str> {
        self.fields.get(index).map(|(_, value)| value.as_str())
    }

    /// Replace any coordinate fields with the outcome's coordinate strings
    pub fn annotate(&mut self, outcome: &GeocodeOutcome) {
        let (latitude, longitude) = outcome.coordinate_strings();
        self.fields.retain(|(name, _)| !is_coordinate_column(name));
        self.fields.push((LATITUDE_COLUMN.to_string(), latitude));
        self.fields.push((LONGITUDE_COLUMN.to_string(), longitude));
    }

    /// Values by position, padded or cut to the width of `schema`
    ///
    /// Fields are positional so repeated header names keep their own values.
    /// An annotated record lines up with its input's output schema.
    pub fn values_for(&self, schema: &Schema) -> Vec<&str> {
        (0..schema.len())
            .map(|index| self.value_at(index).unwrap_or_default())
            .collect()
    }

    /// Serialize the record as a JSON object, preserving field order
    pub fn to_json(&self) -> String {
        let map: serde_json::Map<String, serde_json::Value> = self
            .fields
            .iter()
            .map(|(name, value)| (name.clone(), serde_json::Value::String(value.clone())))
            .collect();
        serde_json::Value::Object(map).to_string()
    }
}

/// Classified result of one lookup
///
/// Exactly one variant holds per record. Only `Success` carries coordinates.
#[derive(Debug, Clone, PartialEq)]
pub enum GeocodeOutcome {
    Success { lat: f64, lon: f64 },
    EmptyAddress,
    KeyMissing,
    NotFound,
    RateLimited,
    ApiError { detail: String },
    TransportError { detail: String },
    /// Synthetic outcome for records read after the run's ceiling was reached
    SkippedByCeiling,
}

impl GeocodeOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Whether the outcome counts as a geocoding attempt against the ceiling
    pub fn counts_toward_ceiling(&self) -> bool {
        !matches!(self, Self::EmptyAddress | Self::SkippedByCeiling)
    }

    /// Short stable label used in summaries
    pub fn label(&self) -> &'static str {
        match self {
            Self::Success { .. } => "success",
            Self::EmptyAddress => "empty_address",
            Self::KeyMissing => "key_missing",
            Self::NotFound => "not_found",
            Self::RateLimited => "rate_limited",
            Self::ApiError { .. } => "api_error",
            Self::TransportError { .. } => "transport_error",
            Self::SkippedByCeiling => "skipped_by_ceiling",
        }
    }

    /// Placeholder written to both coordinate columns for non-success outcomes
    pub fn placeholder(&self) -> Option<&'static str> {
        match self {
            Self::Success { .. } => None,
            Self::EmptyAddress | Self::SkippedByCeiling => Some(placeholders::EMPTY),
            Self::KeyMissing => Some(placeholders::KEY_MISSING),
            Self::NotFound => Some(placeholders::NOT_FOUND),
            Self::RateLimited => Some(placeholders::RATE_LIMITED),
            Self::ApiError { .. } => Some(placeholders::API_ERROR),
            Self::TransportError { .. } => Some(placeholders::TRANSPORT_ERROR),
        }
    }

    /// Latitude and longitude cell values
    pub fn coordinate_strings(&self) -> (String, String) {
        match self {
            Self::Success { lat, lon } => (lat.to_string(), lon.to_string()),
            other => {
                let placeholder = other.placeholder().unwrap_or_default();
                (placeholder.to_string(), placeholder.to_string())
            }
        }
    }

    /// Diagnostics severity, `None` when nothing is logged
    pub fn severity(&self) -> Option<Severity> {
        match self {
            Self::Success { .. } | Self::SkippedByCeiling => None,
            Self::EmptyAddress => Some(Severity::Info),
            Self::KeyMissing => Some(Severity::Error),
            Self::NotFound
            | Self::RateLimited
            | Self::ApiError { .. }
            | Self::TransportError { .. } => Some(Severity::Fail),
        }
    }

    fn describe(&self) -> String {
        match self {
            Self::Success { lat, lon } => format!("geocoded to {}, {}", lat, lon),
            Self::EmptyAddress => "address is empty, skipped".to_string(),
            Self::KeyMissing => {
                "API key is missing or invalid; set GEOCODE_API_KEY and rerun".to_string()
            }
            Self::NotFound => "no results for address".to_string(),
            Self::RateLimited => "rate limited by geocoding service".to_string(),
            Self::ApiError { detail } => format!("geocoding service error: {}", detail),
            Self::TransportError { detail } => format!("request failed: {}", detail),
            Self::SkippedByCeiling => "skipped, record ceiling reached".to_string(),
        }
    }
}

impl fmt::Display for GeocodeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}

/// Diagnostics severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Info,
    Warn,
    Error,
    Fail,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "INFO",
            Severity::Warn => "WARN",
            Severity::Error => "ERROR",
            Severity::Fail => "FAIL",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One line of the diagnostics log
#[derive(Debug, Clone, PartialEq)]
pub struct LogEntry {
    pub severity: Severity,
    pub timestamp: DateTime<Utc>,
    pub message: String,
}

impl LogEntry {
    /// Create an entry stamped with the current time
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            timestamp: Utc::now(),
            message: message.into(),
        }
    }

    /// Build the entry for a record's outcome, if that outcome is logged
    ///
    /// `FAIL` entries embed the full serialized record.
    pub fn for_outcome(record: &Record, address: &str, outcome: &GeocodeOutcome) -> Option<Self> {
        let severity = outcome.severity()?;
        let mut message = format!(
            "Row {}: {} (address: \"{}\")",
            record.ordinal(),
            outcome,
            address
        );
        if severity == Severity::Fail {
            message.push_str(" | record: ");
            message.push_str(&record.to_json());
        }
        Some(Self::new(severity, message))
    }

    /// Render as `[timestamp] SEVERITY: message`
    pub fn format_line(&self) -> String {
        format!(
            "[{}] {}: {}",
            self.timestamp.format(LOG_ENTRY_TIMESTAMP_FORMAT),
            self.severity,
            self.message.replace(['\r', '\n'], " ")
        )
    }
}
