//! Geocode Batcher Library
//!
//! A Rust library for geocoding the address column of a CSV dataset through an
//! external geocoding service, one record at a time.
//!
//! This library provides tools for:
//! - Streaming CSV records with header validation ahead of any output
//! - Classifying each lookup into a fixed outcome taxonomy
//! - Pacing billable calls against the provider's rate limit
//! - Durably flushing output rows and diagnostics in fixed-size batches
//! - Resuming interrupted runs from a given row into a separate output file

pub mod config;
pub mod constants;

// Core application modules
pub mod app {
    pub mod models;
    pub mod services {
        pub mod batch_writer;
        pub mod diagnostics_log;
        pub mod geocode_client;
        pub mod pacer;
        pub mod pipeline;
        pub mod record_source;
    }
}

// CLI modules
pub mod cli {
    pub mod args;
    pub mod commands;
}

// Re-export commonly used types
pub use app::models::{GeocodeOutcome, LogEntry, Record, Schema, Severity};
pub use config::{GeocoderConfig, RunConfig};

/// Result type alias for the geocode batcher
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for geocoding runs
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Input dataset could not be read
    #[error("Failed to read input '{path}': {message}")]
    Ingest {
        path: String,
        message: String,
        #[source]
        source: Option<csv::Error>,
    },

    /// Header does not reach the configured address column
    #[error(
        "Input has {columns} column(s) but the address column index is {address_column}; \
         at least {} columns are required",
        .address_column + 1
    )]
    SchemaTooNarrow {
        columns: usize,
        address_column: usize,
    },

    /// Output batch or diagnostics flush failed
    #[error("Failed to write '{path}': {message}")]
    Write {
        path: String,
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },

    /// Transport-level failure talking to the geocoding service
    #[error("HTTP error: {message}")]
    Http {
        message: String,
        #[source]
        source: reqwest::Error,
    },

    /// Provider body could not be decoded
    #[error("Decode error: {message}")]
    Decode { message: String },

    /// Configuration error
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Processing interrupted
    #[error("Processing interrupted: {reason}")]
    Interrupted { reason: String },
}

impl Error {
    /// Create an ingest error for the given input path
    pub fn ingest(
        path: impl Into<String>,
        message: impl Into<String>,
        source: Option<csv::Error>,
    ) -> Self {
        Self::Ingest {
            path: path.into(),
            message: message.into(),
            source,
        }
    }

    /// Create a schema-too-narrow error
    pub fn schema_too_narrow(columns: usize, address_column: usize) -> Self {
        Self::SchemaTooNarrow {
            columns,
            address_column,
        }
    }

    /// Create a write error for an output or log sink
    pub fn write(
        path: impl Into<String>,
        message: impl Into<String>,
        source: Option<std::io::Error>,
    ) -> Self {
        Self::Write {
            path: path.into(),
            message: message.into(),
            source,
        }
    }

    /// Create an HTTP transport error
    pub fn http(message: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Http {
            message: message.into(),
            source,
        }
    }

    /// Create a decode error
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a processing interrupted error
    pub fn interrupted(reason: impl Into<String>) -> Self {
        Self::Interrupted {
            reason: reason.into(),
        }
    }

    /// Whether this error ends the run rather than a single record
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Ingest { .. }
                | Self::SchemaTooNarrow { .. }
                | Self::Configuration { .. }
                | Self::Interrupted { .. }
        )
    }
}

// Automatic conversions from common error types
impl From<csv::Error> for Error {
    fn from(error: csv::Error) -> Self {
        Self::Ingest {
            path: "unknown".to_string(),
            message: "CSV parsing failed".to_string(),
            source: Some(error),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(error: serde_json::Error) -> Self {
        Self::Decode {
            message: error.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_too_narrow_message() {
        let error = Error::schema_too_narrow(2, 4);
        let message = error.to_string();
        assert!(message.contains("2 column(s)"));
        assert!(message.contains("at least 5 columns"));
        assert!(error.is_fatal());
    }

    #[test]
    fn test_write_error_is_not_fatal() {
        let error = Error::write("out.csv", "disk full", None);
        assert!(!error.is_fatal());
        assert!(error.to_string().contains("out.csv"));
    }
}
