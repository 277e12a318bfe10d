//! Command-line argument definitions for the geocode batcher
//!
//! This module defines the CLI interface using the clap derive API and maps
//! parsed flags onto [`RunConfig`] and [`GeocoderConfig`].

use crate::config::{GeocoderConfig, RunConfig};
use crate::constants::{
    DEFAULT_ADDRESS_COLUMN, DEFAULT_BATCH_SIZE, DEFAULT_DELAY_MS, DEFAULT_GEOCODE_ENDPOINT,
    DEFAULT_LOG_DIR, DEFAULT_MAX_RECORDS, DEFAULT_REQUEST_TIMEOUT_SECS,
};
use crate::{Error, Result};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;

/// CLI arguments for the geocode batcher
///
/// Geocodes the address column of a CSV file one record at a time, writing
/// coordinates back in durable batches so interrupted runs can be resumed.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "geocode-batcher",
    version,
    about = "Geocode the address column of a CSV file in resumable, rate-limited batches",
    long_about = "Reads a CSV file, looks up the address in one column of every row through a \
                  geocoding service, and writes each row back with Latitude and Longitude columns. \
                  Output and diagnostics are flushed durably every batch; after an interruption, \
                  rerun with --from-row to continue into a separate output file."
)]
pub struct Args {
    /// Input CSV file with a header row
    #[arg(
        short = 'i',
        long = "input",
        value_name = "FILE",
        help = "Input CSV file with a header row"
    )]
    pub input_path: PathBuf,

    /// Output CSV file
    ///
    /// When resuming with --from-row N the run writes to a sibling file named
    /// like `output-from-row-N.csv` instead.
    #[arg(
        short = 'o',
        long = "output",
        value_name = "FILE",
        help = "Output CSV file"
    )]
    pub output_path: PathBuf,

    /// Zero-based index of the column holding the address
    #[arg(
        short = 'c',
        long = "address-column",
        value_name = "INDEX",
        default_value_t = DEFAULT_ADDRESS_COLUMN,
        help = "Zero-based index of the address column"
    )]
    pub address_column: usize,

    /// Delay after each successful lookup
    ///
    /// Skipped and failed records are not delayed, and no delay follows the
    /// final record.
    #[arg(
        long = "delay-ms",
        value_name = "MS",
        default_value_t = DEFAULT_DELAY_MS,
        help = "Delay after each successful lookup, in milliseconds"
    )]
    pub delay_ms: u64,

    /// Maximum geocoding attempts this run (0 = unlimited)
    ///
    /// Empty addresses do not count. Once reached the run flushes and stops,
    /// unless --pass-through-remaining is given.
    #[arg(
        short = 'n',
        long = "max-records",
        value_name = "COUNT",
        default_value_t = DEFAULT_MAX_RECORDS,
        help = "Maximum geocoding attempts this run (0 = unlimited)"
    )]
    pub max_records: usize,

    /// Records per durable flush
    #[arg(
        short = 'b',
        long = "batch-size",
        value_name = "COUNT",
        default_value_t = DEFAULT_BATCH_SIZE,
        help = "Records per durable flush"
    )]
    pub batch_size: usize,

    /// 1-based row to start from (0 processes everything)
    #[arg(
        long = "from-row",
        value_name = "ROW",
        default_value_t = 0,
        help = "1-based row to start from; output gets a -from-row-N suffix"
    )]
    pub from_row: usize,

    /// Geocoding service credential
    ///
    /// Falls back to GEOCODE_API_KEY, then GOOGLE_MAPS_API_KEY. A missing key
    /// is not fatal; every record is marked "API Key Missing".
    #[arg(
        long = "api-key",
        value_name = "KEY",
        help = "Geocoding API key (defaults to $GEOCODE_API_KEY)"
    )]
    pub api_key: Option<String>,

    /// Geocoding endpoint URL
    #[arg(
        long = "endpoint",
        value_name = "URL",
        default_value = DEFAULT_GEOCODE_ENDPOINT,
        help = "Geocoding service endpoint"
    )]
    pub endpoint: String,

    /// Per-request timeout
    #[arg(
        long = "timeout-secs",
        value_name = "SECS",
        default_value_t = DEFAULT_REQUEST_TIMEOUT_SECS,
        help = "Per-request timeout in seconds"
    )]
    pub timeout_secs: u64,

    /// Directory for the per-run diagnostics log
    #[arg(
        long = "log-dir",
        value_name = "DIR",
        default_value = DEFAULT_LOG_DIR,
        help = "Directory for the per-run diagnostics log"
    )]
    pub log_dir: PathBuf,

    /// Keep writing records after the ceiling without geocoding them
    #[arg(
        long = "pass-through-remaining",
        help = "After --max-records, copy remaining rows with empty coordinates"
    )]
    pub pass_through_remaining: bool,

    /// Validate the input and report what would happen without writing
    #[arg(
        long = "dry-run",
        help = "Validate input and show what would be processed without writing or calling the service"
    )]
    pub dry_run: bool,

    /// Format of the final run summary
    #[arg(
        long = "summary-format",
        value_enum,
        default_value = "human",
        help = "Format of the final run summary"
    )]
    pub summary_format: SummaryFormat,

    /// Logging verbosity level
    #[arg(
        short = 'v',
        long = "verbose",
        action = clap::ArgAction::Count,
        help = "Increase logging verbosity (-v: info, -vv: debug, -vvv: trace)"
    )]
    pub verbose: u8,

    /// Suppress output (quiet mode)
    #[arg(
        short = 'q',
        long = "quiet",
        help = "Suppress output except errors",
        conflicts_with = "verbose"
    )]
    pub quiet: bool,

    /// Disable the progress bar
    #[arg(long = "no-progress", help = "Disable the progress bar")]
    pub no_progress: bool,
}

/// Summary output formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SummaryFormat {
    /// Human-readable output
    Human,
    /// JSON format for scripting
    Json,
}

impl Args {
    /// Validate the arguments for consistency
    pub fn validate(&self) -> Result<()> {
        if !self.input_path.exists() {
            return Err(Error::configuration(format!(
                "Input file does not exist: {}",
                self.input_path.display()
            )));
        }

        if !self.input_path.is_file() {
            return Err(Error::configuration(format!(
                "Input path is not a file: {}",
                self.input_path.display()
            )));
        }

        if self.timeout_secs == 0 {
            return Err(Error::configuration(
                "Request timeout must be greater than 0 seconds",
            ));
        }

        self.to_run_config().validate()?;
        GeocoderConfig::default()
            .with_endpoint(self.endpoint.clone())
            .validate()
    }

    /// Get the logging level based on verbosity
    pub fn get_log_level(&self) -> &'static str {
        if self.quiet {
            return "error";
        }

        match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }

    /// Check if progress bars should be shown
    pub fn show_progress(&self) -> bool {
        !self.quiet && !self.no_progress
    }

    pub fn to_run_config(&self) -> RunConfig {
        let config = RunConfig::new(&self.input_path, &self.output_path)
            .with_address_column(self.address_column)
            .with_delay_ms(self.delay_ms)
            .with_max_records(self.max_records)
            .with_batch_size(self.batch_size)
            .with_from_row(self.from_row)
            .with_log_dir(&self.log_dir)
            .with_progress(self.show_progress());

        if self.pass_through_remaining {
            config.with_pass_through_after_ceiling()
        } else {
            config
        }
    }

    /// Credential from `--api-key` or the environment, plus transport settings
    pub fn to_geocoder_config(&self) -> GeocoderConfig {
        GeocoderConfig::from_env(self.api_key.clone())
            .with_endpoint(self.endpoint.clone())
            .with_request_timeout(Duration::from_secs(self.timeout_secs))
    }
}
