//! Application constants for the geocode batcher
//!
//! This module contains default run parameters, provider status codes,
//! placeholder strings and file naming conventions used throughout the crate.

// =============================================================================
// Run Defaults
// =============================================================================

/// Records buffered in memory before a durable flush
pub const DEFAULT_BATCH_SIZE: usize = 10;

/// Delay after each successful (billable) lookup, in milliseconds
pub const DEFAULT_DELAY_MS: u64 = 200;

/// Zero-based index of the address column in the input
pub const DEFAULT_ADDRESS_COLUMN: usize = 0;

/// Maximum geocoding attempts per run (0 = unlimited)
pub const DEFAULT_MAX_RECORDS: usize = 0;

/// Directory that receives per-run diagnostics logs
pub const DEFAULT_LOG_DIR: &str = "logs";

/// Largest batch size accepted from the CLI
pub const MAX_BATCH_SIZE: usize = 100_000;

// =============================================================================
// Geocoding Service
// =============================================================================

/// Default JSON geocoding endpoint
pub const DEFAULT_GEOCODE_ENDPOINT: &str = "https://maps.googleapis.com/maps/api/geocode/json";

/// Request timeout applied by the HTTP transport
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// User agent sent with every lookup
pub const CLIENT_USER_AGENT: &str = concat!("geocode-batcher/", env!("CARGO_PKG_VERSION"));

/// Environment variables consulted for the service credential, in order
pub const API_KEY_ENV_VARS: &[&str] = &["GEOCODE_API_KEY", "GOOGLE_MAPS_API_KEY"];

/// Credentials shorter than this are rejected without a network call
pub const MIN_API_KEY_LEN: usize = 20;

/// Values commonly left in templates instead of a real credential
pub const PLACEHOLDER_API_KEYS: &[&str] = &[
    "YOUR_API_KEY",
    "YOUR_API_KEY_HERE",
    "your-api-key",
    "your_api_key_here",
    "INSERT_API_KEY_HERE",
    "changeme",
];

/// Provider status codes
pub mod status {
    pub const OK: &str = "OK";
    pub const ZERO_RESULTS: &str = "ZERO_RESULTS";
    pub const OVER_QUERY_LIMIT: &str = "OVER_QUERY_LIMIT";
}

/// Longest provider body excerpt embedded in a transport error
pub const ERROR_BODY_EXCERPT_LEN: usize = 200;

// =============================================================================
// Output Columns and Placeholders
// =============================================================================

/// Appended output column holding the latitude
pub const LATITUDE_COLUMN: &str = "Latitude";

/// Appended output column holding the longitude
pub const LONGITUDE_COLUMN: &str = "Longitude";

/// Coordinate placeholders written in place of numbers
pub mod placeholders {
    pub const EMPTY: &str = "";
    pub const KEY_MISSING: &str = "API Key Missing";
    pub const NOT_FOUND: &str = "Not Found";
    pub const RATE_LIMITED: &str = "Rate Limited";
    pub const API_ERROR: &str = "API Error";
    pub const TRANSPORT_ERROR: &str = "Request Failed";
}

// =============================================================================
// File Naming
// =============================================================================

/// Suffix inserted before the output extension when resuming from a row
pub const RESUME_SUFFIX_PREFIX: &str = "-from-row-";

/// Prefix of per-run diagnostics log files
pub const LOG_FILE_PREFIX: &str = "geocode-";

/// Extension of diagnostics log files
pub const LOG_FILE_EXTENSION: &str = "log";

/// chrono format for the log file name timestamp, down to milliseconds
pub const LOG_FILE_TIMESTAMP_FORMAT: &str = "%Y%m%d-%H%M%S-%3f";

/// Single header column of the notice left by a failed run
pub const FAILURE_NOTICE_HEADER: &str = "Error";

/// chrono format for diagnostics entry timestamps (ISO-8601, UTC)
pub const LOG_ENTRY_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

// =============================================================================
// Progress Display
// =============================================================================

/// Progress bar template for the record loop
pub const PROGRESS_TEMPLATE: &str =
    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} records ({percent}%) | {msg}";

/// Progress bar fill characters
pub const PROGRESS_CHARS: &str = "█▉▊▋▌▍▎▏  ";
