//! Run configuration and validation.
//!
//! A [`RunConfig`] is constructed once at startup from CLI arguments and
//! defaults, validated, and then passed by reference to the pipeline. The
//! geocoding credential and transport settings live in [`GeocoderConfig`] so
//! the secret never travels with the rest of the run parameters.

use crate::constants::{
    API_KEY_ENV_VARS, DEFAULT_ADDRESS_COLUMN, DEFAULT_BATCH_SIZE, DEFAULT_DELAY_MS,
    DEFAULT_GEOCODE_ENDPOINT, DEFAULT_LOG_DIR, DEFAULT_MAX_RECORDS, DEFAULT_REQUEST_TIMEOUT_SECS,
    MAX_BATCH_SIZE, RESUME_SUFFIX_PREFIX,
};
use crate::{Error, Result};
use secrecy::SecretString;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Immutable parameters for a single geocoding run
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Input CSV file
    pub input_path: PathBuf,

    /// Base output CSV file (suffixed when resuming from a row)
    pub output_path: PathBuf,

    /// Zero-based index of the address column
    pub address_column: usize,

    /// Delay after each successful lookup, in milliseconds
    pub delay_ms: u64,

    /// Maximum geocoding attempts this run (0 = unlimited)
    pub max_records: usize,

    /// Records per durable flush
    pub batch_size: usize,

    /// 1-based ordinal to start from (0 skips none)
    pub from_row: usize,

    /// Directory receiving the per-run diagnostics log
    pub log_dir: PathBuf,

    /// Keep writing records with ceiling placeholders after the ceiling is hit
    pub pass_through_after_ceiling: bool,

    /// Show a progress bar on stderr
    pub show_progress: bool,
}

impl RunConfig {
    /// Create a configuration with defaults for everything but the paths
    pub fn new(input_path: impl Into<PathBuf>, output_path: impl Into<PathBuf>) -> Self {
        Self {
            input_path: input_path.into(),
            output_path: output_path.into(),
            address_column: DEFAULT_ADDRESS_COLUMN,
            delay_ms: DEFAULT_DELAY_MS,
            max_records: DEFAULT_MAX_RECORDS,
            batch_size: DEFAULT_BATCH_SIZE,
            from_row: 0,
            log_dir: PathBuf::from(DEFAULT_LOG_DIR),
            pass_through_after_ceiling: false,
            show_progress: false,
        }
    }

    pub fn with_address_column(mut self, address_column: usize) -> Self {
        self.address_column = address_column;
        self
    }

    pub fn with_delay_ms(mut self, delay_ms: u64) -> Self {
        self.delay_ms = delay_ms;
        self
    }

    pub fn with_max_records(mut self, max_records: usize) -> Self {
        self.max_records = max_records;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_from_row(mut self, from_row: usize) -> Self {
        self.from_row = from_row;
        self
    }

    pub fn with_log_dir(mut self, log_dir: impl Into<PathBuf>) -> Self {
        self.log_dir = log_dir.into();
        self
    }

    pub fn with_pass_through_after_ceiling(mut self) -> Self {
        self.pass_through_after_ceiling = true;
        self
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    /// Validate parameter ranges
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(Error::configuration("Batch size must be greater than 0"));
        }

        if self.batch_size > MAX_BATCH_SIZE {
            return Err(Error::configuration(format!(
                "Batch size cannot exceed {}",
                MAX_BATCH_SIZE
            )));
        }

        if self.input_path.as_os_str().is_empty() {
            return Err(Error::configuration("Input path must not be empty"));
        }

        if self.output_path.as_os_str().is_empty() {
            return Err(Error::configuration("Output path must not be empty"));
        }

        if self.output_path == self.input_path {
            return Err(Error::configuration(format!(
                "Output path must differ from input path: {}",
                self.input_path.display()
            )));
        }

        Ok(())
    }

    /// Whether the run skips leading records
    pub fn is_resume(&self) -> bool {
        self.from_row > 0
    }

    /// Output path for this run, suffixed with `-from-row-N` when resuming
    pub fn effective_output_path(&self) -> PathBuf {
        if self.is_resume() {
            resume_output_path(&self.output_path, self.from_row)
        } else {
            self.output_path.clone()
        }
    }

    /// Ceiling for this run, `None` when unlimited
    pub fn ceiling(&self) -> Option<usize> {
        (self.max_records > 0).then_some(self.max_records)
    }

    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

/// Insert the resume suffix before the file extension
pub fn resume_output_path(path: &Path, from_row: usize) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let file_name = match path.extension() {
        Some(ext) => format!(
            "{}{}{}.{}",
            stem,
            RESUME_SUFFIX_PREFIX,
            from_row,
            ext.to_string_lossy()
        ),
        None => format!("{}{}{}", stem, RESUME_SUFFIX_PREFIX, from_row),
    };
    path.with_file_name(file_name)
}

/// Credential and transport settings for the geocoding service
#[derive(Debug)]
pub struct GeocoderConfig {
    /// Service credential; never logged
    pub api_key: Option<SecretString>,

    /// Endpoint base URL
    pub endpoint: String,

    /// Per-request timeout
    pub request_timeout: Duration,
}

impl Default for GeocoderConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            endpoint: DEFAULT_GEOCODE_ENDPOINT.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }
}

impl GeocoderConfig {
    /// Resolve the credential from an explicit value, else the environment
    pub fn from_env(explicit_key: Option<String>) -> Self {
        let api_key = explicit_key.or_else(|| {
            API_KEY_ENV_VARS.iter().find_map(|var| {
                let value = std::env::var(var).ok().filter(|v| !v.trim().is_empty());
                if value.is_some() {
                    debug!("Using API key from ${}", var);
                }
                value
            })
        });

        Self {
            api_key: api_key.map(SecretString::from),
            ..Self::default()
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(SecretString::from(api_key.into()));
        self
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.endpoint.trim().is_empty() {
            return Err(Error::configuration("Geocoding endpoint must not be empty"));
        }
        if self.request_timeout.is_zero() {
            return Err(Error::configuration("Request timeout must be greater than 0"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resume_output_path() {
        assert_eq!(
            resume_output_path(Path::new("out/geocoded.csv"), 42),
            PathBuf::from("out/geocoded-from-row-42.csv")
        );
        assert_eq!(
            resume_output_path(Path::new("geocoded"), 3),
            PathBuf::from("geocoded-from-row-3")
        );
    }

    #[test]
    fn test_effective_output_path() {
        let config = RunConfig::new("in.csv", "out.csv");
        assert_eq!(config.effective_output_path(), PathBuf::from("out.csv"));

        let config = config.with_from_row(2);
        assert!(config.is_resume());
        assert_eq!(
            config.effective_output_path(),
            PathBuf::from("out-from-row-2.csv")
        );
    }

    #[test]
    fn test_run_config_validation() {
        let config = RunConfig::new("in.csv", "out.csv");
        assert!(config.validate().is_ok());

        assert!(config.clone().with_batch_size(0).validate().is_err());
        assert!(
            config
                .clone()
                .with_batch_size(MAX_BATCH_SIZE + 1)
                .validate()
                .is_err()
        );
        assert!(RunConfig::new("same.csv", "same.csv").validate().is_err());
    }

    #[test]
    fn test_ceiling() {
        let config = RunConfig::new("in.csv", "out.csv");
        assert_eq!(config.ceiling(), None);
        assert_eq!(config.with_max_records(5).ceiling(), Some(5));
    }

    #[test]
    fn test_geocoder_config_validation() {
        assert!(GeocoderConfig::default().validate().is_ok());
        assert!(
            GeocoderConfig::default()
                .with_endpoint("  ")
                .validate()
                .is_err()
        );
        assert!(
            GeocoderConfig::default()
                .with_request_timeout(Duration::ZERO)
                .validate()
                .is_err()
        );
    }

    #[test]
    fn test_explicit_key_wins() {
        use secrecy::ExposeSecret;
        let config = GeocoderConfig::from_env(Some("explicit-key-value-1234".to_string()));
        assert_eq!(
            config.api_key.as_ref().map(|k| k.expose_secret().to_string()),
            Some("explicit-key-value-1234".to_string())
        );
    }
}
