//! Tests for the pipeline orchestrator
//!
//! Runs are driven through a scripted geocoder so outcomes, call counts and
//! pacing can be asserted without a network.

pub mod failure_tests;
pub mod resume_tests;

use crate::app::models::GeocodeOutcome;
use crate::app::services::geocode_client::Geocoder;
use crate::app::services::pipeline::RunSummary;
use crate::config::RunConfig;
use crate::{Error, Result};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tempfile::TempDir;

pub const BAKER_STREET: (f64, f64) = (51.5237587, -0.1585458);

/// Scripted reply for one address
#[derive(Debug, Clone)]
pub enum Reply {
    Outcome(GeocodeOutcome),
    ClientError(String),
}

/// Geocoder double answering from a fixed table
///
/// Unknown addresses are `NotFound`. Empty addresses short-circuit the way the
/// HTTP client does and are not recorded as calls.
#[derive(Debug, Default)]
pub struct ScriptedGeocoder {
    replies: HashMap<String, Reply>,
    key_missing: bool,
    calls: Mutex<Vec<String>>,
}

impl ScriptedGeocoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_success(mut self, address: &str, lat: f64, lon: f64) -> Self {
        self.replies.insert(
            address.to_string(),
            Reply::Outcome(GeocodeOutcome::Success { lat, lon }),
        );
        self
    }

    pub fn with_outcome(mut self, address: &str, outcome: GeocodeOutcome) -> Self {
        self.replies
            .insert(address.to_string(), Reply::Outcome(outcome));
        self
    }

    pub fn with_client_error(mut self, address: &str, message: &str) -> Self {
        self.replies
            .insert(address.to_string(), Reply::ClientError(message.to_string()));
        self
    }

    /// Behave as if no usable credential is configured
    pub fn without_key(mut self) -> Self {
        self.key_missing = true;
        self
    }

    /// Addresses that reached the service, in call order
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl Geocoder for ScriptedGeocoder {
    async fn lookup(&self, address: &str) -> Result<GeocodeOutcome> {
        if address.trim().is_empty() {
            return Ok(GeocodeOutcome::EmptyAddress);
        }
        if self.key_missing {
            return Ok(GeocodeOutcome::KeyMissing);
        }

        self.calls.lock().unwrap().push(address.to_string());
        match self.replies.get(address) {
            Some(Reply::Outcome(outcome)) => Ok(outcome.clone()),
            Some(Reply::ClientError(message)) => Err(Error::decode(message.clone())),
            None => Ok(GeocodeOutcome::NotFound),
        }
    }
}

/// Temporary workspace holding one input, its output and a log directory
pub struct Fixture {
    pub dir: TempDir,
    pub input: PathBuf,
    pub output: PathBuf,
    pub log_dir: PathBuf,
}

impl Fixture {
    pub fn new(input_contents: &str) -> Self {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("addresses.csv");
        fs::write(&input, input_contents).unwrap();
        Self {
            output: dir.path().join("geocoded.csv"),
            log_dir: dir.path().join("logs"),
            input,
            dir,
        }
    }

    /// Config with pacing disabled and logs kept inside the fixture
    pub fn config(&self) -> RunConfig {
        RunConfig::new(&self.input, &self.output)
            .with_delay_ms(0)
            .with_log_dir(&self.log_dir)
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }
}

/// Input with `count` single-column addresses `addr-1..=addr-count`
pub fn numbered_input(count: usize) -> String {
    let mut contents = String::from("Address\n");
    for i in 1..=count {
        contents.push_str(&format!("addr-{}\n", i));
    }
    contents
}

/// Geocoder that succeeds for every `addr-N` in `1..=count`
pub fn numbered_geocoder(count: usize) -> ScriptedGeocoder {
    (1..=count).fold(ScriptedGeocoder::new(), |geocoder, i| {
        geocoder.with_success(&format!("addr-{}", i), i as f64, -(i as f64))
    })
}

pub fn read_lines(path: &Path) -> Vec<String> {
    fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(|line| line.to_string())
        .collect()
}

/// Diagnostics log lines for a run, empty when no log was created
pub fn log_lines(summary: &RunSummary) -> Vec<String> {
    summary
        .log_path
        .as_deref()
        .map(read_lines)
        .unwrap_or_default()
}
