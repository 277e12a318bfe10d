//! Run summaries and outcome tallies

use super::state::RunPhase;
use crate::app::models::GeocodeOutcome;
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

/// Per-outcome record counts
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OutcomeCounts {
    pub success: usize,
    pub empty_address: usize,
    pub key_missing: usize,
    pub not_found: usize,
    pub rate_limited: usize,
    pub api_error: usize,
    pub transport_error: usize,
    pub skipped_by_ceiling: usize,
}

impl OutcomeCounts {
    pub fn record(&mut self, outcome: &GeocodeOutcome) {
        let slot = match outcome {
            GeocodeOutcome::Success { .. } => &mut self.success,
            GeocodeOutcome::EmptyAddress => &mut self.empty_address,
            GeocodeOutcome::KeyMissing => &mut self.key_missing,
            GeocodeOutcome::NotFound => &mut self.not_found,
            GeocodeOutcome::RateLimited => &mut self.rate_limited,
            GeocodeOutcome::ApiError { .. } => &mut self.api_error,
            GeocodeOutcome::TransportError { .. } => &mut self.transport_error,
            GeocodeOutcome::SkippedByCeiling => &mut self.skipped_by_ceiling,
        };
        *slot += 1;
    }

    /// Records needing manual follow-up
    pub fn failures(&self) -> usize {
        self.not_found + self.rate_limited + self.api_error + self.transport_error
    }

    pub fn total(&self) -> usize {
        self.success
            + self.empty_address
            + self.key_missing
            + self.failures()
            + self.skipped_by_ceiling
    }
}

/// Result of a completed run
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub phase: RunPhase,
    pub output_path: PathBuf,
    /// Present when at least one diagnostics entry was written
    pub log_path: Option<PathBuf>,
    /// Output already had content and was appended to
    pub appended_to_existing: bool,
    pub records_read: usize,
    pub records_skipped_before_start: usize,
    pub records_written: usize,
    pub geocoded: usize,
    pub outcomes: OutcomeCounts,
    pub batches_flushed: usize,
    pub batches_lost: usize,
    pub log_entries: usize,
    pub stopped_at_ceiling: bool,
    pub last_flushed_ordinal: Option<usize>,
    pub elapsed_ms: u128,
}

impl RunSummary {
    /// Ordinal to pass as `--from-row` to continue after this run
    pub fn next_from_row(&self) -> Option<usize> {
        self.last_flushed_ordinal.map(|ordinal| ordinal + 1)
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} records written ({} geocoded, {} succeeded, {} failed, {} empty) in {} batches",
            self.records_written,
            self.geocoded,
            self.outcomes.success,
            self.outcomes.failures(),
            self.outcomes.empty_address,
            self.batches_flushed
        )
    }
}

/// What a dry run found without writing or calling anything
#[derive(Debug, Clone, Serialize)]
pub struct RunPlan {
    pub output_path: PathBuf,
    pub appends_to_existing: bool,
    pub columns: Vec<String>,
    pub output_columns: Vec<String>,
    pub total_records: usize,
    pub eligible_records: usize,
    /// Upper bound on lookups, accounting for the ceiling
    pub max_lookups: usize,
}
