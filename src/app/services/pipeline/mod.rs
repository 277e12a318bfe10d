//! Pipeline orchestrator for resumable, paced geocoding runs
//!
//! The [`Pipeline`] drives a single run through
//! `Idle → Ingesting → Processing → Draining → Done`, with `Failed` reachable
//! from any phase:
//!
//! 1. **Ingesting**: open the input and validate the header against the
//!    address column before anything is written
//! 2. **Processing**: for each record from the starting ordinal, look up its
//!    address, classify the outcome, annotate the record and buffer it
//! 3. **Flushing**: when the batch is full, the input is exhausted or the
//!    ceiling was just reached, durably write the batch and then its
//!    diagnostics
//! 4. **Pacing**: after a successful lookup, wait for the configured delay
//!    unless the run is ending
//!
//! Per-record failures never escalate past the record. Ingest and schema
//! failures abort the run after a best-effort notice in the output sink.
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use geocode_batcher::app::services::geocode_client::GoogleGeocoder;
//! use geocode_batcher::app::services::pipeline::Pipeline;
//! use geocode_batcher::{GeocoderConfig, RunConfig};
//!
//! # async fn example() -> geocode_batcher::Result<()> {
//! let config = RunConfig::new("addresses.csv", "geocoded.csv")
//!     .with_address_column(2)
//!     .with_batch_size(25);
//! let geocoder = GoogleGeocoder::new(GeocoderConfig::from_env(None))?;
//!
//! let summary = Pipeline::new(&config, geocoder).run().await?;
//! println!("{}", summary);
//! # Ok(())
//! # }
//! ```

pub mod state;
pub mod summary;

#[cfg(test)]
pub mod tests;

pub use state::{FailureReason, RunPhase, RunState};
pub use summary::{OutcomeCounts, RunPlan, RunSummary};

use super::batch_writer::{self, BatchWriter};
use super::diagnostics_log::DiagnosticsLog;
use super::geocode_client::Geocoder;
use super::pacer::Pacer;
use super::record_source::{self, RecordSource};
use crate::app::models::{GeocodeOutcome, LogEntry, Record, Schema, Severity};
use crate::config::RunConfig;
use crate::constants::{PROGRESS_CHARS, PROGRESS_TEMPLATE};
use crate::{Error, Result};
use chrono::Utc;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Orchestrator for one geocoding run
#[derive(Debug)]
pub struct Pipeline<'a, G> {
    config: &'a RunConfig,
    geocoder: G,
    pacer: Pacer,
}

impl<'a, G: Geocoder> Pipeline<'a, G> {
    pub fn new(config: &'a RunConfig, geocoder: G) -> Self {
        Self {
            config,
            geocoder,
            pacer: Pacer::new(config.delay()),
        }
    }

    pub fn geocoder(&self) -> &G {
        &self.geocoder
    }

    /// Execute the run to completion
    ///
    /// Returns the summary of a `Done` run, or the fatal error after a
    /// best-effort failure notice has been written.
    pub async fn run(&self) -> Result<RunSummary> {
        let started = Instant::now();
        let mut state = RunState::new(self.config);
        let mut log = DiagnosticsLog::for_run(&self.config.log_dir, Utc::now());

        state.transition(RunPhase::Ingesting);
        info!("Reading input: {}", self.config.input_path.display());

        let source = match RecordSource::open(&self.config.input_path) {
            Ok(source) => source,
            Err(e) => return Err(self.fail(&mut state, FailureReason::FatalIngest, e)),
        };
        let schema = source.schema().clone();

        if schema.is_empty() {
            warn!(
                "Input {} is empty; writing placeholder output",
                self.config.input_path.display()
            );
            let mut writer = BatchWriter::new(state.output_path.clone(), schema.output_schema());
            self.finish_header_only(&mut writer, &mut log);
            log.push(LogEntry::new(
                Severity::Warn,
                format!(
                    "Input {} has no header and no rows",
                    self.config.input_path.display()
                ),
            ));
            flush_log(&mut log);
            state.transition(RunPhase::Done);
            return Ok(self.summarize(&state, &writer, &log, started));
        }

        if let Err(e) = schema.validate_address_column(self.config.address_column) {
            return Err(self.fail(&mut state, FailureReason::SchemaTooNarrow, e));
        }

        let mut writer = BatchWriter::new(state.output_path.clone(), schema.output_schema());
        if writer.is_resuming() {
            info!(
                "Appending to existing output {} without rewriting the header",
                writer.path().display()
            );
        }

        state.transition(RunPhase::Processing);
        let progress = self.progress_bar();
        let mut records = source.into_records().peekable();

        while let Some(next) = records.next() {
            let mut record = match next {
                Ok(record) => record,
                Err(e) => {
                    self.flush_pending(&mut state, &mut writer, &mut log);
                    progress.abandon();
                    return Err(self.fail(&mut state, FailureReason::FatalIngest, e));
                }
            };
            state.records_read += 1;

            if state.is_before_start(&record) {
                state.records_skipped += 1;
                continue;
            }

            let is_last_input = records.peek().is_none();
            let address = record
                .value_at(self.config.address_column)
                .unwrap_or_default()
                .to_string();

            let outcome = if state.ceiling_reached() {
                GeocodeOutcome::SkippedByCeiling
            } else {
                self.lookup(&address).await
            };
            let ceiling_just_reached = state.record_outcome(&outcome);

            // Records past the ceiling are copied through without diagnostics
            let skipped = matches!(outcome, GeocodeOutcome::SkippedByCeiling);
            if !skipped && record.raw_width() != schema.len() {
                log.push(ragged_row_entry(&record, &schema));
            }
            if let Some(entry) = LogEntry::for_outcome(&record, &address, &outcome) {
                log.push(entry);
            }

            record.annotate(&outcome);
            state.pending_output.push(record);
            progress.inc(1);
            progress.set_message(outcome.label());

            if state.batch_is_full(self.config.batch_size) || is_last_input || ceiling_just_reached
            {
                self.flush_pending(&mut state, &mut writer, &mut log);
            }

            if ceiling_just_reached {
                info!(
                    "Record ceiling of {} reached",
                    state.ceiling.unwrap_or_default()
                );
                if !self.config.pass_through_after_ceiling {
                    state.transition(RunPhase::Draining);
                    break;
                }
            }

            let run_is_ending = is_last_input || state.ceiling_reached();
            self.pacer
                .wait_if_needed(outcome.is_success(), run_is_ending)
                .await;
        }

        if writer.rows_written() == 0 {
            self.finish_header_only(&mut writer, &mut log);
        }
        flush_log(&mut log);
        progress.finish_with_message("done");

        state.transition(RunPhase::Done);
        let summary = self.summarize(&state, &writer, &log, started);
        info!("Run complete: {}", summary);
        Ok(summary)
    }

    /// Validate the input and report what a run would do, without side effects
    pub fn plan(&self) -> Result<RunPlan> {
        let source = RecordSource::open(&self.config.input_path)?;
        let schema = source.schema().clone();
        if !schema.is_empty() {
            schema.validate_address_column(self.config.address_column)?;
        }

        let total_records = record_source::count_records(&self.config.input_path)?;
        let eligible_records = eligible_count(total_records, self.config.from_row);
        let max_lookups = match self.config.ceiling() {
            Some(ceiling) => eligible_records.min(ceiling),
            None => eligible_records,
        };
        let output_path = self.config.effective_output_path();

        Ok(RunPlan {
            appends_to_existing: batch_writer::sink_is_resumable(&output_path),
            output_path,
            columns: schema.columns().to_vec(),
            output_columns: schema.output_schema().columns().to_vec(),
            total_records,
            eligible_records,
            max_lookups,
        })
    }

    /// One lookup, with client errors downgraded to a transport failure
    async fn lookup(&self, address: &str) -> GeocodeOutcome {
        match self.geocoder.lookup(address).await {
            Ok(outcome) => outcome,
            Err(e) => {
                debug!("Geocoder error downgraded to transport failure: {}", e);
                GeocodeOutcome::TransportError {
                    detail: e.to_string(),
                }
            }
        }
    }

    /// Write the pending batch, then its diagnostics
    fn flush_pending(&self, state: &mut RunState, writer: &mut BatchWriter, log: &mut DiagnosticsLog) {
        if state.pending_output.is_empty() {
            flush_log(log);
            return;
        }

        let batch = std::mem::take(&mut state.pending_output);
        let span = state::batch_span(&batch);

        match writer.flush_batch(&batch) {
            Ok(()) => {
                if let Some((first, last)) = span {
                    state.last_flushed_ordinal = Some(last);
                    info!(
                        "Wrote rows {}-{} to {} (resume with --from-row {})",
                        first,
                        last,
                        writer.path().display(),
                        last + 1
                    );
                }
            }
            Err(e) => {
                error!("Output batch lost: {}", e);
                state.batches_lost += 1;
                log.push(state::lost_batch_entry(span, &e));
            }
        }

        flush_log(log);
    }

    fn finish_header_only(&self, writer: &mut BatchWriter, log: &mut DiagnosticsLog) {
        match writer.finish_header_only() {
            Ok(true) => debug!("Wrote header-only output to {}", writer.path().display()),
            Ok(false) => {}
            Err(e) => {
                error!("Could not write output header: {}", e);
                log.push(LogEntry::new(
                    Severity::Error,
                    format!("Failed to write output header: {}", e),
                ));
            }
        }
    }

    /// Enter `Failed`, leave a notice in an empty sink, and hand back the error
    fn fail(&self, state: &mut RunState, reason: FailureReason, error: Error) -> Error {
        state.transition(RunPhase::Failed(reason));
        error!("Run failed ({:?}): {}", reason, error);
        if batch_writer::write_failure_notice(&state.output_path, &error.to_string()) {
            debug!("Failure notice written to {}", state.output_path.display());
        }
        error
    }

    fn progress_bar(&self) -> ProgressBar {
        if !self.config.show_progress {
            return ProgressBar::hidden();
        }

        let total = record_source::count_records(&self.config.input_path)
            .map(|total| eligible_count(total, self.config.from_row))
            .unwrap_or(0);
        let pb = ProgressBar::new(total as u64);
        if let Ok(style) = ProgressStyle::default_bar().template(PROGRESS_TEMPLATE) {
            pb.set_style(style.progress_chars(PROGRESS_CHARS));
        }
        pb
    }

    fn summarize(
        &self,
        state: &RunState,
        writer: &BatchWriter,
        log: &DiagnosticsLog,
        started: Instant,
    ) -> RunSummary {
        RunSummary {
            phase: state.phase,
            output_path: writer.path().to_path_buf(),
            log_path: (log.entries_written() > 0).then(|| log.path().to_path_buf()),
            appended_to_existing: writer.is_resuming(),
            records_read: state.records_read,
            records_skipped_before_start: state.records_skipped,
            records_written: writer.rows_written(),
            geocoded: state.geocoded_count,
            outcomes: state.outcomes.clone(),
            batches_flushed: writer.batches_flushed(),
            batches_lost: state.batches_lost,
            log_entries: log.entries_written(),
            stopped_at_ceiling: state.ceiling_reached() && !self.config.pass_through_after_ceiling,
            last_flushed_ordinal: state.last_flushed_ordinal,
            elapsed_ms: started.elapsed().as_millis(),
        }
    }
}

/// Records at or after the 1-based starting ordinal
fn eligible_count(total: usize, from_row: usize) -> usize {
    total.saturating_sub(from_row.saturating_sub(1))
}

fn flush_log(log: &mut DiagnosticsLog) {
    if let Err(e) = log.flush() {
        error!("Could not write diagnostics log: {}", e);
    }
}

fn ragged_row_entry(record: &Record, schema: &Schema) -> LogEntry {
    LogEntry::new(
        Severity::Warn,
        format!(
            "Row {}: has {} value(s) but the header has {} column(s)",
            record.ordinal(),
            record.raw_width(),
            schema.len()
        ),
    )
}
