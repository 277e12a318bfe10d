//! Run phases and per-run mutable state

use super::summary::OutcomeCounts;
use crate::Error;
use crate::app::models::{GeocodeOutcome, LogEntry, Record, Severity};
use crate::config::RunConfig;
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use tracing::debug;

/// Why a run ended in [`RunPhase::Failed`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FailureReason {
    FatalIngest,
    SchemaTooNarrow,
}

/// Lifecycle of a single run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RunPhase {
    Idle,
    Ingesting,
    Processing,
    Draining,
    Done,
    Failed(FailureReason),
}

impl RunPhase {
    /// Whether `next` is a legal successor of this phase
    pub fn allows(&self, next: RunPhase) -> bool {
        use RunPhase::*;
        match (self, next) {
            (Done | Failed(_), _) => false,
            (_, Failed(_)) => true,
            (Idle, Ingesting) => true,
            // Degenerate inputs complete straight from ingestion
            (Ingesting, Processing | Done) => true,
            (Processing, Draining | Done) => true,
            (Draining, Done) => true,
            _ => false,
        }
    }
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunPhase::Failed(reason) => write!(f, "Failed({:?})", reason),
            other => write!(f, "{:?}", other),
        }
    }
}

/// State owned by the orchestrator for the lifetime of one run
#[derive(Debug)]
pub struct RunState {
    pub phase: RunPhase,
    /// Effective starting ordinal (0 skips none)
    pub from_row: usize,
    /// Output path after any resume suffix
    pub output_path: PathBuf,
    pub ceiling: Option<usize>,
    /// Attempts counted against the ceiling
    pub geocoded_count: usize,
    pub pending_output: Vec<Record>,
    pub records_read: usize,
    pub records_skipped: usize,
    pub outcomes: OutcomeCounts,
    pub batches_lost: usize,
    pub last_flushed_ordinal: Option<usize>,
}

impl RunState {
    pub fn new(config: &RunConfig) -> Self {
        Self {
            phase: RunPhase::Idle,
            from_row: config.from_row,
            output_path: config.effective_output_path(),
            ceiling: config.ceiling(),
            geocoded_count: 0,
            pending_output: Vec::with_capacity(config.batch_size),
            records_read: 0,
            records_skipped: 0,
            outcomes: OutcomeCounts::default(),
            batches_lost: 0,
            last_flushed_ordinal: None,
        }
    }

    pub fn transition(&mut self, next: RunPhase) {
        debug_assert!(
            self.phase.allows(next),
            "illegal run transition {} -> {}",
            self.phase,
            next
        );
        debug!("Run phase {} -> {}", self.phase, next);
        self.phase = next;
    }

    /// Records before the starting ordinal are not processed or copied
    pub fn is_before_start(&self, record: &Record) -> bool {
        record.ordinal() < self.from_row
    }

    pub fn ceiling_reached(&self) -> bool {
        self.ceiling
            .is_some_and(|ceiling| self.geocoded_count >= ceiling)
    }

    /// Count an outcome, returning whether it just reached the ceiling
    pub fn record_outcome(&mut self, outcome: &GeocodeOutcome) -> bool {
        self.outcomes.record(outcome);
        if !outcome.counts_toward_ceiling() {
            return false;
        }
        self.geocoded_count += 1;
        self.ceiling_reached()
    }

    pub fn batch_is_full(&self, batch_size: usize) -> bool {
        self.pending_output.len() >= batch_size
    }
}

/// Ordinal range of a pending batch for log messages
pub fn batch_span(batch: &[Record]) -> Option<(usize, usize)> {
    Some((batch.first()?.ordinal(), batch.last()?.ordinal()))
}

/// Entry recorded when an output batch could not be written
pub fn lost_batch_entry(span: Option<(usize, usize)>, error: &Error) -> LogEntry {
    let rows = match span {
        Some((first, last)) if first == last => format!("row {}", first),
        Some((first, last)) => format!("rows {}-{}", first, last),
        None => "empty batch".to_string(),
    };
    LogEntry::new(
        Severity::Error,
        format!(
            "Failed to write {}: {}. Batch contents are presumed lost; rerun with --from-row {}",
            rows,
            error,
            span.map(|(first, _)| first).unwrap_or(1)
        ),
    )
}
