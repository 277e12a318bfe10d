//! Inter-call pacing against the geocoding service's rate limit
//!
//! Pacing is a fixed delay applied only after billable (successful) calls.
//! Skips and failures return immediately, and no delay follows the final
//! record of a run.

use std::time::Duration;
use tracing::trace;

/// Fixed-window pacer for sequential lookups
#[derive(Debug, Clone, Copy)]
pub struct Pacer {
    delay: Duration,
}

impl Pacer {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    pub fn from_millis(delay_ms: u64) -> Self {
        Self::new(Duration::from_millis(delay_ms))
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Whether a delay applies after the given record
    pub fn should_wait(&self, last_outcome_was_success: bool, is_final_record: bool) -> bool {
        !self.delay.is_zero() && last_outcome_was_success && !is_final_record
    }

    /// Suspend for the configured delay when pacing applies
    ///
    /// Returns whether the caller was suspended.
    pub async fn wait_if_needed(
        &self,
        last_outcome_was_success: bool,
        is_final_record: bool,
    ) -> bool {
        if !self.should_wait(last_outcome_was_success, is_final_record) {
            return false;
        }
        trace!("Pacing for {:?}", self.delay);
        tokio::time::sleep(self.delay).await;
        true
    }
}
