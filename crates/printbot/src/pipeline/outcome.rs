use super::error::PipelineError;

/// Terminal state of one candidate within a cycle.
#[derive(Debug)]
pub enum MessageOutcome {
    /// Ledger already holds the id.
    Skipped,
    /// Printed, moved and committed.
    Printed,
    /// Left in the source folder; retried next cycle.
    Failed(PipelineError),
}

/// What the poll loop does after a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Sleep for the poll interval.
    Continue,
    /// The cycle itself failed; sleep for the error backoff.
    Backoff,
    /// Stop was requested.
    Shutdown,
}

impl CycleOutcome {
    /// True when the cycle could not list or resolve the mailbox.
    pub fn is_failure(&self) -> bool {
        matches!(self, CycleOutcome::Backoff)
    }
}

/// Per-cycle counters, logged once at the end of every cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CycleReport {
    pub candidates: usize,
    pub printed: usize,
    pub skipped: usize,
    pub failed: usize,
    /// Failures after the printer accepted the job. These will print twice.
    pub duplicate_risk: usize,
}

impl CycleReport {
    pub fn record(&mut self, outcome: &MessageOutcome) {
        match outcome {
            MessageOutcome::Skipped => self.skipped += 1,
            MessageOutcome::Printed => self.printed += 1,
            MessageOutcome::Failed(err) => {
                self.failed += 1;
                if err.printed() {
                    self.duplicate_risk += 1;
                }
            }
        }
    }

    /// Number of candidates that reached a terminal outcome.
    pub fn handled(&self) -> usize {
        self.printed + self.skipped + self.failed
    }
}
