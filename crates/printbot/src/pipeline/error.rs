use thiserror::Error;

use crate::error::{LedgerError, PrintError, RenderError};
use crate::mail::MailError;

/// Why one message did not reach the committed state.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Ledger lookup failed: {0}")]
    LedgerLookup(#[source] LedgerError),

    #[error("Rendering failed: {0}")]
    Render(#[from] RenderError),

    #[error("Print submission failed: {0}")]
    Print(#[from] PrintError),

    /// Printed but still in the source folder; it will be printed again.
    #[error("Move to acknowledgment folder failed after printing: {0}")]
    Acknowledge(#[source] MailError),

    /// Printed and moved but not recorded.
    #[error("Ledger commit failed after printing and moving: {0}")]
    Commit(#[source] LedgerError),
}

impl PipelineError {
    /// Short label used in structured log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::LedgerLookup(_) | PipelineError::Commit(_) => "ledger_failure",
            PipelineError::Render(_) => "render_failure",
            PipelineError::Print(_) => "print_failure",
            PipelineError::Acknowledge(err) => err.kind().as_str(),
        }
    }

    /// True when paper may already have come out of the printer.
    pub fn printed(&self) -> bool {
        matches!(
            self,
            PipelineError::Acknowledge(_) | PipelineError::Commit(_)
        )
    }
}

/// Why a whole poll cycle was abandoned.
#[derive(Error, Debug)]
pub enum CycleError {
    #[error("Failed to resolve folder '{name}': {source}")]
    ResolveFolder {
        name: String,
        #[source]
        source: MailError,
    },

    #[error("Failed to list candidate messages: {0}")]
    ListCandidates(#[source] MailError),
}
