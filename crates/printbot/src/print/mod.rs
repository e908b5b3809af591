//! Hand-off of rendered documents to the OS print subsystem.

mod lp;

use async_trait::async_trait;

use crate::error::PrintError;
use crate::render::RenderedDocument;

pub use lp::{LpPrinter, PrintMode, DEFAULT_PRINT_COMMAND};

/// Submits one document to a named printer.
///
/// Implementations report every failure as a [`PrintError`]; they never panic
/// on a timeout or a spooler rejection.
#[async_trait]
pub trait Printer: Send + Sync {
    async fn submit(
        &self,
        printer_name: &str,
        title: &str,
        document: &RenderedDocument,
    ) -> Result<(), PrintError>;
}
