use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info};

use super::Printer;
use crate::error::PrintError;
use crate::render::RenderedDocument;
use crate::sanitize::preview;

/// CUPS submission command.
pub const DEFAULT_PRINT_COMMAND: &str = "lp";

/// Characters of document text shown in dry-run logs.
const DRY_RUN_PREVIEW_CHARS: usize = 100;

/// Spooler stderr kept in error messages.
const MAX_STDERR_CHARS: usize = 500;

/// Whether documents actually reach the spooler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrintMode {
    Live,
    /// Log the intended submission and report success.
    DryRun,
}

/// Printer backed by `lp`: `lp -d <printer> -o media=A4 -t <title> <file>`.
#[derive(Debug, Clone)]
pub struct LpPrinter {
    command: String,
    timeout: Duration,
    mode: PrintMode,
}

impl LpPrinter {
    pub fn new(command: impl Into<String>, timeout: Duration, mode: PrintMode) -> Self {
        Self {
            command: command.into(),
            timeout,
            mode,
        }
    }

    pub fn dry_run() -> Self {
        Self::new(DEFAULT_PRINT_COMMAND, Duration::from_secs(30), PrintMode::DryRun)
    }

    pub fn mode(&self) -> PrintMode {
        self.mode
    }

    async fn submit_live(
        &self,
        printer_name: &str,
        title: &str,
        document: &RenderedDocument,
    ) -> Result<(), PrintError> {
        // Removed when dropped, on every return path below.
        let spool = tempfile::Builder::new()
            .prefix("printbot-")
            .suffix(".pdf")
            .tempfile()
            .map_err(PrintError::Spool)?;
        tokio::fs::write(spool.path(), &document.pdf_bytes)
            .await
            .map_err(PrintError::Spool)?;

        let mut cmd = Command::new(&self.command);
        cmd.args(["-d", printer_name, "-o", "media=A4", "-t", title])
            .arg(spool.path())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = cmd.spawn().map_err(|e| PrintError::Spawn {
            command: self.command.clone(),
            source: e,
        })?;

        // On timeout the child future is dropped, which kills the process.
        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(result) => result.map_err(|e| PrintError::Spawn {
                command: self.command.clone(),
                source: e,
            })?,
            Err(_) => return Err(PrintError::Timeout(self.timeout)),
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(PrintError::Rejected {
                status: output.status.to_string(),
                stderr: preview(stderr.trim(), MAX_STDERR_CHARS),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        info!(
            printer = printer_name,
            title,
            spooler_output = stdout.trim(),
            "Submitted print job"
        );
        debug!(bytes = document.pdf_bytes.len(), "Spool file released");

        Ok(())
    }
}

#[async_trait]
impl Printer for LpPrinter {
    async fn submit(
        &self,
        printer_name: &str,
        title: &str,
        document: &RenderedDocument,
    ) -> Result<(), PrintError> {
        match self.mode {
            PrintMode::DryRun => {
                info!(
                    printer = printer_name,
                    title,
                    bytes = document.pdf_bytes.len(),
                    preview = %preview(&document.text, DRY_RUN_PREVIEW_CHARS),
                    "[DRY RUN] Would print document"
                );
                Ok(())
            }
            PrintMode::Live => self.submit_live(printer_name, title, document).await,
        }
    }
}
