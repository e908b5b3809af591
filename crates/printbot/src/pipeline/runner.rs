use std::sync::Arc;

use chrono::Utc;
use tokio::sync::watch;
use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::ledger::Ledger;
use crate::mail::{FolderId, MailError, MailSource, Message};
use crate::print::Printer;
use crate::render::Renderer;
use crate::sanitize;

use super::config::{PipelineConfig, INBOX_FOLDER};
use super::error::{CycleError, PipelineError};
use super::outcome::{CycleOutcome, CycleReport, MessageOutcome};

/// Folder ids resolved once and reused until a cycle fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedFolders {
    pub source: FolderId,
    pub printed: FolderId,
}

/// Drives candidates through ledger check, render, print, move and commit.
///
/// A message is committed only after the provider confirmed the move. Any
/// failure before that leaves it unread in the source folder, so it is picked
/// up again on the next cycle, possibly printing twice.
pub struct Ingestor {
    config: Arc<PipelineConfig>,
    source: Arc<dyn MailSource>,
    renderer: Arc<dyn Renderer>,
    printer: Arc<dyn Printer>,
    ledger: Arc<dyn Ledger>,
    folders: Option<ResolvedFolders>,
    cycles: u64,
}

impl Ingestor {
    pub fn new(
        config: Arc<PipelineConfig>,
        source: Arc<dyn MailSource>,
        renderer: Arc<dyn Renderer>,
        printer: Arc<dyn Printer>,
        ledger: Arc<dyn Ledger>,
    ) -> Self {
        Self {
            config,
            source,
            renderer,
            printer,
            ledger,
            folders: None,
            cycles: 0,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Currently cached folder ids, if any.
    pub fn folders(&self) -> Option<&ResolvedFolders> {
        self.folders.as_ref()
    }

    async fn ensure_folders(&mut self) -> Result<ResolvedFolders, CycleError> {
        if let Some(folders) = &self.folders {
            return Ok(folders.clone());
        }

        let resolve = |name: &str, source: MailError| CycleError::ResolveFolder {
            name: name.to_string(),
            source,
        };

        let source = self
            .source
            .resolve_folder(&self.config.source_folder)
            .await
            .map_err(|e| resolve(&self.config.source_folder, e))?;
        let inbox = self
            .source
            .resolve_folder(INBOX_FOLDER)
            .await
            .map_err(|e| resolve(INBOX_FOLDER, e))?;
        let printed = self
            .source
            .get_or_create_child_folder(&inbox, &self.config.printed_folder)
            .await
            .map_err(|e| resolve(&self.config.printed_folder, e))?;

        info!(
            source_folder = %self.config.source_folder,
            printed_folder = %format!("{}/{}", INBOX_FOLDER, self.config.printed_folder),
            "Mail folders resolved"
        );

        let folders = ResolvedFolders { source, printed };
        self.folders = Some(folders.clone());
        Ok(folders)
    }

    /// Runs one poll cycle.
    ///
    /// A stop request is honored between messages; the message in flight is
    /// finished first.
    pub async fn run_cycle(&mut self, shutdown: &watch::Receiver<bool>) -> (CycleOutcome, CycleReport) {
        self.cycles += 1;
        let span = info_span!("cycle", cycle = self.cycles);
        self.run_cycle_inner(shutdown).instrument(span).await
    }

    async fn run_cycle_inner(&mut self, shutdown: &watch::Receiver<bool>) -> (CycleOutcome, CycleReport) {
        let mut report = CycleReport::default();

        let candidates = match self.fetch_candidates().await {
            Ok(candidates) => candidates,
            Err(err) => {
                let error_kind = match &err {
                    CycleError::ResolveFolder { source, .. } | CycleError::ListCandidates(source) => {
                        source.kind()
                    }
                };
                error!(error_kind = %error_kind, error = %err, "Poll cycle failed");
                // Folder ids may be stale; resolve them again next time.
                self.folders = None;
                return (CycleOutcome::Backoff, report);
            }
        };

        report.candidates = candidates.len();
        let printed_folder = match &self.folders {
            Some(folders) => folders.printed.clone(),
            None => return (CycleOutcome::Backoff, report),
        };

        let mut outcome = CycleOutcome::Continue;
        for message in &candidates {
            if *shutdown.borrow() {
                info!(
                    remaining = report.candidates - report.handled(),
                    "Stop requested, leaving remaining candidates for next run"
                );
                outcome = CycleOutcome::Shutdown;
                break;
            }
            let result = self.process_message(message, &printed_folder).await;
            report.record(&result);
        }

        if report.candidates > 0 {
            info!(
                candidates = report.candidates,
                printed = report.printed,
                skipped = report.skipped,
                failed = report.failed,
                duplicate_risk = report.duplicate_risk,
                "Cycle complete"
            );
        } else {
            debug!("No candidates");
        }

        (outcome, report)
    }

    async fn fetch_candidates(&mut self) -> Result<Vec<Message>, CycleError> {
        let folders = self.ensure_folders().await?;
        self.source
            .list_unread(
                &folders.source,
                self.config.sender_filter.as_deref(),
                self.config.batch_size,
            )
            .await
            .map_err(CycleError::ListCandidates)
    }

    /// Drives one message to a terminal outcome. Never panics or propagates.
    pub async fn process_message(&self, message: &Message, printed_folder: &FolderId) -> MessageOutcome {
        let span = info_span!(
            "message",
            message_id = %sanitize::truncate_id(message.stable_id()),
            subject = %message.subject,
        );
        async {
            match self.deliver(message, printed_folder).await {
                Ok(outcome) => outcome,
                Err(err) => {
                    self.log_failure(&err);
                    MessageOutcome::Failed(err)
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn deliver(
        &self,
        message: &Message,
        printed_folder: &FolderId,
    ) -> Result<MessageOutcome, PipelineError> {
        let id = message.stable_id();
        if message.uses_local_id() {
            warn!(
                local_id = %sanitize::truncate_id(&message.id),
                "Message has no stable identifier, deduplicating on mailbox-local id"
            );
        }

        if self.ledger.has(id).map_err(PipelineError::LedgerLookup)? {
            info!("Already printed, skipping");
            return Ok(MessageOutcome::Skipped);
        }

        let document = self.renderer.render(message)?;
        debug!(bytes = document.pdf_bytes.len(), "Rendered document");

        self.printer
            .submit(&self.config.printer_name, &document.title, &document)
            .await?;

        self.source
            .move_message(&message.id, printed_folder)
            .await
            .map_err(PipelineError::Acknowledge)?;

        self.ledger
            .commit(id, Utc::now())
            .map_err(PipelineError::Commit)?;

        info!(sender = %message.sender, "Printed and acknowledged");
        Ok(MessageOutcome::Printed)
    }

    fn log_failure(&self, err: &PipelineError) {
        match err {
            PipelineError::Acknowledge(_) => error!(
                error_kind = err.kind(),
                error = %err,
                "Printed but not moved; message stays unread and will be printed again"
            ),
            PipelineError::Commit(_) => error!(
                error_kind = err.kind(),
                error = %err,
                "Printed and moved but not recorded; a duplicate print is possible"
            ),
            PipelineError::LedgerLookup(_) => error!(
                error_kind = err.kind(),
                error = %err,
                "Ledger unavailable, message left for next cycle"
            ),
            PipelineError::Render(_) | PipelineError::Print(_) => warn!(
                error_kind = err.kind(),
                error = %err,
                "Message not printed, will retry next cycle"
            ),
        }
    }
}
