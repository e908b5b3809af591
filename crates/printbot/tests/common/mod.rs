//! Test doubles for the ingestion pipeline.
//!
//! - `FakeMailSource`: in-memory mailbox with folders, unread flags and
//!   injectable move, list and credential failures
//! - `RecordingPrinter`: captures submissions, optionally failing them
//! - `CountingRenderer` / `FailingRenderer`: observe or break rendering
//! - `FailingLedger`: SQLite ledger whose lookups or commits can be broken
//! - `Harness`: wires the fakes and a SQLite ledger into an `Ingestor`

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tempfile::TempDir;

use printbot::db::{Database, DatabaseError};
use printbot::mail::{ContentType, FolderId, MailError, MailFolder, MailSource, Message};
use printbot::pipeline::{CycleOutcome, CycleReport, Ingestor, PipelineConfig};
use printbot::{
    Ledger, LedgerError, PdfRenderer, PrintError, Printer, RenderError, RenderedDocument, Renderer,
    SqliteLedger,
};

pub const SOURCE_FOLDER: &str = "PrintOrders";
pub const PRINTED_FOLDER: &str = "Printed";
pub const PRINTER: &str = "Office";

/// Builds a plain-text candidate whose stable id is `id`.
pub fn text_message(id: &str, subject: &str, body: &str) -> Message {
    Message {
        id: format!("local-{}", id),
        internet_message_id: Some(id.to_string()),
        subject: subject.to_string(),
        sender: "orders@shop.example".to_string(),
        received: "2026-03-14T09:26:53Z".to_string(),
        content_type: ContentType::Text,
        body: body.to_string(),
        body_preview: String::new(),
    }
}

#[derive(Debug, Clone)]
struct StoredMessage {
    folder: FolderId,
    message: Message,
    is_read: bool,
}

#[derive(Default)]
struct MailboxState {
    folders: HashMap<String, FolderId>,
    messages: Vec<StoredMessage>,
    moves: Vec<(String, FolderId)>,
    move_failures: usize,
    list_failures: usize,
    list_auth_failures: usize,
    resolve_auth_failures: usize,
    resolve_calls: usize,
}

/// In-memory mailbox.
pub struct FakeMailSource {
    state: Mutex<MailboxState>,
}

impl FakeMailSource {
    pub fn new() -> Self {
        let mut folders = HashMap::new();
        folders.insert("Inbox".to_string(), FolderId::new("folder-inbox"));
        folders.insert(SOURCE_FOLDER.to_string(), FolderId::new("folder-source"));
        Self {
            state: Mutex::new(MailboxState {
                folders,
                ..Default::default()
            }),
        }
    }

    pub fn source_folder() -> FolderId {
        FolderId::new("folder-source")
    }

    /// Delivers an unread message into the watched folder.
    pub fn deliver(&self, message: Message) {
        self.state.lock().unwrap().messages.push(StoredMessage {
            folder: Self::source_folder(),
            message,
            is_read: false,
        });
    }

    /// Makes the next `count` move calls fail transiently.
    pub fn fail_next_moves(&self, count: usize) {
        self.state.lock().unwrap().move_failures = count;
    }

    /// Makes the next `count` list calls fail transiently.
    pub fn fail_next_lists(&self, count: usize) {
        self.state.lock().unwrap().list_failures = count;
    }

    /// Makes the next `count` list calls fail with rejected credentials.
    pub fn reject_next_lists(&self, count: usize) {
        self.state.lock().unwrap().list_auth_failures = count;
    }

    /// Makes the next `count` folder resolutions fail with rejected credentials.
    pub fn reject_next_resolves(&self, count: usize) {
        self.state.lock().unwrap().resolve_auth_failures = count;
    }

    /// Successful moves as (local id, destination).
    pub fn moves(&self) -> Vec<(String, FolderId)> {
        self.state.lock().unwrap().moves.clone()
    }

    pub fn resolve_calls(&self) -> usize {
        self.state.lock().unwrap().resolve_calls
    }

    /// Local ids of unread messages still in the watched folder.
    pub fn unread_in_source(&self) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .messages
            .iter()
            .filter(|m| m.folder == Self::source_folder() && !m.is_read)
            .map(|m| m.message.id.clone())
            .collect()
    }

    pub fn folder_of(&self, local_id: &str) -> Option<FolderId> {
        self.state
            .lock()
            .unwrap()
            .messages
            .iter()
            .find(|m| m.message.id == local_id)
            .map(|m| m.folder.clone())
    }
}

#[async_trait]
impl MailSource for FakeMailSource {
    async fn resolve_folder(&self, display_name: &str) -> Result<FolderId, MailError> {
        let mut state = self.state.lock().unwrap();
        state.resolve_calls += 1;
        if state.resolve_auth_failures > 0 {
            state.resolve_auth_failures -= 1;
            return Err(rejected_token());
        }
        Ok(state
            .folders
            .get(display_name)
            .or_else(|| state.folders.get("Inbox"))
            .cloned()
            .unwrap_or_else(|| FolderId::new("folder-inbox")))
    }

    async fn get_or_create_child_folder(
        &self,
        parent: &FolderId,
        display_name: &str,
    ) -> Result<FolderId, MailError> {
        let mut state = self.state.lock().unwrap();
        let key = format!("{}/{}", parent, display_name);
        let id = state
            .folders
            .entry(key)
            .or_insert_with(|| FolderId::new(format!("folder-{}", display_name.to_lowercase())))
            .clone();
        Ok(id)
    }

    async fn list_unread(
        &self,
        folder: &FolderId,
        sender: Option<&str>,
        limit: usize,
    ) -> Result<Vec<Message>, MailError> {
        let mut state = self.state.lock().unwrap();
        if state.list_failures > 0 {
            state.list_failures -= 1;
            return Err(MailError::Transient("HTTP 503: unavailable".to_string()));
        }
        if state.list_auth_failures > 0 {
            state.list_auth_failures -= 1;
            return Err(rejected_token());
        }
        Ok(state
            .messages
            .iter()
            .filter(|m| &m.folder == folder && !m.is_read)
            .filter(|m| sender.map_or(true, |s| m.message.sender == s))
            .take(limit)
            .map(|m| m.message.clone())
            .collect())
    }

    async fn move_message(&self, message_id: &str, destination: &FolderId) -> Result<(), MailError> {
        let mut state = self.state.lock().unwrap();
        if state.move_failures > 0 {
            state.move_failures -= 1;
            return Err(MailError::Transient("HTTP 504: gateway timeout".to_string()));
        }
        let stored = state
            .messages
            .iter_mut()
            .find(|m| m.message.id == message_id)
            .ok_or_else(|| MailError::Permanent {
                status: 404,
                message: format!("message {} not found", message_id),
            })?;
        stored.folder = destination.clone();
        state
            .moves
            .push((message_id.to_string(), destination.clone()));
        Ok(())
    }

    async fn list_folders(&self) -> Result<Vec<MailFolder>, MailError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .folders
            .iter()
            .filter(|(name, _)| !name.contains('/'))
            .map(|(name, id)| MailFolder {
                id: id.to_string(),
                display_name: name.clone(),
                unread_item_count: None,
                total_item_count: None,
                child_folder_count: None,
            })
            .collect())
    }

    async fn list_child_folders(&self, parent: &FolderId) -> Result<Vec<MailFolder>, MailError> {
        let state = self.state.lock().unwrap();
        let prefix = format!("{}/", parent);
        Ok(state
            .folders
            .iter()
            .filter_map(|(key, id)| {
                key.strip_prefix(&prefix).map(|name| MailFolder {
                    id: id.to_string(),
                    display_name: name.to_string(),
                    unread_item_count: None,
                    total_item_count: None,
                    child_folder_count: None,
                })
            })
            .collect())
    }
}

fn rejected_token() -> MailError {
    MailError::AuthFailure("HTTP 401: InvalidAuthenticationToken".to_string())
}

/// A captured print submission.
#[derive(Debug, Clone)]
pub struct Submission {
    pub printer: String,
    pub title: String,
    pub text: String,
    pub pdf_len: usize,
}

/// Printer that records submissions instead of printing.
#[derive(Default)]
pub struct RecordingPrinter {
    submissions: Mutex<Vec<Submission>>,
    failures: AtomicUsize,
}

impl RecordingPrinter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next `count` submissions fail with a spooler rejection.
    pub fn fail_next(&self, count: usize) {
        self.failures.store(count, Ordering::SeqCst);
    }

    pub fn submissions(&self) -> Vec<Submission> {
        self.submissions.lock().unwrap().clone()
    }

    pub fn count(&self) -> usize {
        self.submissions.lock().unwrap().len()
    }
}

#[async_trait]
impl Printer for RecordingPrinter {
    async fn submit(
        &self,
        printer_name: &str,
        title: &str,
        document: &RenderedDocument,
    ) -> Result<(), PrintError> {
        let failing = self
            .failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(PrintError::Rejected {
                status: "exit status: 1".to_string(),
                stderr: "lp: printer is offline".to_string(),
            });
        }

        self.submissions.lock().unwrap().push(Submission {
            printer: printer_name.to_string(),
            title: title.to_string(),
            text: document.text.clone(),
            pdf_len: document.pdf_bytes.len(),
        });
        Ok(())
    }
}

/// Real renderer that counts its calls.
#[derive(Default)]
pub struct CountingRenderer {
    inner: PdfRenderer,
    calls: AtomicUsize,
}

impl CountingRenderer {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Renderer for CountingRenderer {
    fn render(&self, message: &Message) -> Result<RenderedDocument, RenderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.render(message)
    }
}

/// Renderer that always fails.
pub struct FailingRenderer;

impl Renderer for FailingRenderer {
    fn render(&self, _message: &Message) -> Result<RenderedDocument, RenderError> {
        Err(RenderError::Pdf("simulated failure".to_string()))
    }
}

/// SQLite ledger with switchable storage failures.
pub struct FailingLedger {
    inner: SqliteLedger,
    lookups_fail: AtomicBool,
    commit_failures: AtomicUsize,
}

impl FailingLedger {
    pub fn new(inner: SqliteLedger) -> Self {
        Self {
            inner,
            lookups_fail: AtomicBool::new(false),
            commit_failures: AtomicUsize::new(0),
        }
    }

    /// Makes every lookup fail until switched off.
    pub fn fail_lookups(&self, failing: bool) {
        self.lookups_fail.store(failing, Ordering::SeqCst);
    }

    /// Makes the next `count` commits fail.
    pub fn fail_next_commits(&self, count: usize) {
        self.commit_failures.store(count, Ordering::SeqCst);
    }
}

impl Ledger for FailingLedger {
    fn has(&self, id: &str) -> Result<bool, LedgerError> {
        if self.lookups_fail.load(Ordering::SeqCst) {
            return Err(LedgerError::Storage(DatabaseError::LockPoisoned));
        }
        self.inner.has(id)
    }

    fn commit(&self, id: &str, at: DateTime<Utc>) -> Result<(), LedgerError> {
        let failing = self
            .commit_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(LedgerError::Storage(DatabaseError::LockPoisoned));
        }
        self.inner.commit(id, at)
    }
}

pub fn pipeline_config() -> PipelineConfig {
    PipelineConfig {
        source_folder: SOURCE_FOLDER.to_string(),
        printed_folder: PRINTED_FOLDER.to_string(),
        sender_filter: None,
        printer_name: PRINTER.to_string(),
        batch_size: 10,
        poll_interval: Duration::from_millis(20),
        error_backoff: Duration::from_millis(20),
    }
}

/// Fakes plus an on-disk ledger, wired into an `Ingestor`.
pub struct Harness {
    pub state_dir: TempDir,
    pub source: Arc<FakeMailSource>,
    pub printer: Arc<RecordingPrinter>,
    pub renderer: Arc<CountingRenderer>,
    pub ledger: SqliteLedger,
    pub ingestor: Ingestor,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(pipeline_config())
    }

    pub fn with_config(config: PipelineConfig) -> Self {
        let state_dir = TempDir::new().expect("Failed to create temp directory");
        let ledger = open_ledger(state_dir.path());
        let source = Arc::new(FakeMailSource::new());
        let printer = Arc::new(RecordingPrinter::new());
        let renderer = Arc::new(CountingRenderer::default());

        let ingestor = Ingestor::new(
            Arc::new(config),
            source.clone(),
            renderer.clone(),
            printer.clone(),
            Arc::new(ledger.clone()),
        );

        Self {
            state_dir,
            source,
            printer,
            renderer,
            ledger,
            ingestor,
        }
    }

    /// Runs one cycle without a stop request.
    pub async fn cycle(&mut self) -> (CycleOutcome, CycleReport) {
        let (_tx, rx) = printbot::pipeline::shutdown_channel();
        self.ingestor.run_cycle(&rx).await
    }

    pub fn ledger_has(&self, id: &str) -> bool {
        self.ledger.has(id).expect("ledger lookup")
    }

    pub fn printed_folder(&self) -> FolderId {
        self.ingestor
            .folders()
            .map(|f| f.printed.clone())
            .expect("folders resolved")
    }
}

pub fn open_ledger(state_dir: &Path) -> SqliteLedger {
    let db = Database::open(&printbot::db::state_database_path(state_dir))
        .expect("Failed to open ledger");
    SqliteLedger::new(db)
}
