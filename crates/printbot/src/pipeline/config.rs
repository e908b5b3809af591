use std::time::Duration;

use crate::config::Settings;

/// Folder name used to locate the inbox.
pub const INBOX_FOLDER: &str = "Inbox";

/// What the ingestion loop watches, where it acknowledges and how often.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub source_folder: String,
    pub printed_folder: String,
    pub sender_filter: Option<String>,
    pub printer_name: String,
    pub batch_size: usize,
    pub poll_interval: Duration,
    pub error_backoff: Duration,
}

impl PipelineConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            source_folder: settings.mail_folder.clone(),
            printed_folder: settings.printed_folder.clone(),
            sender_filter: settings.filter_sender.clone(),
            printer_name: settings.printer_name.clone(),
            batch_size: settings.batch_size,
            poll_interval: settings.poll_interval,
            error_backoff: settings.error_backoff,
        }
    }
}
