use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

use crate::db::state_database_path;
use crate::mail::graph::DEFAULT_GRAPH_BASE_URL;
use crate::mail::auth::DEFAULT_AUTHORITY_URL;
use crate::mail::{ClientCredentials, GraphSettings, RetryPolicy};
use crate::print::{PrintMode, DEFAULT_PRINT_COMMAND};

pub const DEFAULT_MAIL_FOLDER: &str = "PrintOrders";
pub const DEFAULT_PRINTED_FOLDER: &str = "Printed";
pub const DEFAULT_STATE_DIR: &str = "/var/lib/printbot";
pub const DEFAULT_POLL_SECONDS: u64 = 60;
pub const DEFAULT_ERROR_BACKOFF_SECONDS: u64 = 10;
pub const DEFAULT_BATCH_SIZE: usize = 10;
pub const DEFAULT_PRINT_TIMEOUT_SECONDS: u64 = 30;
pub const DEFAULT_HTTP_TIMEOUT_SECONDS: u64 = 30;

/// Process configuration, validated at startup.
#[derive(Debug, Clone)]
pub struct Settings {
    pub tenant_id: String,
    pub client_id: String,
    pub client_secret: SecretString,
    pub mailbox_upn: String,
    /// Display name of the folder watched for new orders.
    pub mail_folder: String,
    /// Only messages from this exact address qualify when set.
    pub filter_sender: Option<String>,
    /// Inbox child folder receiving printed messages.
    pub printed_folder: String,
    pub printer_name: String,
    pub poll_interval: Duration,
    pub error_backoff: Duration,
    pub batch_size: usize,
    pub state_dir: PathBuf,
    pub dry_run: bool,
    pub print_command: String,
    pub print_timeout: Duration,
    pub http_timeout: Duration,
    pub graph_base_url: String,
    pub authority_url: String,
}

impl Settings {
    /// Settings with defaults for everything optional.
    pub fn with_required(
        tenant_id: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: SecretString,
        mailbox_upn: impl Into<String>,
        printer_name: impl Into<String>,
    ) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            client_id: client_id.into(),
            client_secret,
            mailbox_upn: mailbox_upn.into(),
            mail_folder: DEFAULT_MAIL_FOLDER.to_string(),
            filter_sender: None,
            printed_folder: DEFAULT_PRINTED_FOLDER.to_string(),
            printer_name: printer_name.into(),
            poll_interval: Duration::from_secs(DEFAULT_POLL_SECONDS),
            error_backoff: Duration::from_secs(DEFAULT_ERROR_BACKOFF_SECONDS),
            batch_size: DEFAULT_BATCH_SIZE,
            state_dir: PathBuf::from(DEFAULT_STATE_DIR),
            dry_run: false,
            print_command: DEFAULT_PRINT_COMMAND.to_string(),
            print_timeout: Duration::from_secs(DEFAULT_PRINT_TIMEOUT_SECONDS),
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECONDS),
            graph_base_url: DEFAULT_GRAPH_BASE_URL.to_string(),
            authority_url: DEFAULT_AUTHORITY_URL.to_string(),
        }
    }

    pub fn state_db_path(&self) -> PathBuf {
        state_database_path(&self.state_dir)
    }

    pub fn print_mode(&self) -> PrintMode {
        if self.dry_run {
            PrintMode::DryRun
        } else {
            PrintMode::Live
        }
    }

    pub fn graph_settings(&self) -> GraphSettings {
        GraphSettings {
            base_url: self.graph_base_url.clone(),
            authority_url: self.authority_url.clone(),
            mailbox_upn: self.mailbox_upn.clone(),
            credentials: ClientCredentials {
                tenant_id: self.tenant_id.clone(),
                client_id: self.client_id.clone(),
                client_secret: self.client_secret.clone(),
            },
            request_timeout: self.http_timeout,
            retry: RetryPolicy::default(),
        }
    }
}
