pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod folders;
pub mod inspect;
pub mod ledger;
pub mod mail;
pub mod pipeline;
pub mod print;
pub mod render;
pub mod sanitize;
pub mod secrets;
pub mod telemetry;

pub use config::{load_settings, Settings};
pub use error::{ConfigError, LedgerError, PrintError, RenderError};
pub use ledger::{Ledger, SqliteLedger};
pub use mail::{GraphMailSource, MailError, MailSource, Message};
pub use pipeline::{CycleOutcome, Ingestor, MessageOutcome, PipelineConfig};
pub use print::{LpPrinter, PrintMode, Printer};
pub use render::{PdfRenderer, RenderedDocument, Renderer};
pub use secrets::{resolve_secret, SecretError};
