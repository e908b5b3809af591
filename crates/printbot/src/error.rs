use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required settings: {}", .names.join(", "))]
    MissingSettings { names: Vec<String> },

    #[error("Invalid value for '{name}': {reason}")]
    InvalidValue { name: String, reason: String },

    #[error("Failed to resolve secret '{name}': {source}")]
    Secret {
        name: String,
        #[source]
        source: crate::secrets::SecretError,
    },
}

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Failed to build PDF: {0}")]
    Pdf(String),
}

#[derive(Error, Debug)]
pub enum PrintError {
    #[error("Failed to write spool file: {0}")]
    Spool(#[source] std::io::Error),

    #[error("Failed to start print command '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Print command timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("Print command exited with {status}: {stderr}")]
    Rejected { status: String, stderr: String },
}

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Ledger storage failure: {0}")]
    Storage(#[from] crate::db::DatabaseError),
}
