//! Mail source error types.

use thiserror::Error;

/// Errors from the remote mail provider, classified by how the caller should react.
#[derive(Error, Debug)]
pub enum MailError {
    /// Credential acquisition failed or the provider rejected the credential.
    /// Fatal for the current call; the token is re-acquired on the next call.
    #[error("Authentication failed: {0}")]
    AuthFailure(String),

    /// Network timeout, connection failure, throttling or a 5xx response.
    #[error("Transient mail provider failure: {0}")]
    Transient(String),

    /// Request the provider will keep rejecting (bad request, not found, ...).
    #[error("Mail provider rejected request ({status}): {message}")]
    Permanent { status: u16, message: String },
}

/// Short classification label used in structured log fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MailErrorKind {
    AuthFailure,
    Transient,
    Permanent,
}

impl MailErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MailErrorKind::AuthFailure => "auth_failure",
            MailErrorKind::Transient => "transient",
            MailErrorKind::Permanent => "permanent",
        }
    }
}

impl std::fmt::Display for MailErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl MailError {
    pub fn kind(&self) -> MailErrorKind {
        match self {
            MailError::AuthFailure(_) => MailErrorKind::AuthFailure,
            MailError::Transient(_) => MailErrorKind::Transient,
            MailError::Permanent { .. } => MailErrorKind::Permanent,
        }
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, MailError::Transient(_))
    }

    /// Classifies a non-success HTTP status returned by the provider.
    pub fn from_status(status: u16, message: String) -> Self {
        match status {
            401 | 403 => MailError::AuthFailure(format!("HTTP {}: {}", status, message)),
            408 | 429 | 500..=599 => MailError::Transient(format!("HTTP {}: {}", status, message)),
            _ => MailError::Permanent { status, message },
        }
    }
}

impl From<reqwest::Error> for MailError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            return MailError::from_status(status.as_u16(), err.to_string());
        }
        if err.is_decode() {
            return MailError::Permanent {
                status: 0,
                message: format!("Undecodable provider response: {}", err),
            };
        }
        MailError::Transient(err.to_string())
    }
}

/// Result type for mail source operations.
pub type Result<T> = std::result::Result<T, MailError>;
