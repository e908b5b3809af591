//! Durable record of messages that were printed and acknowledged.

use chrono::{DateTime, SecondsFormat, Utc};
use log::debug;

use crate::db::{printed_repo, Database};
use crate::error::LedgerError;

/// Append-only store answering "was this message already handled?".
///
/// Implementations must make `commit` idempotent and keep `has` consistent
/// with commits made by other handles to the same store.
pub trait Ledger: Send + Sync {
    /// Returns true iff a commit for `id` exists.
    fn has(&self, id: &str) -> Result<bool, LedgerError>;

    /// Records `id` as completed at `at`. Committing an existing id is a no-op.
    fn commit(&self, id: &str, at: DateTime<Utc>) -> Result<(), LedgerError>;
}

/// SQLite-backed ledger.
#[derive(Clone)]
pub struct SqliteLedger {
    db: Database,
}

impl SqliteLedger {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Number of committed entries.
    pub fn len(&self) -> Result<u64, LedgerError> {
        Ok(printed_repo::count(&self.db)?)
    }

    pub fn is_empty(&self) -> Result<bool, LedgerError> {
        Ok(self.len()? == 0)
    }
}

impl Ledger for SqliteLedger {
    fn has(&self, id: &str) -> Result<bool, LedgerError> {
        Ok(printed_repo::exists(&self.db, id)?)
    }

    fn commit(&self, id: &str, at: DateTime<Utc>) -> Result<(), LedgerError> {
        let row = printed_repo::PrintedRow {
            id: id.to_string(),
            printed_utc: at.to_rfc3339_opts(SecondsFormat::Micros, true),
        };

        if printed_repo::insert(&self.db, &row)? {
            debug!("Committed '{}' to ledger", id);
        } else {
            debug!("Ledger already contains '{}', commit ignored", id);
        }

        Ok(())
    }
}
