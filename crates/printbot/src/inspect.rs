//! Read-only view of the print ledger.
//!
//! Opens the state file without write access, so it can run next to a
//! live worker.

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::DateTime;

use crate::db::printed_repo::{self, PrintedRow};
use crate::db::{Database, DatabaseError};
use crate::sanitize::truncate_id;

/// Snapshot of the ledger, optionally narrowed by a search term.
#[derive(Debug, Clone)]
pub struct LedgerReport {
    pub db_path: PathBuf,
    pub schema: Option<String>,
    pub search: Option<String>,
    /// Most recent first.
    pub rows: Vec<PrintedRow>,
}

/// Loads every entry, or those whose id contains `search`.
pub fn load_report(db_path: &Path, search: Option<&str>) -> Result<LedgerReport, DatabaseError> {
    let db = Database::open_read_only(db_path)?;
    let schema = printed_repo::table_schema(&db)?;
    let rows = match search {
        Some(term) => printed_repo::search(&db, term)?,
        None => printed_repo::list_recent(&db)?,
    };

    Ok(LedgerReport {
        db_path: db_path.to_path_buf(),
        schema,
        search: search.map(str::to_string),
        rows,
    })
}

/// Formats a stored timestamp as `YYYY-MM-DD HH:MM:SS UTC`, or returns it unchanged.
pub fn display_timestamp(raw: &str) -> String {
    match DateTime::parse_from_rfc3339(raw) {
        Ok(dt) => dt
            .with_timezone(&chrono::Utc)
            .format("%Y-%m-%d %H:%M:%S UTC")
            .to_string(),
        Err(_) => raw.to_string(),
    }
}

/// Writes a human-readable report.
pub fn write_report<W: Write>(report: &LedgerReport, out: &mut W) -> io::Result<()> {
    let rule = "=".repeat(80);
    writeln!(out, "{}", rule)?;
    writeln!(out, "Ledger: {}", report.db_path.display())?;
    writeln!(out, "{}", rule)?;

    match &report.search {
        Some(term) => {
            writeln!(out, "Search: {}", term)?;
            if report.rows.is_empty() {
                writeln!(out, "No matching messages found.")?;
                return Ok(());
            }
            writeln!(out, "Found {} matching message(s):", report.rows.len())?;
            writeln!(out)?;
            for row in &report.rows {
                writeln!(out, "Message ID: {}", row.id)?;
                writeln!(out, "Printed at: {}", display_timestamp(&row.printed_utc))?;
                writeln!(out)?;
            }
        }
        None => {
            if let Some(schema) = &report.schema {
                writeln!(out, "Table schema:")?;
                writeln!(out, "{}", schema)?;
                writeln!(out)?;
            }
            writeln!(out, "Total messages printed: {}", report.rows.len())?;
            if report.rows.is_empty() {
                writeln!(out, "No messages have been printed yet.")?;
                return Ok(());
            }
            writeln!(out)?;
            for (idx, row) in report.rows.iter().enumerate() {
                writeln!(out, "{:3}. {}", idx + 1, display_timestamp(&row.printed_utc))?;
                writeln!(out, "     ID: {}", truncate_id(&row.id))?;
            }
        }
    }

    writeln!(out, "{}", rule)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{Ledger, SqliteLedger};
    use chrono::{TimeZone, Utc};

    fn seeded(dir: &Path) -> PathBuf {
        let path = dir.join("state.db");
        let ledger = SqliteLedger::new(Database::open(&path).unwrap());
        ledger
            .commit("<order-41@shop.example>", Utc.with_ymd_and_hms(2026, 3, 13, 8, 0, 0).unwrap())
            .unwrap();
        ledger
            .commit("<order-42@shop.example>", Utc.with_ymd_and_hms(2026, 3, 14, 9, 26, 53).unwrap())
            .unwrap();
        path
    }

    #[test]
    fn test_display_timestamp() {
        assert_eq!(
            display_timestamp("2026-03-14T09:26:53.000000Z"),
            "2026-03-14 09:26:53 UTC"
        );
        assert_eq!(display_timestamp("yesterday"), "yesterday");
    }

    #[test]
    fn test_listing_most_recent_first() {
        let dir = tempfile::tempdir().unwrap();
        let path = seeded(dir.path());

        let report = load_report(&path, None).unwrap();
        assert_eq!(report.rows.len(), 2);
        assert_eq!(report.rows[0].id, "<order-42@shop.example>");
        assert!(report.schema.is_some());

        let mut out = Vec::new();
        write_report(&report, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("Total messages printed: 2"));
        assert!(text.contains("  1. 2026-03-14 09:26:53 UTC"));
    }

    #[test]
    fn test_search() {
        let dir = tempfile::tempdir().unwrap();
        let path = seeded(dir.path());

        let report = load_report(&path, Some("order-41")).unwrap();
        assert_eq!(report.rows.len(), 1);

        let mut out = Vec::new();
        write_report(&report, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("Found 1 matching message(s)"));
        assert!(text.contains("Message ID: <order-41@shop.example>"));

        let empty = load_report(&path, Some("nope")).unwrap();
        let mut out = Vec::new();
        write_report(&empty, &mut out).unwrap();
        assert!(String::from_utf8(out).unwrap().contains("No matching messages found."));
    }

    #[test]
    fn test_missing_database() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_report(&dir.path().join("absent.db"), None).unwrap_err();
        assert!(matches!(err, DatabaseError::NotFound(_)));
    }
}
