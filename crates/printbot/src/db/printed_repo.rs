//! Repository for the append-only `printed` table.

use rusqlite::{params, Row};

use super::{Database, DatabaseError};

/// A raw ledger row from the database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrintedRow {
    pub id: String,
    pub printed_utc: String,
}

fn map_row(row: &Row<'_>) -> rusqlite::Result<PrintedRow> {
    Ok(PrintedRow {
        id: row.get(0)?,
        printed_utc: row.get(1)?,
    })
}

/// Inserts a completion record. Inserting an id that already exists is a no-op.
/// Returns true if a new row was written.
pub fn insert(db: &Database, row: &PrintedRow) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let changed = conn.execute(
            "INSERT OR IGNORE INTO printed (id, printed_utc) VALUES (?1, ?2)",
            params![row.id, row.printed_utc],
        )?;
        Ok(changed > 0)
    })
}

/// Returns true if a record for `id` exists.
pub fn exists(db: &Database, id: &str) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare_cached("SELECT 1 FROM printed WHERE id = ?1")?;
        Ok(stmt.exists(params![id])?)
    })
}

/// Finds a single record by id.
pub fn find(db: &Database, id: &str) -> Result<Option<PrintedRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare("SELECT id, printed_utc FROM printed WHERE id = ?1")?;
        let mut rows = stmt.query_map(params![id], map_row)?;
        match rows.next() {
            Some(Ok(row)) => Ok(Some(row)),
            Some(Err(e)) => Err(DatabaseError::Sqlite(e)),
            None => Ok(None),
        }
    })
}

/// Lists all records, most recent first.
pub fn list_recent(db: &Database) -> Result<Vec<PrintedRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt =
            conn.prepare("SELECT id, printed_utc FROM printed ORDER BY printed_utc DESC, id")?;
        let rows = stmt
            .query_map([], map_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}

/// Finds records whose id contains `term` (case-sensitive substring match).
pub fn search(db: &Database, term: &str) -> Result<Vec<PrintedRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare(
            "SELECT id, printed_utc FROM printed WHERE instr(id, ?1) > 0
             ORDER BY printed_utc DESC, id",
        )?;
        let rows = stmt
            .query_map(params![term], map_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}

/// Counts all records.
pub fn count(db: &Database) -> Result<u64, DatabaseError> {
    db.with_conn(|conn| {
        let count: u64 = conn.query_row("SELECT COUNT(*) FROM printed", [], |r| r.get(0))?;
        Ok(count)
    })
}

/// Returns the `CREATE TABLE` statement of the `printed` table, if present.
pub fn table_schema(db: &Database) -> Result<Option<String>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn
            .prepare("SELECT sql FROM sqlite_master WHERE type = 'table' AND name = 'printed'")?;
        let mut rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        match rows.next() {
            Some(Ok(sql)) => Ok(Some(sql)),
            Some(Err(e)) => Err(DatabaseError::Sqlite(e)),
            None => Ok(None),
        }
    })
}
