//! SQLite copy of a tablebase for on-demand lookups.
//!
//! Schema: `positions(canonical INTEGER PRIMARY KEY, outcome INTEGER, moves INTEGER)`
//! where `moves` is the 9-bit move mask.

use std::path::Path;
use std::time::Instant;

use rusqlite::{params, Connection, OpenFlags, OptionalExtension};
use tictactoe_core::{MoveSet, Outcome};
use tracing::{debug, info};

use crate::error::{Result, SolverError};
use crate::tablebase::{Entry, Tablebase};

/// Write every entry to a fresh database at `path`, replacing any existing file.
pub fn export(tablebase: &Tablebase, path: &Path) -> Result<usize> {
    if path.exists() {
        std::fs::remove_file(path)?;
    }

    let start = Instant::now();
    let mut conn = Connection::open(path)?;
    conn.execute(
        "CREATE TABLE positions (
            canonical INTEGER PRIMARY KEY,
            outcome INTEGER NOT NULL,
            moves INTEGER NOT NULL
        )",
        [],
    )?;

    let tx = conn.transaction()?;
    let mut inserted = 0;
    {
        let mut stmt =
            tx.prepare("INSERT INTO positions (canonical, outcome, moves) VALUES (?1, ?2, ?3)")?;
        for (canonical, entry) in tablebase.iter() {
            stmt.execute(params![
                i64::from(canonical),
                i64::from(entry.outcome.as_i8()),
                i64::from(entry.moves.bits())
            ])?;
            inserted += 1;
        }
    }
    tx.commit()?;

    info!(
        path = %path.display(),
        rows = inserted,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "exported tablebase to sqlite"
    );
    Ok(inserted)
}

/// Read-only view over an exported database.
pub struct SqliteTablebase {
    conn: Connection,
}

impl SqliteTablebase {
    pub fn open(path: &Path) -> Result<SqliteTablebase> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        conn.pragma_update(None, "query_only", true)?;
        debug!(path = %path.display(), "opened sqlite tablebase");
        Ok(SqliteTablebase { conn })
    }

    /// Entry for canonical encoding `n`.
    pub fn lookup(&self, n: u16) -> Result<Entry> {
        let row: Option<(i64, i64)> = self
            .conn
            .query_row(
                "SELECT outcome, moves FROM positions WHERE canonical = ?1",
                params![i64::from(n)],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        let (outcome, moves) = row.ok_or(SolverError::LookupNotFound {
            table: "sqlite tablebase",
            key: u32::from(n),
        })?;
        let outcome = i8::try_from(outcome)
            .ok()
            .and_then(Outcome::from_i8)
            .ok_or_else(|| SolverError::corrupt("sqlite tablebase", format!("row {n}: outcome {outcome}")))?;
        let moves = u16::try_from(moves)
            .ok()
            .filter(|&bits| MoveSet::from_bits(bits).bits() == bits)
            .map(MoveSet::from_bits)
            .ok_or_else(|| SolverError::corrupt("sqlite tablebase", format!("row {n}: moves {moves}")))?;

        let entry = Entry { outcome, moves };
        Tablebase::validate(n, &entry)?;
        Ok(entry)
    }

    /// Number of rows.
    pub fn len(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM positions", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Load every row back into memory.
    pub fn to_tablebase(&self) -> Result<Tablebase> {
        let mut stmt = self.conn.prepare("SELECT canonical FROM positions ORDER BY canonical")?;
        let keys = stmt
            .query_map([], |row| row.get::<_, i64>(0))?
            .collect::<rusqlite::Result<Vec<i64>>>()?;

        keys.into_iter()
            .map(|key| -> Result<(u16, Entry)> {
                let n = u16::try_from(key)
                    .map_err(|_| SolverError::corrupt("sqlite tablebase", format!("key {key}")))?;
                Ok((n, self.lookup(n)?))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("tictactoe-{}-{}", std::process::id(), name))
    }

    #[test]
    fn test_export_and_lookup() {
        let path = temp_path("sqlite_roundtrip.db");
        let tablebase: Tablebase = [
            (
                0,
                Entry {
                    outcome: Outcome::Draw,
                    moves: MoveSet::from_bits(0b1_1111_1111),
                },
            ),
            (
                81,
                Entry {
                    outcome: Outcome::Draw,
                    moves: [0, 2, 6, 8].into_iter().collect(),
                },
            ),
        ]
        .into_iter()
        .collect();

        assert_eq!(export(&tablebase, &path).unwrap(), 2);
        // A second export replaces the file.
        assert_eq!(export(&tablebase, &path).unwrap(), 2);

        let db = SqliteTablebase::open(&path).unwrap();
        assert_eq!(db.len().unwrap(), 2);
        assert_eq!(db.lookup(81).unwrap(), tablebase.lookup(81).unwrap());
        assert!(matches!(db.lookup(1), Err(SolverError::LookupNotFound { .. })));
        assert_eq!(db.to_tablebase().unwrap(), tablebase);

        // Read-only connection refuses writes.
        assert!(db
            .conn
            .execute("DELETE FROM positions", [])
            .is_err());

        drop(db);
        std::fs::remove_file(&path).ok();
    }
}
