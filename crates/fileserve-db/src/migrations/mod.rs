//! Schema migrations.
//!
//! Scripts are embedded in the binary. The schema version lives in SQLite's
//! `user_version` pragma: version `n` means the first `n` scripts are applied.

use fileserve_common::{Error, Result};
use rusqlite::Connection;

const SCRIPTS: &[(&str, &str)] = &[("initial", include_str!("001_initial.sql"))];

fn schema_version(conn: &Connection) -> Result<usize> {
    conn.query_row("PRAGMA user_version", [], |row| row.get::<_, i64>(0))
        .map(|v| v.max(0) as usize)
        .map_err(|e| Error::database(format!("Failed to read schema version: {}", e)))
}

/// Apply every script past the recorded version. Each script and its version
/// bump commit together. Returns how many were applied.
pub fn run_migrations(conn: &Connection) -> Result<usize> {
    let current = schema_version(conn)?;
    let pending = SCRIPTS.iter().enumerate().skip(current);
    let mut applied = 0;

    for (index, (name, sql)) in pending {
        let version = index + 1;
        let step = || -> rusqlite::Result<()> {
            let tx = conn.unchecked_transaction()?;
            tx.execute_batch(sql)?;
            tx.pragma_update(None, "user_version", version as i64)?;
            tx.commit()
        };
        step().map_err(|e| Error::database(format!("Migration {version} ({name}) failed: {e}")))?;

        tracing::info!("Applied migration {}: {}", version, name);
        applied += 1;
    }

    Ok(applied)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_migrations() {
        let conn = Connection::open_in_memory().unwrap();

        assert_eq!(run_migrations(&conn).unwrap(), SCRIPTS.len());
        assert_eq!(schema_version(&conn).unwrap(), SCRIPTS.len());

        // Second run is a no-op
        assert_eq!(run_migrations(&conn).unwrap(), 0);
    }

    #[test]
    fn test_schema_created() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();

        for table in ["share", "share_file"] {
            let count: i64 = conn
                .query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?",
                    [table],
                    |row| row.get(0),
                )
                .unwrap();
            assert_eq!(count, 1, "Table {} should exist", table);
        }
    }
}
