//! Database migrations

use crate::error::{Error, Result};
use rusqlite::Connection;

struct Migration {
    version: u32,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[
    // Initial schema
    Migration {
        version: 1,
        sql: "CREATE TABLE IF NOT EXISTS notes (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                body TEXT NOT NULL DEFAULT '',
                last_modified INTEGER NOT NULL
              );
              CREATE INDEX IF NOT EXISTS idx_notes_modified ON notes(last_modified DESC);",
    },
    // Remote link column; at most one note per remote object
    Migration {
        version: 2,
        sql: "ALTER TABLE notes ADD COLUMN remote_ref TEXT;
              CREATE UNIQUE INDEX IF NOT EXISTS idx_notes_remote_ref
                ON notes(remote_ref) WHERE remote_ref IS NOT NULL;",
    },
];

/// Current schema version
pub fn latest_version() -> u32 {
    MIGRATIONS.last().map_or(0, |migration| migration.version)
}

/// Run all pending migrations
pub fn run(conn: &mut Connection) -> Result<()> {
    let version = get_version(conn)?;
    let latest = latest_version();

    if version > latest {
        return Err(Error::StoreUnavailable(format!(
            "database schema version {version} is newer than supported version {latest}"
        )));
    }
    if version == latest {
        return Ok(());
    }

    let tx = conn.transaction()?;
    for migration in MIGRATIONS.iter().filter(|m| m.version > version) {
        tx.execute_batch(migration.sql)?;
        tx.execute_batch(&format!("PRAGMA user_version = {};", migration.version))?;
        tracing::debug!(version = migration.version, "Applied migration");
    }
    tx.commit()?;

    Ok(())
}

/// Get the current schema version
pub fn get_version(conn: &Connection) -> Result<u32> {
    Ok(conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?)
}
