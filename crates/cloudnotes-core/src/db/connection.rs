//! Database connection management

use crate::error::{Error, Result};
use rusqlite::Connection;
use std::path::Path;
use std::sync::Mutex;

use super::migrations;

/// `SQLite` connection guarded for a single writer.
///
/// Every access goes through [`Database::with_connection`], so a reader never
/// observes a record between two statements of the same write.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open a database at the given path, creating it if it doesn't exist
    ///
    /// Runs migrations automatically.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|error| {
                Error::StoreUnavailable(format!("{}: {error}", parent.display()))
            })?;
        }

        let conn = Connection::open(path)
            .map_err(|error| Error::StoreUnavailable(format!("{}: {error}", path.display())))?;
        tracing::debug!("Opened note database at {}", path.display());
        Self::bootstrap(conn)
    }

    /// Open an in-memory database (useful for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|error| Error::StoreUnavailable(error.to_string()))?;
        Self::bootstrap(conn)
    }

    fn bootstrap(mut conn: Connection) -> Result<Self> {
        Self::configure(&conn)?;
        migrations::run(&mut conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Configure `SQLite` pragmas
    fn configure(conn: &Connection) -> Result<()> {
        // WAL is not available for in-memory databases
        conn.pragma_update(None, "journal_mode", "WAL").ok();
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(())
    }

    /// Run a closure with exclusive access to the connection
    pub fn with_connection<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| Error::StoreUnavailable("database lock poisoned".to_string()))?;
        f(&conn)
    }
}
