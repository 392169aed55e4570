//! Local note store adapter and its `SQLite` implementation

use std::path::Path;

use crate::error::{Error, Result};
use crate::models::{NewNote, NoteId, NoteRecord};
use rusqlite::{params, Connection, ErrorCode, OptionalExtension};

use super::Database;

/// Local note storage as seen by the sync engine.
///
/// Implementations must make each write atomic: concurrent readers observe a
/// record either before or after a write, never in between.
pub trait LocalStore: Send + Sync {
    /// Every known local note, in no particular order
    fn list_all(&self) -> Result<Vec<NoteRecord>>;

    /// Set the remote reference of an existing note (idempotent).
    ///
    /// `linked_at` becomes the note's last-modified time unless the note is
    /// already newer.
    fn link_to_remote(&self, id: &NoteId, remote_id: &str, linked_at: i64) -> Result<()>;

    /// Insert a note downloaded from the remote store
    fn create_from_remote(&self, seed: &NewNote) -> Result<NoteId>;

    /// Find the note linked to the given remote identifier
    fn find_by_remote_id(&self, remote_id: &str) -> Result<Option<NoteRecord>>;
}

/// `SQLite` implementation of `LocalStore`
pub struct SqliteNoteStore {
    db: Database,
}

const NOTE_COLUMNS: &str = "id, title, body, last_modified, remote_ref";

impl SqliteNoteStore {
    /// Create a store over an opened database
    pub const fn new(db: Database) -> Self {
        Self { db }
    }

    /// Open (or create) the note database at the given path
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::new(Database::open(path)?))
    }

    /// Open an in-memory store (useful for testing)
    pub fn open_in_memory() -> Result<Self> {
        Ok(Self::new(Database::open_in_memory()?))
    }

    /// Create a new, unlinked note
    pub fn create(&self, title: &str, body: &str) -> Result<NoteRecord> {
        let seed = NewNote::new(title.trim(), body);
        let id = self.insert(&seed)?;
        self.get(&id)?.ok_or(Error::RecordNotFound(id))
    }

    /// Get a note by ID
    pub fn get(&self, id: &NoteId) -> Result<Option<NoteRecord>> {
        self.db.with_connection(|conn| {
            Ok(conn
                .query_row(
                    &format!("SELECT {NOTE_COLUMNS} FROM notes WHERE id = ?"),
                    params![id.as_str()],
                    Self::parse_note,
                )
                .optional()?)
        })
    }

    /// Update a note's title and body, bumping its last-modified time
    pub fn update(&self, id: &NoteId, title: &str, body: &str) -> Result<NoteRecord> {
        let title = title.trim();
        if title.is_empty() {
            return Err(Error::InvalidRecord("note title must not be empty".into()));
        }

        let now = chrono::Utc::now().timestamp_millis();
        let rows = self.db.with_connection(|conn| {
            Ok(conn.execute(
                "UPDATE notes SET title = ?, body = ?, last_modified = MAX(last_modified, ?)
                 WHERE id = ?",
                params![title, body, now, id.as_str()],
            )?)
        })?;

        if rows == 0 {
            return Err(Error::RecordNotFound(*id));
        }

        self.get(id)?.ok_or(Error::RecordNotFound(*id))
    }

    /// List notes, most recently modified first
    pub fn list_recent(&self, limit: usize) -> Result<Vec<NoteRecord>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        self.db.with_connection(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {NOTE_COLUMNS} FROM notes ORDER BY last_modified DESC LIMIT ?"
            ))?;
            let notes = stmt
                .query_map(params![limit], Self::parse_note)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(notes)
        })
    }

    fn insert(&self, seed: &NewNote) -> Result<NoteId> {
        if seed.has_empty_title() {
            return Err(Error::InvalidRecord("note title must not be empty".into()));
        }

        let id = NoteId::new();
        let remote_ref = seed
            .remote_ref
            .as_deref()
            .map(str::trim)
            .filter(|remote_id| !remote_id.is_empty());

        self.db.with_connection(|conn| {
            conn.execute(
                "INSERT INTO notes (id, title, body, last_modified, remote_ref) VALUES (?, ?, ?, ?, ?)",
                params![id.as_str(), seed.title, seed.body, seed.last_modified, remote_ref],
            )
            .map_err(|error| map_link_conflict(error, remote_ref))?;
            Ok(())
        })?;

        Ok(id)
    }

    fn select_where(conn: &Connection, clause: &str, arg: &str) -> Result<Option<NoteRecord>> {
        Ok(conn
            .query_row(
                &format!("SELECT {NOTE_COLUMNS} FROM notes WHERE {clause}"),
                params![arg],
                Self::parse_note,
            )
            .optional()?)
    }

    /// Parse a note from a database row
    fn parse_note(row: &rusqlite::Row<'_>) -> rusqlite::Result<NoteRecord> {
        let id: String = row.get(0)?;
        let id = id.parse().map_err(|error| {
            rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(error))
        })?;
        Ok(NoteRecord {
            id,
            title: row.get(1)?,
            body: row.get(2)?,
            last_modified: row.get(3)?,
            remote_ref: row.get(4)?,
        })
    }
}

impl LocalStore for SqliteNoteStore {
    fn list_all(&self) -> Result<Vec<NoteRecord>> {
        self.db.with_connection(|conn| {
            let mut stmt = conn.prepare(&format!("SELECT {NOTE_COLUMNS} FROM notes"))?;
            let notes = stmt
                .query_map([], Self::parse_note)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(notes)
        })
    }

    fn link_to_remote(&self, id: &NoteId, remote_id: &str, linked_at: i64) -> Result<()> {
        let remote_id = remote_id.trim();
        if remote_id.is_empty() {
            return Err(Error::InvalidRecord("remote id must not be empty".into()));
        }

        let rows = self.db.with_connection(|conn| {
            conn.execute(
                "UPDATE notes SET remote_ref = ?, last_modified = MAX(last_modified, ?)
                 WHERE id = ?",
                params![remote_id, linked_at, id.as_str()],
            )
            .map_err(|error| map_link_conflict(error, Some(remote_id)))
        })?;

        if rows == 0 {
            return Err(Error::RecordNotFound(*id));
        }
        Ok(())
    }

    fn create_from_remote(&self, seed: &NewNote) -> Result<NoteId> {
        self.insert(seed)
    }

    fn find_by_remote_id(&self, remote_id: &str) -> Result<Option<NoteRecord>> {
        self.db
            .with_connection(|conn| Self::select_where(conn, "remote_ref = ?", remote_id.trim()))
    }
}

/// Turn a uniqueness violation on `remote_ref` into `InvalidRecord`
fn map_link_conflict(error: rusqlite::Error, remote_id: Option<&str>) -> Error {
    match &error {
        rusqlite::Error::SqliteFailure(failure, _)
            if failure.code == ErrorCode::ConstraintViolation =>
        {
            Error::InvalidRecord(format!(
                "remote object {} is already linked to another note",
                remote_id.unwrap_or_default()
            ))
        }
        _ => Error::Database(error),
    }
}
