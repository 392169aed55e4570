//! Local note model

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// A unique identifier for a local note, using UUID v7 (time-sortable)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NoteId(Uuid);

impl NoteId {
    /// Create a new unique note ID using UUID v7
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Get the string representation of this ID
    #[must_use]
    pub fn as_str(&self) -> String {
        self.0.to_string()
    }
}

impl Default for NoteId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for NoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for NoteId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// A note held by the local store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteRecord {
    /// Local primary key, assigned by the store
    pub id: NoteId,
    /// Note title, never empty
    pub title: String,
    /// Plain text body
    pub body: String,
    /// Last modification timestamp (Unix ms)
    pub last_modified: i64,
    /// Identifier of the linked remote object, `None` until first upload
    pub remote_ref: Option<String>,
}

impl NoteRecord {
    /// Whether this note is linked to a remote object.
    ///
    /// An empty reference string counts as unlinked.
    #[must_use]
    pub fn is_linked(&self) -> bool {
        self.remote_id().is_some()
    }

    /// The linked remote identifier, ignoring empty references
    #[must_use]
    pub fn remote_id(&self) -> Option<&str> {
        self.remote_ref
            .as_deref()
            .map(str::trim)
            .filter(|remote_id| !remote_id.is_empty())
    }
}

/// Seed for a note created from a downloaded remote object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewNote {
    pub title: String,
    pub body: String,
    pub last_modified: i64,
    pub remote_ref: Option<String>,
}

impl NewNote {
    /// Build a seed with a fresh timestamp and no remote link
    #[must_use]
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            last_modified: chrono::Utc::now().timestamp_millis(),
            remote_ref: None,
        }
    }

    /// Link the seed to a remote object
    #[must_use]
    pub fn linked_to(mut self, remote_id: impl Into<String>, modified_at: i64) -> Self {
        self.remote_ref = Some(remote_id.into());
        self.last_modified = modified_at;
        self
    }

    /// Check if the title is empty (whitespace-only counts as empty)
    #[must_use]
    pub fn has_empty_title(&self) -> bool {
        self.title.trim().is_empty()
    }
}
