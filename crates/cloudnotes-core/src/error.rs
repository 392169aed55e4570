//! Error types for cloudnotes-core

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::NoteId;

/// Result type alias using cloudnotes-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in cloudnotes-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Local store cannot be opened or queried
    #[error("Local store unavailable: {0}")]
    StoreUnavailable(String),

    /// Local record does not exist
    #[error("Note not found: {0}")]
    RecordNotFound(NoteId),

    /// Local record rejected by the store (empty title, duplicate link, ...)
    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    /// Remote store transport failure
    #[error("Remote store unavailable: {0}")]
    RemoteUnavailable(String),

    /// Credential rejected by the remote store
    #[error("Credential expired or rejected: {0}")]
    AuthExpired(String),

    /// Remote object could not be created
    #[error("Remote write failed: {0}")]
    RemoteWriteFailed(String),

    /// Remote object content could not be read
    #[error("Remote read failed for {remote_id}: {message}")]
    RemoteReadFailed { remote_id: String, message: String },

    /// No credential available for the sync account
    #[error("No credential available: {0}")]
    NoCredential(String),

    /// A sync run is already active
    #[error("A sync run is already in progress")]
    AlreadyRunning,

    /// `SQLite` error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Background sync worker failed to complete
    #[error("Sync worker error: {0}")]
    Worker(String),
}

/// Serializable classification of an [`Error`], used in reports and events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    StoreUnavailable,
    RecordNotFound,
    InvalidRecord,
    RemoteUnavailable,
    AuthExpired,
    RemoteWriteFailed,
    RemoteReadFailed,
    NoCredential,
    AlreadyRunning,
    Internal,
}

impl Error {
    /// Classify this error into the sync error taxonomy.
    ///
    /// Ambient database and IO failures count as the local store being unavailable.
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::StoreUnavailable(_) | Self::Database(_) | Self::Io(_) => {
                ErrorKind::StoreUnavailable
            }
            Self::RecordNotFound(_) => ErrorKind::RecordNotFound,
            Self::InvalidRecord(_) => ErrorKind::InvalidRecord,
            Self::RemoteUnavailable(_) => ErrorKind::RemoteUnavailable,
            Self::AuthExpired(_) => ErrorKind::AuthExpired,
            Self::RemoteWriteFailed(_) => ErrorKind::RemoteWriteFailed,
            Self::RemoteReadFailed { .. } => ErrorKind::RemoteReadFailed,
            Self::NoCredential(_) => ErrorKind::NoCredential,
            Self::AlreadyRunning => ErrorKind::AlreadyRunning,
            Self::Serialization(_) | Self::Worker(_) => ErrorKind::Internal,
        }
    }

    /// Whether this error is scoped to a single note and must not abort a pass.
    pub const fn is_item_failure(&self) -> bool {
        self.kind().is_item_failure()
    }
}

impl ErrorKind {
    pub const fn is_item_failure(self) -> bool {
        matches!(
            self,
            Self::RemoteWriteFailed | Self::RemoteReadFailed | Self::InvalidRecord | Self::RecordNotFound
        )
    }
}
