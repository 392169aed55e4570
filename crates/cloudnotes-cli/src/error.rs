use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] cloudnotes_core::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("Invalid configuration: {0}")]
    Config(String),
    #[error("Note not found: {0}")]
    NoteNotFound(String),
    #[error("Nothing to change; pass --title or a new body")]
    NothingToEdit,
    #[error("Note title cannot be empty")]
    EmptyTitle,
    #[error("Sync failed ({kind:?}): {message}")]
    SyncFailed {
        kind: cloudnotes_core::ErrorKind,
        message: String,
    },
    #[error("Sync was cancelled")]
    SyncCancelled,
    #[error(
        "Sync account is not configured. Run `cloudnotes config set --account <ID>` or set CLOUDNOTES_ACCOUNT."
    )]
    AccountNotConfigured,
}
