//! Sync report model

use serde::{Deserialize, Serialize};
use std::fmt;

use super::NoteId;
use crate::error::{Error, ErrorKind};

/// Phase of a sync pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncPhase {
    /// Local notes without a remote link are uploaded
    Upload,
    /// Remote objects without a local note are downloaded
    Download,
}

impl fmt::Display for SyncPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Upload => f.write_str("upload"),
            Self::Download => f.write_str("download"),
        }
    }
}

/// A single note that could not be synchronized during a pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemFailure {
    pub local_id: Option<NoteId>,
    pub remote_id: Option<String>,
    pub phase: SyncPhase,
    pub kind: ErrorKind,
    pub message: String,
}

/// Outcome counts and per-item failures of one sync pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
    pub uploaded: usize,
    pub downloaded: usize,
    pub failed: usize,
    /// Remote objects already linked to a local note
    pub unchanged: usize,
    /// Trashed remote objects that were ignored
    pub trashed_skipped: usize,
    /// Failures in the order they happened
    pub failures: Vec<ItemFailure>,
}

impl SyncReport {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_failure(
        &mut self,
        phase: SyncPhase,
        local_id: Option<NoteId>,
        remote_id: Option<&str>,
        error: &Error,
    ) {
        self.failed += 1;
        self.failures.push(ItemFailure {
            local_id,
            remote_id: remote_id.map(str::to_string),
            phase,
            kind: error.kind(),
            message: error.to_string(),
        });
    }

    /// Whether the pass moved anything in either direction
    #[must_use]
    pub const fn has_changes(&self) -> bool {
        self.uploaded > 0 || self.downloaded > 0
    }

    /// One-line human readable summary
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "uploaded {}, downloaded {}, failed {}",
            self.uploaded, self.downloaded, self.failed
        )
    }
}
