//! Events emitted by the sync session controller.

use serde::{Deserialize, Serialize};

use crate::error::{Error, ErrorKind};
use crate::models::SyncReport;

/// Items processed so far out of the items known to need work
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncProgress {
    pub items_done: usize,
    pub items_total: usize,
}

/// Why a sync run failed as a whole
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureReason {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<&Error> for FailureReason {
    fn from(error: &Error) -> Self {
        Self {
            kind: error.kind(),
            message: error.to_string(),
        }
    }
}

/// Observable state changes of a sync run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SyncEvent {
    Started,
    Progress(SyncProgress),
    Completed { report: SyncReport },
    Failed {
        reason: FailureReason,
        report: SyncReport,
    },
    Cancelled { report: SyncReport },
}

impl SyncEvent {
    /// Whether this event ends a run
    pub const fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Completed { .. } | Self::Failed { .. } | Self::Cancelled { .. }
        )
    }
}
