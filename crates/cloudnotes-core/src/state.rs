//! Shared sync session state types.

use serde::{Deserialize, Serialize};

/// Lifecycle state of the sync session controller.
///
/// `Idle -> Running -> {Completed, Failed, Cancelled}`; a terminal state goes
/// back to `Idle` before the next run starts.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    #[default]
    Idle,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl SessionState {
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}
