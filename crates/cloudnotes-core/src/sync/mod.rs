//! Bidirectional note synchronization.

mod controller;
mod engine;
mod events;

pub use controller::{SessionOutcome, SyncController, SyncRun};
pub use engine::{CancelFlag, PassOutcome, ReconciliationEngine, SyncFailure};
pub use events::{FailureReason, SyncEvent, SyncProgress};
