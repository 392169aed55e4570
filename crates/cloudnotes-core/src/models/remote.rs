//! Remote object model

use serde::{Deserialize, Serialize};

/// A file-like object held by the remote store.
///
/// Content is not carried here; it is fetched on demand through
/// [`RemoteStore::fetch_content`](crate::storage::RemoteStore::fetch_content).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteObject {
    /// Identifier assigned by the remote store
    pub id: String,
    pub title: String,
    /// Last modification timestamp (Unix ms)
    pub modified_at: i64,
    /// Trashed objects are ignored by reconciliation
    #[serde(default)]
    pub trashed: bool,
}
