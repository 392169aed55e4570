//! Remote store abstractions for cloud file backends.

mod folder;

pub use folder::{FolderConnector, FolderRemoteStore};

use crate::auth::Credential;
use crate::error::Result;
use crate::models::RemoteObject;

/// Remote file store as seen by the sync engine.
///
/// Transport failures (network, timeouts) surface as
/// [`Error::RemoteUnavailable`](crate::Error::RemoteUnavailable); a rejected
/// credential surfaces as [`Error::AuthExpired`](crate::Error::AuthExpired).
pub trait RemoteStore: Send + Sync {
    /// Every remote object, trashed ones included
    fn list_all(&self) -> Result<Vec<RemoteObject>>;

    /// Create one remote object
    fn upload(&self, title: &str, content: &str) -> Result<RemoteObject>;

    /// Read an object's content.
    ///
    /// Fails with [`Error::RemoteReadFailed`](crate::Error::RemoteReadFailed)
    /// when the object has no retrievable content.
    fn fetch_content(&self, remote_id: &str) -> Result<String>;
}

/// Builds an authenticated remote store for one sync run.
pub trait RemoteConnector: Send + Sync {
    fn connect(&self, credential: &Credential) -> Result<Box<dyn RemoteStore>>;
}
