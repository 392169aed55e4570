//! Directory-backed remote store.
//!
//! Each remote object is one `<id>.json` document inside a per-account
//! directory. Useful as a self-hosted "cloud" (a synced folder, a network
//! mount) and as a realistic backend in tests.

use std::fs;
use std::io::ErrorKind as IoErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{RemoteConnector, RemoteStore};
use crate::auth::Credential;
use crate::error::{Error, Result};
use crate::models::RemoteObject;

const OBJECT_EXTENSION: &str = "json";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredObject {
    id: String,
    title: String,
    modified_at: i64,
    #[serde(default)]
    trashed: bool,
    #[serde(default)]
    content: Option<String>,
}

impl From<&StoredObject> for RemoteObject {
    fn from(stored: &StoredObject) -> Self {
        Self {
            id: stored.id.clone(),
            title: stored.title.clone(),
            modified_at: stored.modified_at,
            trashed: stored.trashed,
        }
    }
}

/// Remote store persisted as JSON documents in a directory
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FolderRemoteStore {
    root: PathBuf,
}

impl FolderRemoteStore {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Mark an object as trashed, keeping its document in place.
    pub fn trash(&self, remote_id: &str) -> Result<()> {
        let path = self.object_path(remote_id)?;
        let mut stored = read_object(&path).map_err(|error| Error::RemoteReadFailed {
            remote_id: remote_id.to_string(),
            message: error.to_string(),
        })?;
        stored.trashed = true;
        stored.modified_at = chrono::Utc::now().timestamp_millis();
        write_object(&path, &stored).map_err(|error| {
            Error::RemoteWriteFailed(format!("trash {remote_id} failed: {error}"))
        })
    }

    fn object_path(&self, remote_id: &str) -> Result<PathBuf> {
        let remote_id = normalize_object_id(remote_id).ok_or_else(|| Error::RemoteReadFailed {
            remote_id: remote_id.to_string(),
            message: "invalid remote id".to_string(),
        })?;
        Ok(self.root.join(format!("{remote_id}.{OBJECT_EXTENSION}")))
    }

    fn ensure_reachable(&self) -> Result<()> {
        if self.root.is_dir() {
            Ok(())
        } else {
            Err(Error::RemoteUnavailable(format!(
                "remote folder {} is not reachable",
                self.root.display()
            )))
        }
    }
}

impl RemoteStore for FolderRemoteStore {
    fn list_all(&self) -> Result<Vec<RemoteObject>> {
        self.ensure_reachable()?;
        let entries = fs::read_dir(&self.root).map_err(|error| {
            Error::RemoteUnavailable(format!("list {} failed: {error}", self.root.display()))
        })?;

        let mut objects = Vec::new();
        for entry in entries {
            let path = entry
                .map_err(|error| Error::RemoteUnavailable(error.to_string()))?
                .path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(OBJECT_EXTENSION) {
                continue;
            }
            match read_object(&path) {
                Ok(stored) => objects.push(RemoteObject::from(&stored)),
                Err(error) => {
                    tracing::warn!("Skipping unreadable remote object {}: {}", path.display(), error);
                }
            }
        }

        objects.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(objects)
    }

    fn upload(&self, title: &str, content: &str) -> Result<RemoteObject> {
        self.ensure_reachable()?;

        let stored = StoredObject {
            id: Uuid::now_v7().to_string(),
            title: title.to_string(),
            modified_at: chrono::Utc::now().timestamp_millis(),
            trashed: false,
            content: Some(content.to_string()),
        };
        let path = self.object_path(&stored.id)?;
        write_object(&path, &stored).map_err(|error| {
            Error::RemoteWriteFailed(format!("upload of '{title}' failed: {error}"))
        })?;

        tracing::debug!(remote_id = %stored.id, "Uploaded remote object");
        Ok(RemoteObject::from(&stored))
    }

    fn fetch_content(&self, remote_id: &str) -> Result<String> {
        self.ensure_reachable()?;
        let path = self.object_path(remote_id)?;
        let read_failed = |message: String| Error::RemoteReadFailed {
            remote_id: remote_id.to_string(),
            message,
        };

        let stored = read_object(&path).map_err(|error| read_failed(error.to_string()))?;
        if stored.trashed {
            return Err(read_failed("object is trashed".to_string()));
        }
        stored
            .content
            .ok_or_else(|| read_failed("object has no content".to_string()))
    }
}

/// Connects to a [`FolderRemoteStore`] namespaced by the credential's account
#[derive(Clone, Debug)]
pub struct FolderConnector {
    root: PathBuf,
}

impl FolderConnector {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Directory holding the objects of the given account
    #[must_use]
    pub fn account_dir(&self, account: &str) -> PathBuf {
        self.root.join(sanitize_token(account))
    }
}

impl RemoteConnector for FolderConnector {
    fn connect(&self, credential: &Credential) -> Result<Box<dyn RemoteStore>> {
        if credential.is_expired() {
            return Err(Error::AuthExpired(format!(
                "credential for {} has expired",
                credential.account
            )));
        }

        let dir = self.account_dir(&credential.account);
        fs::create_dir_all(&dir).map_err(|error| {
            Error::RemoteUnavailable(format!("cannot open {}: {error}", dir.display()))
        })?;
        tracing::debug!("Connected to remote folder {}", dir.display());
        Ok(Box::new(FolderRemoteStore::new(dir)))
    }
}

fn read_object(path: &Path) -> std::io::Result<StoredObject> {
    let raw = fs::read_to_string(path)?;
    serde_json::from_str(&raw).map_err(|error| std::io::Error::new(IoErrorKind::InvalidData, error))
}

/// Write through a temporary file so readers never see a partial document
fn write_object(path: &Path, stored: &StoredObject) -> std::io::Result<()> {
    let serialized = serde_json::to_string_pretty(stored)
        .map_err(|error| std::io::Error::new(IoErrorKind::InvalidData, error))?;
    let tmp_path = path.with_extension("json.tmp");
    fs::write(&tmp_path, serialized)?;
    fs::rename(&tmp_path, path)
}

fn normalize_object_id(remote_id: &str) -> Option<&str> {
    let remote_id = remote_id.trim();
    let valid = !remote_id.is_empty()
        && remote_id
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_');
    valid.then_some(remote_id)
}

fn sanitize_token(value: &str) -> String {
    let sanitized: String = value
        .trim()
        .chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '.' | '@') {
                ch
            } else {
                '_'
            }
        })
        .collect();
    let sanitized = sanitized.trim_matches('.').to_string();
    if sanitized.is_empty() {
        "default".to_string()
    } else {
        sanitized
    }
}
