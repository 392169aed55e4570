//! Sync configuration shared by host applications.
//!
//! Settings are persisted as JSON and may be overridden by environment
//! variables. Secrets (access tokens) are never stored here.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::util::normalize_text_option;

pub const ENV_ACCOUNT: &str = "CLOUDNOTES_ACCOUNT";
pub const ENV_REMOTE_DIR: &str = "CLOUDNOTES_REMOTE_DIR";
pub const ENV_DATABASE_PATH: &str = "CLOUDNOTES_DB_PATH";

/// Persisted sync settings
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct SyncSettings {
    /// Account identifier used to look up the sync credential
    #[serde(default)]
    pub account: Option<String>,
    /// Root directory of the folder remote
    #[serde(default)]
    pub remote_dir: Option<PathBuf>,
    /// Local note database file
    #[serde(default)]
    pub database_path: Option<PathBuf>,
}

impl SyncSettings {
    /// Load settings from a JSON file, returning defaults when it does not exist
    pub fn load_from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(path)?;
        let mut settings: Self = serde_json::from_str(&raw)?;
        settings.normalize();
        Ok(settings)
    }

    /// Write settings as pretty JSON, creating parent directories
    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut normalized = self.clone();
        normalized.normalize();
        std::fs::write(path, serde_json::to_string_pretty(&normalized)?)?;
        Ok(())
    }

    /// Apply overrides from a variable lookup (usually the process environment)
    #[must_use]
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(account) = normalize_text_option(lookup(ENV_ACCOUNT)) {
            self.account = Some(account);
        }
        if let Some(remote_dir) = normalize_text_option(lookup(ENV_REMOTE_DIR)) {
            self.remote_dir = Some(PathBuf::from(remote_dir));
        }
        if let Some(database_path) = normalize_text_option(lookup(ENV_DATABASE_PATH)) {
            self.database_path = Some(PathBuf::from(database_path));
        }
        self
    }

    /// Apply overrides from the process environment
    #[must_use]
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    fn normalize(&mut self) {
        self.account = normalize_text_option(self.account.take());
        self.remote_dir = normalize_path(self.remote_dir.take());
        self.database_path = normalize_path(self.database_path.take());
    }
}

fn normalize_path(path: Option<PathBuf>) -> Option<PathBuf> {
    path.filter(|path| !path.as_os_str().is_empty())
}
