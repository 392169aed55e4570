use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use cloudnotes_core::auth::{Credential, CredentialProvider, StaticCredentialProvider};
use cloudnotes_core::config::SyncSettings;
use cloudnotes_core::db::SqliteNoteStore;
use cloudnotes_core::storage::FolderConnector;
use cloudnotes_core::util::normalize_text_option;
use cloudnotes_core::NoteRecord;
use serde::Serialize;

use crate::error::CliError;

pub const ENV_TOKEN: &str = "CLOUDNOTES_TOKEN";
const APP_DIR: &str = "cloudnotes";

/// Settings and paths shared by every command
#[derive(Debug, Clone)]
pub struct CommandContext {
    pub config_path: PathBuf,
    /// Settings as persisted on disk, without environment overrides
    pub stored: SyncSettings,
    /// Settings with environment overrides applied
    pub settings: SyncSettings,
    pub db_path: PathBuf,
    pub remote_dir: PathBuf,
    pub token: Option<String>,
}

impl CommandContext {
    pub fn resolve(
        config_path: Option<PathBuf>,
        db_path: Option<PathBuf>,
    ) -> Result<Self, CliError> {
        let config_path = config_path.unwrap_or_else(default_config_path);
        let stored = SyncSettings::load_from_path(&config_path)?;
        let settings = stored.clone().with_env_overrides();
        let token = normalize_text_option(std::env::var(ENV_TOKEN).ok());
        Ok(Self::from_parts(config_path, stored, settings, db_path, token))
    }

    pub fn from_parts(
        config_path: PathBuf,
        stored: SyncSettings,
        settings: SyncSettings,
        db_path: Option<PathBuf>,
        token: Option<String>,
    ) -> Self {
        let db_path = db_path
            .or_else(|| settings.database_path.clone())
            .unwrap_or_else(default_db_path);
        let remote_dir = settings
            .remote_dir
            .clone()
            .unwrap_or_else(default_remote_dir);
        Self {
            config_path,
            stored,
            settings,
            db_path,
            remote_dir,
            token,
        }
    }

    pub fn account(&self) -> Result<&str, CliError> {
        self.settings
            .account
            .as_deref()
            .ok_or(CliError::AccountNotConfigured)
    }

    pub fn open_store(&self) -> Result<SqliteNoteStore, CliError> {
        open_store(&self.db_path)
    }

    pub fn connector(&self) -> FolderConnector {
        FolderConnector::new(self.remote_dir.clone())
    }

    /// Credentials available to this process, keyed by the configured account
    pub fn credentials(&self) -> StaticCredentialProvider {
        match (self.settings.account.as_deref(), self.token.as_deref()) {
            (Some(account), Some(token)) => {
                StaticCredentialProvider::new().with_credential(Credential::new(account, token))
            }
            _ => StaticCredentialProvider::new(),
        }
    }

    pub fn credential(&self) -> Result<Credential, CliError> {
        let account = self.account()?;
        Ok(self.credentials().credential(account)?)
    }

    pub fn shared_credentials(&self) -> Arc<dyn CredentialProvider> {
        Arc::new(self.credentials())
    }
}

pub fn open_store(db_path: &Path) -> Result<SqliteNoteStore, CliError> {
    Ok(SqliteNoteStore::open(db_path)?)
}

pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
        .join("config.json")
}

pub fn default_db_path() -> PathBuf {
    app_data_dir().join("notes.db")
}

pub fn default_remote_dir() -> PathBuf {
    app_data_dir().join("remote")
}

fn app_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

#[derive(Debug, Serialize)]
pub struct NoteListItem {
    pub id: String,
    pub title: String,
    pub preview: String,
    pub last_modified: i64,
    pub relative_time: String,
    pub remote_ref: Option<String>,
}

pub fn note_to_list_item(note: &NoteRecord, now_ms: i64) -> NoteListItem {
    NoteListItem {
        id: note.id.to_string(),
        title: note.title.clone(),
        preview: text_preview(&note.body, 60),
        last_modified: note.last_modified,
        relative_time: format_relative_time(note.last_modified, now_ms),
        remote_ref: note.remote_id().map(str::to_string),
    }
}

pub fn format_note_lines(notes: &[NoteRecord]) -> Vec<String> {
    let now_ms = Utc::now().timestamp_millis();
    notes
        .iter()
        .map(|note| {
            let id = note.id.to_string();
            let short_id = id.chars().take(13).collect::<String>();
            let title = text_preview(&note.title, 40);
            let relative_time = format_relative_time(note.last_modified, now_ms);
            let marker = if note.is_linked() { "synced" } else { "local" };
            format!("{short_id}  {title}  ({relative_time}, {marker})")
        })
        .collect()
}

/// First line of `text`, shortened to `max_chars` with an ellipsis
pub fn text_preview(text: &str, max_chars: usize) -> String {
    let first_line = text.lines().next().unwrap_or_default().trim();
    if first_line.chars().count() <= max_chars {
        return first_line.to_string();
    }

    let keep = max_chars.saturating_sub(3);
    let mut preview = first_line.chars().take(keep).collect::<String>();
    preview.push_str("...");
    preview
}

pub fn format_relative_time(timestamp_ms: i64, now_ms: i64) -> String {
    let diff = now_ms.saturating_sub(timestamp_ms);
    let minute = 60_000;
    let hour = 60 * minute;
    let day = 24 * hour;
    let week = 7 * day;
    let month = 30 * day;
    let year = 365 * day;

    if diff < minute {
        "just now".to_string()
    } else if diff < hour {
        format!("{}m ago", diff / minute)
    } else if diff < day {
        format!("{}h ago", diff / hour)
    } else if diff < week {
        format!("{}d ago", diff / day)
    } else if diff < month {
        format!("{}w ago", diff / week)
    } else if diff < year {
        format!("{}mo ago", diff / month)
    } else {
        format!("{}y ago", diff / year)
    }
}
