use chrono::Utc;
use cloudnotes_core::storage::{FolderRemoteStore, RemoteConnector};
use cloudnotes_core::RemoteObject;

use crate::commands::common::{format_relative_time, CommandContext};
use crate::error::CliError;

pub fn run_remote_list(as_json: bool, context: &CommandContext) -> Result<(), CliError> {
    let credential = context.credential()?;
    let remote = context.connector().connect(&credential)?;
    let objects = remote.list_all()?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&objects)?);
        return Ok(());
    }

    if objects.is_empty() {
        println!("Remote folder is empty.");
        return Ok(());
    }

    for line in format_remote_lines(&objects, Utc::now().timestamp_millis()) {
        println!("{line}");
    }
    Ok(())
}

pub fn run_remote_trash(remote_id: &str, context: &CommandContext) -> Result<(), CliError> {
    let credential = context.credential()?;
    let store = FolderRemoteStore::new(context.connector().account_dir(&credential.account));
    store.trash(remote_id)?;

    println!("Trashed {remote_id}");
    Ok(())
}

pub fn format_remote_lines(objects: &[RemoteObject], now_ms: i64) -> Vec<String> {
    objects
        .iter()
        .map(|object| {
            let relative_time = format_relative_time(object.modified_at, now_ms);
            let trashed = if object.trashed { ", trashed" } else { "" };
            format!("{}  {}  ({relative_time}{trashed})", object.id, object.title)
        })
        .collect()
}
