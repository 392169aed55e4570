use chrono::Utc;

use crate::commands::common::{format_note_lines, note_to_list_item, CommandContext, NoteListItem};
use crate::error::CliError;

pub fn run_list(limit: usize, as_json: bool, context: &CommandContext) -> Result<(), CliError> {
    let store = context.open_store()?;
    let notes = store.list_recent(limit)?;

    if as_json {
        let now_ms = Utc::now().timestamp_millis();
        let json_items = notes
            .iter()
            .map(|note| note_to_list_item(note, now_ms))
            .collect::<Vec<NoteListItem>>();
        println!("{}", serde_json::to_string_pretty(&json_items)?);
        return Ok(());
    }

    if notes.is_empty() {
        println!("No notes yet. Create one with: cloudnotes add \"Title\" body text");
        return Ok(());
    }

    for line in format_note_lines(&notes) {
        println!("{line}");
    }
    Ok(())
}
