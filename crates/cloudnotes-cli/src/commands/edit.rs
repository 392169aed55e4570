use cloudnotes_core::util::normalize_text_option;
use cloudnotes_core::NoteId;

use crate::commands::common::CommandContext;
use crate::error::CliError;

pub fn run_edit(
    id: &str,
    title: Option<&str>,
    body_parts: &[String],
    context: &CommandContext,
) -> Result<(), CliError> {
    if title.is_none() && body_parts.is_empty() {
        return Err(CliError::NothingToEdit);
    }
    let note_id = parse_note_id(id)?;

    let store = context.open_store()?;
    let note = store
        .get(&note_id)?
        .ok_or_else(|| CliError::NoteNotFound(id.to_string()))?;

    let title = match title {
        Some(title) => {
            normalize_text_option(Some(title.to_string())).ok_or(CliError::EmptyTitle)?
        }
        None => note.title,
    };
    let body = if body_parts.is_empty() {
        note.body
    } else {
        body_parts.join(" ").trim().to_string()
    };

    let updated = store.update(&note_id, &title, &body)?;
    println!("{}", updated.id);
    Ok(())
}

pub fn parse_note_id(id: &str) -> Result<NoteId, CliError> {
    id.trim()
        .parse::<NoteId>()
        .map_err(|_| CliError::NoteNotFound(id.to_string()))
}
