use cloudnotes_core::util::normalize_text_option;

use crate::commands::common::CommandContext;
use crate::error::CliError;

pub fn run_add(title: &str, body_parts: &[String], context: &CommandContext) -> Result<(), CliError> {
    let (title, body) = resolve_note_input(title, body_parts)?;

    let store = context.open_store()?;
    let note = store.create(&title, &body)?;

    println!("{}", note.id);
    Ok(())
}

pub fn resolve_note_input(title: &str, body_parts: &[String]) -> Result<(String, String), CliError> {
    let title = normalize_text_option(Some(title.to_string())).ok_or(CliError::EmptyTitle)?;
    let body = body_parts.join(" ").trim().to_string();
    Ok((title, body))
}
