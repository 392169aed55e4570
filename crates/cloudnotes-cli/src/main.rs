//! Cloud Notes CLI - keep a local note database in sync with a cloud folder

mod cli;
mod commands;
mod error;


use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands, ConfigCommands, RemoteCommands};
use crate::commands::common::CommandContext;
use crate::error::CliError;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("cloudnotes=info")),
        )
        .init();

    let cli = Cli::parse();
    let context = CommandContext::resolve(cli.config, cli.db_path)?;

    match cli.command {
        Commands::Add { title, body } => commands::add::run_add(&title, &body, &context)?,
        Commands::Edit { id, title, body } => {
            commands::edit::run_edit(&id, title.as_deref(), &body, &context)?;
        }
        Commands::List { limit, json } => commands::list::run_list(limit, json, &context)?,
        Commands::Sync { json } => commands::sync::run_sync(json, &context).await?,
        Commands::Remote { command } => match command {
            RemoteCommands::List { json } => commands::remote::run_remote_list(json, &context)?,
            RemoteCommands::Trash { id } => commands::remote::run_remote_trash(&id, &context)?,
        },
        Commands::Config { command } => match command {
            ConfigCommands::Show => commands::config::run_config_show(&context)?,
            ConfigCommands::Set {
                account,
                remote_dir,
            } => commands::config::run_config_set(account, remote_dir, &context)?,
        },
    }

    Ok(())
}
