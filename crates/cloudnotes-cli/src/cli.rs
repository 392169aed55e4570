use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "cloudnotes")]
#[command(about = "Keep local notes in sync with a cloud folder")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Optional path to local database file
    #[arg(long, global = true, value_name = "PATH")]
    pub db_path: Option<PathBuf>,

    /// Optional path to the settings file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a new local note
    #[command(alias = "new")]
    Add {
        /// Note title
        title: String,
        /// Note body
        body: Vec<String>,
    },
    /// Change the title or body of a local note
    Edit {
        /// Note ID
        id: String,
        /// New title
        #[arg(long)]
        title: Option<String>,
        /// New body; keeps the current body when omitted
        body: Vec<String>,
    },
    /// List local notes, most recent first
    List {
        /// Number of notes to show
        #[arg(short, long, default_value = "10")]
        limit: usize,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Run one sync pass against the remote folder
    Sync {
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Inspect the remote folder
    Remote {
        #[command(subcommand)]
        command: RemoteCommands,
    },
    /// Show or change sync settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
pub enum RemoteCommands {
    /// List remote objects for the configured account
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Move a remote object to the trash
    Trash {
        /// Remote object ID
        id: String,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Print effective settings
    Show,
    /// Update persisted settings
    Set {
        /// Sync account identifier
        #[arg(long)]
        account: Option<String>,
        /// Root directory of the remote folder
        #[arg(long, value_name = "PATH")]
        remote_dir: Option<PathBuf>,
    },
}
