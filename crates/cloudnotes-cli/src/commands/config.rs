use std::path::PathBuf;

use cloudnotes_core::util::normalize_text_option;
use serde::Serialize;

use crate::commands::common::CommandContext;
use crate::error::CliError;

#[derive(Debug, Serialize)]
pub struct EffectiveConfig {
    pub config_path: PathBuf,
    pub account: Option<String>,
    pub remote_dir: PathBuf,
    pub database_path: PathBuf,
    pub token_configured: bool,
}

impl From<&CommandContext> for EffectiveConfig {
    fn from(context: &CommandContext) -> Self {
        Self {
            config_path: context.config_path.clone(),
            account: context.settings.account.clone(),
            remote_dir: context.remote_dir.clone(),
            database_path: context.db_path.clone(),
            token_configured: context.token.is_some(),
        }
    }
}

pub fn run_config_show(context: &CommandContext) -> Result<(), CliError> {
    let effective = EffectiveConfig::from(context);
    println!("{}", serde_json::to_string_pretty(&effective)?);
    Ok(())
}

pub fn run_config_set(
    account: Option<String>,
    remote_dir: Option<PathBuf>,
    context: &CommandContext,
) -> Result<(), CliError> {
    if account.is_none() && remote_dir.is_none() {
        return Err(CliError::Config(
            "nothing to set; pass --account or --remote-dir".to_string(),
        ));
    }

    let mut settings = context.stored.clone();
    if let Some(account) = account {
        settings.account = Some(
            normalize_text_option(Some(account))
                .ok_or_else(|| CliError::Config("account cannot be empty".to_string()))?,
        );
    }
    if let Some(remote_dir) = remote_dir {
        settings.remote_dir = Some(remote_dir);
    }

    settings.save_to_path(&context.config_path)?;
    println!("Saved settings to {}", context.config_path.display());
    Ok(())
}
