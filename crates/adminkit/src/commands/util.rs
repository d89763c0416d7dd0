//! Shared helpers for command handlers.

use std::io::IsTerminal;
use std::path::PathBuf;
use std::time::Duration;

use adminkit_api::ApiClient;
use adminkit_config::Config;

use crate::cli::GlobalOpts;
use crate::error::CliError;

/// The config file in effect: `--config`, else the platform default.
pub fn config_file(global: &GlobalOpts) -> PathBuf {
    global
        .config
        .clone()
        .unwrap_or_else(adminkit_config::config_path)
}

pub fn load_config(global: &GlobalOpts) -> Result<Config, CliError> {
    Ok(adminkit_config::load_config_from(&config_file(global))?)
}

/// Load config and build an API client, applying CLI overrides.
pub fn connect(global: &GlobalOpts) -> Result<(Config, ApiClient), CliError> {
    let config = load_config(global)?;

    let base_url = match (&global.base_url, &config.api.base_url) {
        (Some(url), _) => url.clone(),
        (None, Some(_)) => config.base_url()?.to_string(),
        (None, None) => {
            return Err(CliError::NoBaseUrl {
                path: config_file(global).display().to_string(),
            });
        }
    };

    let mut transport = config.transport_config()?;
    if let Some(secs) = global.timeout {
        transport.timeout = Duration::from_secs(secs.max(1));
    }

    let client = ApiClient::new(&base_url, &transport)?;
    tracing::debug!(base_url = %client.base_url(), "api client ready");
    Ok((config, client))
}

/// Prompt for confirmation, auto-approving if `--yes` was passed.
pub fn confirm(message: &str, action: &str, yes_flag: bool) -> Result<bool, CliError> {
    if yes_flag {
        return Ok(true);
    }
    if !std::io::stdin().is_terminal() {
        return Err(CliError::NonInteractiveRequiresYes {
            action: action.into(),
        });
    }
    let confirmed = dialoguer::Confirm::new()
        .with_prompt(message)
        .default(false)
        .interact()
        .map_err(|e| CliError::Io(std::io::Error::other(e)))?;
    Ok(confirmed)
}
