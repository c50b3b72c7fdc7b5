//! Config command implementation.

use crate::cli::{mask_secret, ConfigAction, Output};
use crate::config::Settings;
use anyhow::Result;
use std::path::PathBuf;

/// Run the config command.
///
/// `show` prints the effective settings, environment overrides included;
/// `set` edits only what is in the file.
pub fn run_config(action: &ConfigAction, config_path: PathBuf) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let mut settings = Settings::load_from(Some(&config_path))?;
            settings.apply_env();
            if let Some(key) = &settings.youtube.api_key {
                settings.youtube.api_key = Some(mask_secret(key));
            }
            let toml_str = toml::to_string_pretty(&settings)
                .map_err(|e| anyhow::anyhow!("Failed to serialize config: {}", e))?;
            println!("{}", toml_str);
        }

        ConfigAction::Set { key, value } => {
            let mut settings = Settings::load_from(Some(&config_path))?;
            settings.set_value(key, value)?;
            settings.save_to(&config_path)?;
            Output::success(&format!("Set {} in {}", key, config_path.display()));
        }

        ConfigAction::Path => {
            println!("{}", config_path.display());
        }
    }

    Ok(())
}
