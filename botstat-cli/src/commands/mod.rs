//! Subcommand handlers

pub mod bots;
pub mod config;
pub mod detect;
pub mod report;

use std::path::Path;

use botstat_core::config::{BotstatConfig, DEFAULT_CONFIG_PATH};
use botstat_core::error::BotstatError;

/// Load the configuration the way every subcommand sees it.
///
/// An explicit path must exist; the default path is optional.
pub async fn load_config(explicit: Option<&Path>) -> Result<BotstatConfig, BotstatError> {
    match explicit {
        Some(path) => BotstatConfig::load(path).await,
        None => BotstatConfig::load_or_default(DEFAULT_CONFIG_PATH).await,
    }
}

/// Human-readable name of the configuration source.
pub fn config_source(explicit: Option<&Path>) -> String {
    explicit
        .map(|path| path.display().to_string())
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_owned())
}
