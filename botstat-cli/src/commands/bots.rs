//! `botstat bots` command handler

use std::io::Write;

use serde::Serialize;

use botstat_core::config::BotstatConfig;
use botstat_log_pipeline::BotCatalog;

use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `bots` command.
pub fn execute(config: &BotstatConfig, writer: &OutputWriter) -> Result<(), CliError> {
    writer.render(&BotListReport::from_config(config))
}

/// Active bot catalog in match order.
#[derive(Serialize)]
pub struct BotListReport {
    /// "builtin" or "config"
    pub catalog: &'static str,
    pub bots: Vec<BotListEntry>,
}

#[derive(Serialize)]
pub struct BotListEntry {
    /// Case-insensitive user-agent substring
    pub signature: String,
    pub name: String,
}

impl BotListReport {
    pub fn from_config(config: &BotstatConfig) -> Self {
        let catalog = BotCatalog::from_entries(&config.bots);
        Self {
            catalog: if config.bots.is_empty() {
                "builtin"
            } else {
                "config"
            },
            bots: catalog
                .entries()
                .map(|(signature, name)| BotListEntry {
                    signature: signature.to_owned(),
                    name: name.to_owned(),
                })
                .collect(),
        }
    }
}

impl Render for BotListReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        writeln!(w, "Bot catalog ({}), first match wins:", self.catalog.bold())?;
        writeln!(w, "{:<4} {:<20} Name", "#", "Signature")?;
        writeln!(w, "{}", "-".repeat(40))?;
        for (idx, bot) in self.bots.iter().enumerate() {
            writeln!(w, "{:<4} {:<20} {}", idx + 1, bot.signature, bot.name)?;
        }
        Ok(())
    }
}
