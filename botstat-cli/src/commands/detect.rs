//! `botstat detect` command handler

use std::io::Write;
use std::path::Path;

use serde::Serialize;

use botstat_core::config::BotstatConfig;
use botstat_log_pipeline::NginxLocator;
use botstat_log_pipeline::NginxConfig;
use botstat_log_pipeline::discover::locate_config;

use crate::cli::DetectArgs;
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `detect` command.
///
/// Reads the nginx config (explicit path or the one reported by `nginx -V`)
/// and lists every access log in the numbering `--choose` accepts.
pub async fn execute(
    args: DetectArgs,
    mut config: BotstatConfig,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    if let Some(path) = args.nginx_config {
        config.source.nginx_config = Some(path);
    }
    if let Some(binary) = args.nginx_binary {
        config.source.nginx_binary = binary;
    }
    config.validate()?;

    let locator = NginxLocator::from_config(&config.source);
    let nginx = locate_config(config.source.nginx_config.as_deref().map(Path::new), &locator).await?;

    writer.render(&DetectReport::from_config(&nginx))?;
    Ok(())
}

/// Access logs and log formats found in an nginx config.
#[derive(Serialize)]
pub struct DetectReport {
    /// Config file path
    pub config: String,
    pub access_logs: Vec<AccessLogEntry>,
    pub log_formats: Vec<LogFormatEntry>,
}

#[derive(Serialize)]
pub struct AccessLogEntry {
    /// 1-based number accepted by `--choose`
    pub index: usize,
    pub path: String,
    pub format: String,
    /// Whether the format is declared in the config or is a preset
    pub format_known: bool,
}

#[derive(Serialize)]
pub struct LogFormatEntry {
    pub name: String,
    pub template: String,
}

impl DetectReport {
    pub fn from_config(nginx: &NginxConfig) -> Self {
        Self {
            config: nginx.source().to_owned(),
            access_logs: nginx
                .access_logs()
                .iter()
                .enumerate()
                .map(|(idx, decl)| AccessLogEntry {
                    index: idx + 1,
                    path: decl.path.clone(),
                    format: decl.format_name.clone(),
                    format_known: nginx.format_template(&decl.format_name).is_some(),
                })
                .collect(),
            log_formats: nginx
                .log_formats()
                .iter()
                .map(|decl| LogFormatEntry {
                    name: decl.name.clone(),
                    template: decl.template.clone(),
                })
                .collect(),
        }
    }
}

impl Render for DetectReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        writeln!(w, "nginx config: {}", self.config.bold())?;
        writeln!(w)?;

        if self.access_logs.is_empty() {
            writeln!(w, "{}", "No access_log directives found.".yellow())?;
        } else {
            writeln!(w, "{:<4} {:<20} Path", "#", "Format")?;
            writeln!(w, "{}", "-".repeat(72))?;
            for log in &self.access_logs {
                let format = if log.format_known {
                    log.format.normal()
                } else {
                    log.format.red()
                };
                writeln!(w, "{:<4} {:<20} {}", log.index, format, log.path)?;
            }
        }

        if !self.log_formats.is_empty() {
            writeln!(w)?;
            writeln!(w, "Log formats:")?;
            for format in &self.log_formats {
                writeln!(w, "  {}: {}", format.name.bold(), format.template)?;
            }
        }

        Ok(())
    }
}
