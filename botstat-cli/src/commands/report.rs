//! `botstat report` command handler

use std::io::{IsTerminal, Write};

use serde::Serialize;
use tracing::info;

use botstat_core::config::BotstatConfig;
use botstat_log_pipeline::{
    AccessLogPipelineBuilder, IngestStats, PipelineConfig, RowSummary, resolve_source,
};

use crate::cli::ReportArgs;
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Host name used when neither the log nor the flags provide one.
const FALLBACK_HOST: &str = "localhost";

/// Execute the `report` command.
///
/// Resolves the access log and its format, streams the log on a blocking
/// thread and renders the aggregated rows.
pub async fn execute(
    args: ReportArgs,
    mut config: BotstatConfig,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    args.source.apply(&mut config);
    args.filter.apply(&mut config);
    config.validate()?;

    let today = chrono::Local::now().date_naive();
    let pipeline_config = PipelineConfig::from_core(&config, today)?;

    let stdin_piped = !std::io::stdin().is_terminal();
    let source = resolve_source(&pipeline_config, stdin_piped).await?;

    let host = args
        .host
        .or_else(local_hostname)
        .unwrap_or_else(|| FALLBACK_HOST.to_owned());
    let format_name = source.format.name().to_owned();
    let pipeline = AccessLogPipelineBuilder::new(source.format)
        .config(&pipeline_config)
        .fallback_host(host)
        .build()?;

    let input = source.input;
    let input_name = input.to_string();
    let result = tokio::task::spawn_blocking(move || pipeline.run_input(&input))
        .await
        .map_err(|e| CliError::Command(format!("ingest task failed: {e}")))??;

    info!(
        rows = result.table.len(),
        counted = result.stats.counted,
        "report ready"
    );

    let report = BotReport {
        source: input_name,
        log_format: format_name,
        start_date: pipeline_config
            .start_date
            .map(|date| date.format("%Y/%m/%d").to_string()),
        stats: result.stats,
        show_stats: args.stats,
        rows: result.table.summaries(),
    };
    writer.render(&report)?;

    Ok(())
}

#[cfg(unix)]
fn local_hostname() -> Option<String> {
    let mut buf = [0u8; 256];
    // SAFETY: buf is valid for writes of buf.len() bytes.
    let rc = unsafe { libc::gethostname(buf.as_mut_ptr().cast(), buf.len()) };
    if rc != 0 {
        return None;
    }
    let len = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
    String::from_utf8(buf[..len].to_vec())
        .ok()
        .filter(|name| !name.is_empty())
}

#[cfg(not(unix))]
fn local_hostname() -> Option<String> {
    None
}

/// Aggregated bot traffic.
#[derive(Serialize)]
pub struct BotReport {
    /// Access log path or "stdin"
    pub source: String,
    /// Log format name
    pub log_format: String,
    /// Inclusive start date (YYYY/MM/DD)
    pub start_date: Option<String>,
    pub stats: IngestStats,
    /// Whether the text rendering includes `stats`
    #[serde(skip)]
    pub show_stats: bool,
    pub rows: Vec<RowSummary>,
}

impl Render for BotReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        write!(
            w,
            "Bot traffic: {} (format: {})",
            self.source.bold(),
            self.log_format
        )?;
        match &self.start_date {
            Some(date) => writeln!(w, " since {date}")?,
            None => writeln!(w)?,
        }
        writeln!(w)?;

        if self.rows.is_empty() {
            writeln!(w, "{}", "No bot traffic found.".yellow())?;
        } else {
            writeln!(
                w,
                "{:<10} {:<12} {:<24} {:>7} {:>7} {:>7} {:>7} {:>8} {:>8} {:>8} {:>10} {:>12} {:>12}",
                "Date",
                "Bot",
                "Host",
                "2xx",
                "3xx",
                "4xx",
                "5xx",
                "All",
                "Avg ms",
                "2xx ms",
                "Time s",
                "Bytes",
                "Avg bytes"
            )?;
            writeln!(w, "{}", "-".repeat(144))?;

            for row in &self.rows {
                let errors = if row.hits_5xx > 0 {
                    row.hits_5xx.to_string().red()
                } else {
                    row.hits_5xx.to_string().normal()
                };
                writeln!(
                    w,
                    "{:<10} {:<12} {:<24} {:>7} {:>7} {:>7} {:>7} {:>8} {:>8} {:>8} {:>10.3} {:>12} {:>12.1}",
                    row.date,
                    row.bot,
                    row.host,
                    row.hits_2xx,
                    row.hits_3xx,
                    row.hits_4xx,
                    errors,
                    row.hits_total,
                    row.avg_time_ms,
                    row.avg_time_2xx_ms,
                    row.total_time,
                    row.bytes_total,
                    row.avg_bytes
                )?;
            }
        }

        if self.show_stats {
            let s = &self.stats;
            writeln!(w)?;
            writeln!(w, "Lines read:       {}", s.lines)?;
            writeln!(w, "Unmatched:        {}", s.unmatched)?;
            writeln!(w, "Before start:     {}", s.before_start)?;
            writeln!(w, "Not a bot:        {}", s.not_bot)?;
            writeln!(w, "Bad timestamp:    {}", s.bad_timestamp)?;
            writeln!(w, "Counted:          {}", s.counted.to_string().green())?;
        }

        Ok(())
    }
}
