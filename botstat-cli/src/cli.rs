//! CLI argument parsing using clap derive API
//!
//! This module defines the command-line interface structure using clap's derive macros.
//! It is purely declarative with no side effects or I/O, apart from
//! [`SourceArgs::apply`] / [`FilterArgs::apply`] which fold flags into a loaded config.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use botstat_core::config::BotstatConfig;
use botstat_core::types::ServerType;

/// botstat -- search bot traffic statistics from web server access logs.
///
/// Use `botstat <COMMAND> --help` for subcommand details.
#[derive(Parser, Debug)]
#[command(name = "botstat", version, about, long_about = None)]
pub struct Cli {
    /// Path to the botstat.toml configuration file (default: /etc/botstat.toml if present).
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Override log level (trace, debug, info, warn, error).
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Log progress at info level.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Log details at debug level.
    #[arg(long, global = true)]
    pub debug: bool,

    /// Output format.
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Log level requested on the command line, if any.
    ///
    /// `--log-level` wins over `--debug`, which wins over `--verbose`.
    pub fn requested_log_level(&self) -> Option<&str> {
        if let Some(level) = self.log_level.as_deref() {
            Some(level)
        } else if self.debug {
            Some("debug")
        } else if self.verbose {
            Some("info")
        } else {
            None
        }
    }
}

/// Supported output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table / text output.
    Text,
    /// Machine-readable JSON.
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Aggregate bot traffic from an access log.
    Report(ReportArgs),

    /// List access logs and log formats declared in the nginx config.
    Detect(DetectArgs),

    /// Show the bot catalog in match order.
    Bots,

    /// Manage configuration.
    Config(ConfigArgs),
}

// ---- shared ----

/// Where the access log and its format come from.
#[derive(Args, Debug, Default, Clone)]
pub struct SourceArgs {
    /// Web server type (nginx, apache).
    #[arg(long)]
    pub server_type: Option<ServerType>,

    /// Access log file ("-" for stdin).
    #[arg(short = 'l', long)]
    pub access_log: Option<String>,

    /// Log format: preset name (combined, common, vhost_combined) or template.
    #[arg(short = 'f', long)]
    pub log_format: Option<String>,

    /// nginx config file used for detection.
    #[arg(long)]
    pub nginx_config: Option<String>,

    /// nginx binary queried with -V to locate the config.
    #[arg(long)]
    pub nginx_binary: Option<String>,

    /// Pick one of several access logs (1-based number or path).
    #[arg(long)]
    pub choose: Option<String>,
}

impl SourceArgs {
    /// Fold the flags into `[source]`.
    pub fn apply(&self, config: &mut BotstatConfig) {
        let source = &mut config.source;
        if let Some(server_type) = self.server_type {
            source.server_type = server_type;
        }
        if let Some(path) = &self.access_log {
            source.access_log = Some(path.clone());
        }
        if let Some(format) = &self.log_format {
            source.log_format = Some(format.clone());
        }
        if let Some(path) = &self.nginx_config {
            source.nginx_config = Some(path.clone());
        }
        if let Some(binary) = &self.nginx_binary {
            source.nginx_binary = binary.clone();
        }
        if let Some(choice) = &self.choose {
            source.access_log_choice = Some(choice.clone());
        }
    }
}

/// Start date cutoff.
#[derive(Args, Debug, Default, Clone)]
pub struct FilterArgs {
    /// First date to include (e.g. 2018/03/21).
    #[arg(long, conflicts_with = "day_start")]
    pub date_start: Option<String>,

    /// Include records from this many days before today.
    #[arg(long)]
    pub day_start: Option<u32>,
}

impl FilterArgs {
    /// Fold the flags into `[filter]`. A flag replaces both config keys.
    pub fn apply(&self, config: &mut BotstatConfig) {
        if self.date_start.is_some() || self.day_start.is_some() {
            config.filter.date_start = self.date_start.clone();
            config.filter.day_start = self.day_start;
        }
    }
}

// ---- report ----

/// Aggregate bot traffic from an access log.
#[derive(Args, Debug)]
pub struct ReportArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    #[command(flatten)]
    pub filter: FilterArgs,

    /// Host name used when the log format has no host field (default: this machine).
    #[arg(long)]
    pub host: Option<String>,

    /// Also print ingest counters.
    #[arg(long)]
    pub stats: bool,
}

// ---- detect ----

/// List access logs and log formats declared in the nginx config.
#[derive(Args, Debug)]
pub struct DetectArgs {
    /// nginx config file (default: ask the nginx binary).
    #[arg(long)]
    pub nginx_config: Option<String>,

    /// nginx binary queried with -V to locate the config.
    #[arg(long)]
    pub nginx_binary: Option<String>,
}

// ---- config ----

/// Manage botstat configuration.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Validate the configuration file and report errors.
    Validate,
    /// Show the effective configuration (file + env overrides + defaults).
    Show {
        /// Show only a specific section (general, source, filter, bots).
        #[arg(long)]
        section: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_verify_structure() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_cli_parse_report_defaults() {
        let cli = Cli::try_parse_from(["botstat", "report"]).expect("parse succeeded");
        assert_eq!(cli.output, OutputFormat::Text);
        assert!(cli.config.is_none());
        match cli.command {
            Commands::Report(args) => {
                assert!(args.source.access_log.is_none());
                assert!(args.filter.date_start.is_none());
                assert!(!args.stats);
            }
            _ => panic!("expected Report command"),
        }
    }

    #[test]
    fn test_cli_parse_report_full() {
        let cli = Cli::try_parse_from([
            "botstat",
            "report",
            "--server-type",
            "apache",
            "-l",
            "/var/log/apache2/access.log",
            "-f",
            "combined",
            "--day-start",
            "3",
            "--host",
            "web01",
        ])
        .expect("parse succeeded");
        match cli.command {
            Commands::Report(args) => {
                assert_eq!(args.source.server_type, Some(ServerType::Apache));
                assert_eq!(
                    args.source.access_log.as_deref(),
                    Some("/var/log/apache2/access.log")
                );
                assert_eq!(args.source.log_format.as_deref(), Some("combined"));
                assert_eq!(args.filter.day_start, Some(3));
                assert_eq!(args.host.as_deref(), Some("web01"));
            }
            _ => panic!("expected Report command"),
        }
    }

    #[test]
    fn test_cli_parse_invalid_server_type() {
        let result = Cli::try_parse_from(["botstat", "report", "--server-type", "iis"]);
        assert!(result.is_err(), "unknown server type should be rejected");
    }

    #[test]
    fn test_cli_date_start_conflicts_with_day_start() {
        let result = Cli::try_parse_from([
            "botstat",
            "report",
            "--date-start",
            "2018/03/21",
            "--day-start",
            "2",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_parse_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["botstat", "bots", "--output", "json", "--debug"])
            .expect("parse succeeded");
        assert_eq!(cli.output, OutputFormat::Json);
        assert!(matches!(cli.command, Commands::Bots));
        assert_eq!(cli.requested_log_level(), Some("debug"));
    }

    #[test]
    fn test_requested_log_level_precedence() {
        let cli = Cli::try_parse_from(["botstat", "-v", "--log-level", "trace", "bots"])
            .expect("parse succeeded");
        assert_eq!(cli.requested_log_level(), Some("trace"));

        let cli = Cli::try_parse_from(["botstat", "-v", "bots"]).expect("parse succeeded");
        assert_eq!(cli.requested_log_level(), Some("info"));

        let cli = Cli::try_parse_from(["botstat", "bots"]).expect("parse succeeded");
        assert_eq!(cli.requested_log_level(), None);
    }

    #[test]
    fn test_cli_parse_config_show_section() {
        let cli = Cli::try_parse_from(["botstat", "config", "show", "--section", "source"])
            .expect("parse succeeded");
        match cli.command {
            Commands::Config(args) => match args.action {
                ConfigAction::Show { section } => assert_eq!(section.as_deref(), Some("source")),
                _ => panic!("expected Show action"),
            },
            _ => panic!("expected Config command"),
        }
    }

    #[test]
    fn test_source_args_apply_overrides_config() {
        let mut config = BotstatConfig::default();
        config.source.access_log = Some("/from/file.log".to_owned());

        let args = SourceArgs {
            access_log: Some("-".to_owned()),
            nginx_binary: Some("/usr/sbin/nginx".to_owned()),
            choose: Some("2".to_owned()),
            ..SourceArgs::default()
        };
        args.apply(&mut config);

        assert_eq!(config.source.access_log.as_deref(), Some("-"));
        assert_eq!(config.source.nginx_binary, "/usr/sbin/nginx");
        assert_eq!(config.source.access_log_choice.as_deref(), Some("2"));
        assert_eq!(config.source.server_type, ServerType::Nginx);
    }

    #[test]
    fn test_filter_args_replace_both_keys() {
        let mut config = BotstatConfig::default();
        config.filter.date_start = Some("2018/01/01".to_owned());

        FilterArgs {
            date_start: None,
            day_start: Some(7),
        }
        .apply(&mut config);
        assert_eq!(config.filter.date_start, None);
        assert_eq!(config.filter.day_start, Some(7));

        FilterArgs::default().apply(&mut config);
        assert_eq!(config.filter.day_start, Some(7));
    }
}
