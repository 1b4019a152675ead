//! CLI argument parsing using clap derive API
//!
//! This module defines the command-line interface structure using clap's derive macros.
//! It is purely declarative with no side effects or I/O.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Ironfeed -- resumable threat-intelligence feed viewer.
///
/// Use `ironfeed <COMMAND> --help` for subcommand details.
#[derive(Parser, Debug)]
#[command(name = "ironfeed", version, about, long_about = None)]
pub struct Cli {
    /// Path to the ironfeed.toml configuration file.
    #[arg(short, long, default_value = "ironfeed.toml")]
    pub config: PathBuf,

    /// Override log level (trace, debug, info, warn, error).
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Output format.
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Supported output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    Text,
    /// Machine-readable JSON.
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Open an interactive session (start, pause, resume, stop, search, metrics, export).
    Watch(WatchArgs),

    /// Ingest one feed to completion and print the summary.
    Run(RunArgs),

    /// Download a feed and write its valid records to a CSV file.
    Export(ExportArgs),

    /// Inspect configured feed sources.
    Sources(SourcesArgs),

    /// Manage configuration.
    Config(ConfigArgs),
}

// ---- watch ----

/// Interactive ingestion session.
#[derive(Args, Debug)]
pub struct WatchArgs {
    /// Feed to select on startup (default: ingest.default_feed or the first feed).
    #[arg(short, long)]
    pub feed: Option<String>,

    /// Start ingesting immediately instead of waiting for `start`.
    #[arg(long)]
    pub autostart: bool,
}

// ---- run ----

/// Headless ingestion run.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Feed to ingest (default: ingest.default_feed or the first feed).
    #[arg(short, long)]
    pub feed: Option<String>,

    /// Disable the delay between rendered records.
    #[arg(long)]
    pub no_pacing: bool,

    /// Serve the payload from the daily cache when fresh.
    #[arg(long)]
    pub cache: bool,

    /// Print only the summary, not every record.
    #[arg(short, long)]
    pub quiet: bool,
}

// ---- export ----

/// One-shot export.
#[derive(Args, Debug)]
pub struct ExportArgs {
    /// Destination CSV file.
    #[arg(value_name = "PATH")]
    pub path: PathBuf,

    /// Feed to export (default: ingest.default_feed or the first feed).
    #[arg(short, long)]
    pub feed: Option<String>,

    /// Serve the payload from the daily cache when fresh.
    #[arg(long)]
    pub cache: bool,
}

// ---- sources ----

/// Inspect configured feed sources.
#[derive(Args, Debug)]
pub struct SourcesArgs {
    #[command(subcommand)]
    pub action: SourcesAction,
}

#[derive(Subcommand, Debug)]
pub enum SourcesAction {
    /// List configured feeds.
    List,
    /// Probe a feed with one request (uses its credential when set).
    Check {
        /// Feed name.
        name: String,
    },
}

// ---- config ----

/// Manage ironfeed configuration.
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
        /// Show only a specific section (general, ingest, cache, feeds).
        #[arg(long)]
        section: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_debug_assert() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_cli_parse_watch_defaults() {
        let cli = Cli::try_parse_from(["ironfeed", "watch"]).expect("parse succeeded");
        assert_eq!(cli.config, PathBuf::from("ironfeed.toml"));
        assert_eq!(cli.output, OutputFormat::Text);
        match cli.command {
            Commands::Watch(args) => {
                assert!(args.feed.is_none(), "feed should default to None");
                assert!(!args.autostart, "autostart should default to false");
            }
            _ => panic!("expected Watch command"),
        }
    }

    #[test]
    fn test_cli_parse_run_flags() {
        let cli = Cli::try_parse_from([
            "ironfeed",
            "run",
            "--feed",
            "ThreatFox",
            "--no-pacing",
            "--cache",
            "-q",
        ])
        .expect("parse succeeded");
        match cli.command {
            Commands::Run(args) => {
                assert_eq!(args.feed.as_deref(), Some("ThreatFox"));
                assert!(args.no_pacing);
                assert!(args.cache);
                assert!(args.quiet);
            }
            _ => panic!("expected Run command"),
        }
    }

    #[test]
    fn test_cli_parse_export_requires_path() {
        assert!(Cli::try_parse_from(["ironfeed", "export"]).is_err());
        let cli = Cli::try_parse_from(["ironfeed", "export", "out.csv"]).expect("parse succeeded");
        match cli.command {
            Commands::Export(args) => assert_eq!(args.path, PathBuf::from("out.csv")),
            _ => panic!("expected Export command"),
        }
    }

    #[test]
    fn test_cli_parse_export_path_with_json_output() {
        let cli = Cli::try_parse_from(["ironfeed", "export", "out.csv", "--output", "json"])
            .expect("parse succeeded");
        assert_eq!(cli.output, OutputFormat::Json);
        match cli.command {
            Commands::Export(args) => {
                assert_eq!(args.path, PathBuf::from("out.csv"));
                assert!(args.feed.is_none());
            }
            _ => panic!("expected Export command"),
        }
    }

    #[test]
    fn test_cli_parse_sources_check() {
        let cli =
            Cli::try_parse_from(["ironfeed", "sources", "check", "URLhaus"]).expect("parse succeeded");
        match cli.command {
            Commands::Sources(SourcesArgs {
                action: SourcesAction::Check { name },
            }) => assert_eq!(name, "URLhaus"),
            _ => panic!("expected Sources Check command"),
        }
    }

    #[test]
    fn test_cli_parse_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "ironfeed",
            "config",
            "show",
            "--section",
            "ingest",
            "--output",
            "json",
            "--log-level",
            "debug",
        ])
        .expect("parse succeeded");
        assert_eq!(cli.output, OutputFormat::Json);
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
        match cli.command {
            Commands::Config(ConfigArgs {
                action: ConfigAction::Show { section },
            }) => assert_eq!(section.as_deref(), Some("ingest")),
            _ => panic!("expected Config Show command"),
        }
    }

    #[test]
    fn test_cli_rejects_unknown_output_format() {
        assert!(Cli::try_parse_from(["ironfeed", "--output", "xml", "watch"]).is_err());
    }
}
