//! ironfeed -- resumable threat-intelligence feed viewer
//!
//! Command-line surface over `ironfeed-engine`: an interactive session
//! (`watch`), headless runs (`run`, `export`), feed inspection and
//! configuration management.

mod cli;
mod commands;
mod error;
mod logging;
mod output;
mod render;
mod runtime;

use std::process::ExitCode;

use clap::Parser;
use colored::Colorize;

use ironfeed_core::config::{GeneralConfig, IronfeedConfig};

use crate::cli::{Cli, Commands};
use crate::error::CliError;
use crate::output::OutputWriter;

fn main() -> ExitCode {
    let cli = Cli::parse();

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            report_error(&CliError::Io(e));
            return ExitCode::from(10);
        }
    };

    let result = runtime.block_on(run(cli));
    // stdin reads run on a blocking thread that cannot be interrupted
    runtime.shutdown_background();

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            report_error(&e);
            ExitCode::from(u8::try_from(e.exit_code()).unwrap_or(1))
        }
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let writer = OutputWriter::new(cli.output);

    // `config` loads the file itself so a broken file can be reported, not fatal
    if let Commands::Config(args) = cli.command {
        let mut general = GeneralConfig::default();
        if let Some(level) = cli.log_level {
            general.log_level = level;
        }
        init_logging(&general)?;
        return commands::config::execute(args, &cli.config, &writer).await;
    }

    let mut config = IronfeedConfig::load_or_default(&cli.config).await?;
    if let Some(level) = cli.log_level {
        config.general.log_level = level;
    }
    init_logging(&config.general)?;
    ironfeed_core::metrics::describe_all();

    tracing::debug!(
        config = %cli.config.display(),
        feeds = config.feeds.len(),
        "ironfeed starting"
    );

    match cli.command {
        Commands::Watch(args) => commands::watch::execute(args, &config, &writer).await,
        Commands::Run(args) => commands::run::execute(args, &config, &writer).await,
        Commands::Export(args) => commands::export::execute(args, &config, &writer).await,
        Commands::Sources(args) => commands::sources::execute(args, &config, &writer).await,
        Commands::Config(_) => Ok(()),
    }
}

fn init_logging(general: &GeneralConfig) -> Result<(), CliError> {
    logging::init_tracing(general).map_err(|e| CliError::Config(e.to_string()))
}

fn report_error(e: &CliError) {
    eprintln!("{} {}", "error:".red().bold(), e);
}
