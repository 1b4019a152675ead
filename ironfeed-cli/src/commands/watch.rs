//! `ironfeed watch` command handler
//!
//! Interactive session: operator commands are read from stdin while the
//! engine ingests on its own task and a render task prints its events.

use std::io::Write;
use std::path::PathBuf;

use colored::Colorize;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

use ironfeed_core::config::IronfeedConfig;
use ironfeed_core::types::{FeedFormat, FeedSource};
use ironfeed_engine::{ChannelSink, EngineConfig, EngineContext, FeedEngineError};

use crate::cli::WatchArgs;
use crate::commands::sources::SourcesView;
use crate::error::CliError;
use crate::output::OutputWriter;
use crate::render::{self, MetricsView, SearchView};
use crate::runtime::{self, Fetcher};

const ADD_USAGE: &str = "usage: add <name> <url> <csv|json> [api-key]";

const HELP: &str = "\
Commands:
  start                 start ingesting the selected feed from the beginning
  pause                 pause after the current record
  resume                continue a paused run from where it stopped
  stop                  stop the run (collected records are kept)
  search <text>         case-insensitive search over collected records
  metrics               top URLs, reporters and tags
  export <path>         write collected records to a CSV file
  add <name> <url> <csv|json> [api-key]
                        register a feed (an api-key is verified with one request)
  select <name>         switch to another feed
  sources               list feeds
  status                show run counters
  help                  show this help
  quit                  stop and exit";

/// One line of operator input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCommand {
    Start,
    Stop,
    Pause,
    Resume,
    Search(String),
    Metrics,
    Export(PathBuf),
    Add {
        name: String,
        endpoint: String,
        format: FeedFormat,
        credential: Option<String>,
    },
    Select(String),
    Sources,
    Status,
    Help,
    Quit,
}

impl SessionCommand {
    /// Parse an input line. Blank lines yield `Ok(None)`, malformed ones a usage message.
    pub fn parse(line: &str) -> Result<Option<Self>, String> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }
        let (verb, rest) = match line.split_once(char::is_whitespace) {
            Some((verb, rest)) => (verb, rest.trim()),
            None => (line, ""),
        };

        let command = match verb.to_ascii_lowercase().as_str() {
            "start" => Self::Start,
            "stop" => Self::Stop,
            "pause" => Self::Pause,
            "resume" => Self::Resume,
            "search" | "find" => Self::Search(rest.to_owned()),
            "metrics" | "top" => Self::Metrics,
            "export" => {
                if rest.is_empty() {
                    return Err("usage: export <path>".to_owned());
                }
                Self::Export(PathBuf::from(rest))
            }
            "add" => Self::parse_add(rest)?,
            "select" | "use" => {
                if rest.is_empty() {
                    return Err("usage: select <name>".to_owned());
                }
                Self::Select(rest.to_owned())
            }
            "sources" | "list" => Self::Sources,
            "status" => Self::Status,
            "help" | "?" => Self::Help,
            "quit" | "exit" | "q" => Self::Quit,
            other => return Err(format!("unknown command '{other}' (type 'help')")),
        };
        Ok(Some(command))
    }

    fn parse_add(rest: &str) -> Result<Self, String> {
        let parts: Vec<&str> = rest.split_whitespace().collect();
        let (name, endpoint, format, credential) = match parts.as_slice() {
            [name, endpoint, format] => (*name, *endpoint, *format, None),
            [name, endpoint, format, key] => (*name, *endpoint, *format, Some((*key).to_owned())),
            _ => return Err(ADD_USAGE.to_owned()),
        };
        Ok(Self::Add {
            name: name.to_owned(),
            endpoint: endpoint.to_owned(),
            format: format.parse()?,
            credential,
        })
    }
}

/// Execute the `watch` command.
pub async fn execute(
    args: WatchArgs,
    config: &IronfeedConfig,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let engine_config = EngineConfig::from_core(config)?;
    let (sink, events) = ChannelSink::new();
    let mut context =
        runtime::build_context(config, engine_config, false, sink, args.feed.as_deref()).await?;
    let printer = tokio::spawn(render::print_events(events, writer.format(), true));

    if let Some(feed) = context.selected() {
        println!("{} {}", "Selected feed:".bold(), feed);
    }
    println!("Type 'help' for commands.");

    if args.autostart {
        report(dispatch(&mut context, SessionCommand::Start, writer).await)?;
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted, leaving session");
                break;
            }
        };
        // EOF
        let Some(line) = line else {
            break;
        };

        let command = match SessionCommand::parse(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(usage) => {
                warn_line(&usage);
                continue;
            }
        };
        if command == SessionCommand::Quit {
            break;
        }
        report(dispatch(&mut context, command, writer).await)?;
    }

    context.shutdown().await;
    drop(context);
    if let Err(e) = printer.await {
        tracing::warn!(error = %e, "render task ended abnormally");
    }
    Ok(())
}

/// Apply one command to the session.
pub async fn dispatch(
    context: &mut EngineContext<Fetcher, ChannelSink>,
    command: SessionCommand,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    match command {
        SessionCommand::Start => context.start().await?,
        SessionCommand::Stop => context.stop().await?,
        SessionCommand::Pause => context.pause().await?,
        SessionCommand::Resume => context.resume().await?,
        SessionCommand::Search(query) => {
            let outcome = context.search(&query).await?;
            // the engine reports "no results" through the render task
            if !outcome.is_empty() {
                writer.render(&SearchView::new(&query, outcome))?;
            }
        }
        SessionCommand::Metrics => {
            let view = MetricsView {
                top_n: context.engine().config().top_n,
                report: context.show_metrics().await,
            };
            writer.render(&view)?;
        }
        SessionCommand::Export(path) => {
            let summary = context.export(path).await?;
            writer.render(&summary)?;
        }
        SessionCommand::Add {
            name,
            endpoint,
            format,
            credential,
        } => {
            let source = FeedSource::new(name, endpoint, format, credential)
                .map_err(FeedEngineError::from)?;
            let label = source.to_string();
            if source.has_credential() {
                context.add_source_verified(source).await?;
            } else {
                context.add_source(source)?;
            }
            println!("{} {}", "Added feed:".green(), label);
        }
        SessionCommand::Select(name) => {
            let source = context.select_source(&name).await?;
            println!("{} {}", "Selected feed:".bold(), source);
        }
        SessionCommand::Sources => {
            let view = SourcesView::new(
                context.sources(),
                context.selected().map(|s| s.name.as_str()),
            );
            writer.render(&view)?;
        }
        SessionCommand::Status => writer.render(&context.status().await)?,
        SessionCommand::Help | SessionCommand::Quit => println!("{HELP}"),
    }
    Ok(())
}

/// Rejected commands are warnings in an interactive session; only output failures end it.
fn report(result: Result<(), CliError>) -> Result<(), CliError> {
    match result {
        Ok(()) => Ok(()),
        Err(e @ CliError::Io(_)) => Err(e),
        Err(e) => {
            warn_line(&e.to_string());
            Ok(())
        }
    }
}

fn warn_line(message: &str) {
    let stderr = std::io::stderr();
    let mut handle = stderr.lock();
    let _ = writeln!(handle, "{} {}", "warning:".yellow().bold(), message);
}
