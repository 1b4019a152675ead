//! `ironfeed run` command handler
//!
//! Headless ingestion: start the selected feed, wait for it to finish (or
//! for Ctrl-C), then print the run summary and the top-N metrics.

use std::io::Write;

use serde::Serialize;
use tracing::info;

use ironfeed_core::config::IronfeedConfig;
use ironfeed_core::types::RunStatus;
use ironfeed_engine::{ChannelSink, EngineConfig, RunSnapshot};

use crate::cli::RunArgs;
use crate::error::CliError;
use crate::output::{OutputWriter, Render};
use crate::render::{self, MetricsView};
use crate::runtime;

/// Execute the `run` command.
pub async fn execute(
    args: RunArgs,
    config: &IronfeedConfig,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let mut engine_config = EngineConfig::from_core(config)?;
    if args.no_pacing {
        engine_config.pacing_ms = 0;
    }
    let top_n = engine_config.top_n;

    let (sink, events) = ChannelSink::new();
    let context =
        runtime::build_context(config, engine_config, args.cache, sink, args.feed.as_deref())
            .await?;
    let printer = tokio::spawn(render::print_events(events, writer.format(), !args.quiet));

    context.start().await?;
    tokio::select! {
        _ = context.engine().join() => {}
        _ = tokio::signal::ctrl_c() => {
            info!("interrupted, stopping run");
            context.shutdown().await;
        }
    }

    let summary = RunSummary {
        snapshot: context.status().await,
        metrics: MetricsView {
            top_n,
            report: context.show_metrics().await,
        },
    };
    drop(context);
    if let Err(e) = printer.await {
        tracing::warn!(error = %e, "render task ended abnormally");
    }

    writer.render(&summary)?;

    if summary.snapshot.status == RunStatus::Error {
        let reason = summary
            .snapshot
            .last_error
            .clone()
            .unwrap_or_else(|| "feed failed".to_owned());
        return Err(CliError::Feed(reason));
    }
    Ok(())
}

/// Final counters and metrics of a headless run.
#[derive(Debug, Serialize)]
pub struct RunSummary {
    pub snapshot: RunSnapshot,
    pub metrics: MetricsView,
}

impl Render for RunSummary {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        writeln!(w)?;
        self.snapshot.render_text(w)?;
        if self.snapshot.accumulated > 0 {
            writeln!(w)?;
            self.metrics.render_text(w)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ironfeed_engine::MetricsReport;

    fn summary(accumulated: usize) -> RunSummary {
        RunSummary {
            snapshot: RunSnapshot {
                run_id: None,
                feed: Some("URLhaus".to_owned()),
                status: RunStatus::Finished,
                cursor: accumulated,
                processed: accumulated as u64,
                skipped: 1,
                accumulated,
                last_error: None,
            },
            metrics: MetricsView {
                top_n: 5,
                report: MetricsReport {
                    authorities: vec![("http://a.example".to_owned(), accumulated as u64)],
                    reporters: Vec::new(),
                    tags: Vec::new(),
                },
            },
        }
    }

    fn render_text(summary: &RunSummary) -> String {
        colored::control::set_override(false);
        let mut buffer = Vec::new();
        summary.render_text(&mut buffer).expect("render");
        String::from_utf8(buffer).expect("valid UTF-8")
    }

    #[test]
    fn test_summary_includes_counters_and_metrics() {
        let out = render_text(&summary(3));
        assert!(out.contains("Feed: URLhaus"));
        assert!(out.contains("Processed: 3"));
        assert!(out.contains("Skipped:   1"));
        assert!(out.contains("Top 5 URLs:\nhttp://a.example: 3"));
    }

    #[test]
    fn test_summary_without_records_omits_metrics() {
        let out = render_text(&summary(0));
        assert!(!out.contains("Top 5 URLs:"));
    }

    #[test]
    fn test_summary_json_shape() {
        let json = serde_json::to_value(summary(2)).expect("serializable");
        assert_eq!(json["snapshot"]["accumulated"], 2);
        assert_eq!(json["metrics"]["top_n"], 5);
    }
}
