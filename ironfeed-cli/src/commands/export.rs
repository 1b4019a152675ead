//! `ironfeed export` command handler

use std::io::Write;

use tracing::info;

use ironfeed_core::config::IronfeedConfig;
use ironfeed_core::types::RunStatus;
use ironfeed_engine::{ChannelSink, EngineConfig, ExportSummary};

use crate::cli::ExportArgs;
use crate::error::CliError;
use crate::output::{OutputWriter, Render};
use crate::runtime;

/// Execute the `export` command.
///
/// Ingests the whole feed without pacing or rendering, then writes the
/// collected records to `args.path`.
pub async fn execute(
    args: ExportArgs,
    config: &IronfeedConfig,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let mut engine_config = EngineConfig::from_core(config)?;
    engine_config.pacing_ms = 0;

    // nothing is rendered; a closed channel makes every emit a no-op
    let (sink, events) = ChannelSink::new();
    drop(events);

    let context =
        runtime::build_context(config, engine_config, args.cache, sink, args.feed.as_deref())
            .await?;
    context.start().await?;
    context.engine().join().await;

    let snapshot = context.status().await;
    if snapshot.status == RunStatus::Error {
        return Err(CliError::Feed(
            snapshot
                .last_error
                .unwrap_or_else(|| "feed failed".to_owned()),
        ));
    }

    info!(
        feed = snapshot.feed.as_deref().unwrap_or_default(),
        records = snapshot.accumulated,
        path = %args.path.display(),
        "exporting collected records"
    );
    let summary = context.export(args.path).await?;
    writer.render(&summary)
}

impl Render for ExportSummary {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        writeln!(
            w,
            "{} {} record(s) to {}",
            "Exported".green().bold(),
            self.rows,
            self.path.display()
        )?;
        writeln!(w, "  Columns: {}", self.columns.join(", "))
    }
}
