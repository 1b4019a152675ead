//! Terminal rendering of engine events, search results and metrics.
//!
//! Records are printed as banner-separated blocks:
//!
//! ```text
//! ################################################################################
//! Threat 3:
//! ID: 2841023
//! URL: http://198.51.100.7/bins/x.sh
//! ...
//! ```

use std::io::Write;

use colored::Colorize;
use serde::Serialize;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::warn;

use ironfeed_core::event::{RenderEvent, StatusMessage};
use ironfeed_core::types::{Record, ThreatFields};
use ironfeed_engine::{Dimension, MetricsReport, RunSnapshot, SearchOutcome};

use crate::cli::OutputFormat;
use crate::output::Render;

/// Separator line printed before every record block.
pub const BANNER: &str =
    "################################################################################";

/// Print engine events to stdout until the sink is dropped.
///
/// `Json` output prints one event per line. With `show_records` off only
/// status lines and search notices are printed.
pub async fn print_events(
    mut events: UnboundedReceiver<RenderEvent>,
    format: OutputFormat,
    show_records: bool,
) {
    while let Some(event) = events.recv().await {
        if !show_records && matches!(event, RenderEvent::Record { .. }) {
            continue;
        }
        let stdout = std::io::stdout();
        let mut out = stdout.lock();
        let result = match format {
            OutputFormat::Text => write_event(&mut out, &event),
            OutputFormat::Json => serde_json::to_string(&event)
                .map_err(std::io::Error::other)
                .and_then(|line| writeln!(out, "{line}")),
        };
        if let Err(e) = result {
            warn!(error = %e, "failed to render event, output closed");
            break;
        }
    }
}

/// Write one engine event.
pub fn write_event(w: &mut dyn Write, event: &RenderEvent) -> std::io::Result<()> {
    match event {
        RenderEvent::Cleared => Ok(()),
        RenderEvent::Record {
            display_index,
            record,
        } => write_record(w, *display_index, record),
        RenderEvent::Status(status) => write_status(w, status),
        RenderEvent::NoResults { query } => {
            writeln!(w, "No matching threats found for '{}'.", query.yellow())
        }
    }
}

/// Write a record block.
pub fn write_record(w: &mut dyn Write, display_index: usize, record: &Record) -> std::io::Result<()> {
    writeln!(w, "{BANNER}")?;
    writeln!(w, "{}", format!("Threat {display_index}:").cyan())?;
    for (label, value) in record.labeled_values() {
        writeln!(w, "{}", format!("{label}: {value}").yellow())?;
    }
    writeln!(w)
}

/// Write a status line.
pub fn write_status(w: &mut dyn Write, status: &StatusMessage) -> std::io::Result<()> {
    let text = status.to_string();
    let text = match status {
        StatusMessage::Running { .. } => text.green(),
        StatusMessage::Paused { .. } => text.yellow(),
        StatusMessage::Finished { .. } | StatusMessage::Stopped => text.bold(),
        StatusMessage::FetchFailed { .. } | StatusMessage::NoData { .. } => text.red(),
    };
    writeln!(w, "Status: {text}")
}

/// Top-N metrics view.
#[derive(Debug, Serialize)]
pub struct MetricsView {
    pub top_n: usize,
    #[serde(flatten)]
    pub report: MetricsReport,
}

impl Render for MetricsView {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        for (i, dimension) in [Dimension::Authority, Dimension::Reporter, Dimension::Tag]
            .into_iter()
            .enumerate()
        {
            if i > 0 {
                writeln!(w)?;
            }
            let title = dimension.to_string().replacen("Top", &format!("Top {}", self.top_n), 1);
            writeln!(w, "{}", format!("{title}:").bold())?;
            for (key, count) in self.report.entries(dimension) {
                writeln!(w, "{key}: {count}")?;
            }
        }
        Ok(())
    }
}

/// Search results view.
#[derive(Debug, Serialize)]
pub struct SearchView {
    pub query: String,
    pub matches: Vec<Record>,
}

impl SearchView {
    pub fn new(query: &str, outcome: SearchOutcome) -> Self {
        let matches = match outcome {
            SearchOutcome::Matches(records) => records,
            SearchOutcome::NoMatches => Vec::new(),
        };
        Self {
            query: query.trim().to_owned(),
            matches,
        }
    }
}

impl Render for SearchView {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        if self.matches.is_empty() {
            return writeln!(w, "No matching threats found for '{}'.", self.query.yellow());
        }
        for (i, record) in self.matches.iter().enumerate() {
            writeln!(w, "{}", format!("Found Threat {}:", i + 1).cyan())?;
            for (label, value) in record.labeled_values() {
                writeln!(w, "  {label}: {value}")?;
            }
            writeln!(w)?;
        }
        writeln!(w, "{} match(es) for '{}'", self.matches.len(), self.query)
    }
}

impl Render for RunSnapshot {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        writeln!(
            w,
            "Feed: {}",
            self.feed.as_deref().unwrap_or("(none)").bold()
        )?;
        writeln!(w, "  Status:    {}", self.status)?;
        writeln!(w, "  Position:  {}", self.cursor)?;
        writeln!(w, "  Processed: {}", self.processed)?;
        writeln!(w, "  Skipped:   {}", self.skipped)?;
        writeln!(w, "  Collected: {}", self.accumulated)?;
        if let Some(err) = &self.last_error {
            writeln!(w, "  Error:     {}", err.red())?;
        }
        Ok(())
    }
}
