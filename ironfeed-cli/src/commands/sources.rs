//! `ironfeed sources` command handler

use std::io::Write;

use serde::Serialize;
use tracing::info;

use ironfeed_core::config::IronfeedConfig;
use ironfeed_core::pipeline::FeedFetcher;
use ironfeed_core::types::FeedSource;
use ironfeed_engine::EngineConfig;

use crate::cli::{SourcesAction, SourcesArgs};
use crate::error::CliError;
use crate::output::{OutputWriter, Render};
use crate::runtime;

/// Execute the `sources` command.
pub async fn execute(
    args: SourcesArgs,
    config: &IronfeedConfig,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let sources = config.feed_sources()?;
    match args.action {
        SourcesAction::List => {
            let selected = runtime::resolve_feed(&sources, None, &config.ingest.default_feed)
                .ok()
                .map(|s| s.name.as_str());
            writer.render(&SourcesView::new(&sources, selected))
        }
        SourcesAction::Check { name } => {
            let source = runtime::resolve_feed(&sources, Some(name.as_str()), "")?;
            let engine_config = EngineConfig::from_core(config)?;
            let fetcher = runtime::build_fetcher(&engine_config, false).await?;

            info!(feed = %source.name, "probing feed source");
            let payload = fetcher
                .fetch(source)
                .await
                .map_err(|e| CliError::Feed(e.to_string()))?;
            writer.render(&ProbeReport {
                name: source.name.clone(),
                endpoint: source.endpoint.clone(),
                reachable: true,
                bytes: payload.len(),
            })
        }
    }
}

/// One row of the feed list.
#[derive(Debug, Serialize)]
pub struct SourceRow {
    pub name: String,
    pub format: String,
    pub endpoint: String,
    pub credential: bool,
    pub selected: bool,
}

/// Feed list view.
#[derive(Debug, Serialize)]
pub struct SourcesView {
    pub feeds: Vec<SourceRow>,
}

impl SourcesView {
    pub fn new(sources: &[FeedSource], selected: Option<&str>) -> Self {
        let feeds = sources
            .iter()
            .map(|s| SourceRow {
                name: s.name.clone(),
                format: s.format.to_string(),
                endpoint: s.endpoint.clone(),
                credential: s.has_credential(),
                selected: selected == Some(s.name.as_str()),
            })
            .collect();
        Self { feeds }
    }
}

impl Render for SourcesView {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        if self.feeds.is_empty() {
            return writeln!(w, "No feeds configured.");
        }
        writeln!(w, "  {:<20} {:<6} {:<5} {}", "Name", "Format", "Auth", "Endpoint")?;
        writeln!(w, "  {}", "-".repeat(72))?;
        for feed in &self.feeds {
            let marker = if feed.selected { "*" } else { " " };
            let auth = if feed.credential { "yes" } else { "-" };
            writeln!(
                w,
                "{} {:<20} {:<6} {:<5} {}",
                marker.green().bold(),
                feed.name,
                feed.format,
                auth,
                feed.endpoint
            )?;
        }
        Ok(())
    }
}

/// Result of a one-request probe.
#[derive(Debug, Serialize)]
pub struct ProbeReport {
    pub name: String,
    pub endpoint: String,
    pub reachable: bool,
    pub bytes: usize,
}

impl Render for ProbeReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        writeln!(w, "Feed: {} ({})", self.name.bold(), self.endpoint)?;
        writeln!(w, "  Result: {}", "REACHABLE".green().bold())?;
        writeln!(w, "  Payload: {} bytes", self.bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ironfeed_core::types::FeedFormat;

    fn sources() -> Vec<FeedSource> {
        vec![
            FeedSource::new(
                "URLhaus",
                "https://urlhaus.abuse.ch/downloads/csv_online/",
                FeedFormat::Csv,
                None,
            )
            .expect("valid source"),
            FeedSource::new(
                "Paid",
                "https://paid.example/api",
                FeedFormat::Json,
                Some("token".to_owned()),
            )
            .expect("valid source"),
        ]
    }

    #[test]
    fn test_sources_view_marks_selection_and_credentials() {
        let view = SourcesView::new(&sources(), Some("Paid"));
        assert!(!view.feeds[0].selected);
        assert!(view.feeds[1].selected);
        assert!(view.feeds[1].credential);
        assert_eq!(view.feeds[1].format, "json");
    }

    #[test]
    fn test_sources_view_json_never_contains_credential() {
        let view = SourcesView::new(&sources(), None);
        let json = serde_json::to_string(&view).expect("serializable");
        assert!(!json.contains("token"));
    }

    #[test]
    fn test_sources_view_render_text() {
        colored::control::set_override(false);
        let view = SourcesView::new(&sources(), Some("URLhaus"));
        let mut buffer = Vec::new();
        view.render_text(&mut buffer).expect("render");
        let output = String::from_utf8(buffer).expect("valid UTF-8");
        assert!(output.contains("* URLhaus"));
        assert!(output.contains("csv_online"));
    }
}
