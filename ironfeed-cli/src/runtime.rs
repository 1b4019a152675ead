//! Engine wiring shared by the subcommands.
//!
//! Turns the loaded `IronfeedConfig` into an `EngineContext` with the
//! right fetcher (direct or daily-cached) and the requested feed selected.

use ironfeed_core::config::IronfeedConfig;
use ironfeed_core::error::{FetchError, OperatorError};
use ironfeed_core::pipeline::{FeedFetcher, RawPayload, RenderSink};
use ironfeed_core::types::FeedSource;
use ironfeed_engine::{CachedFetcher, EngineConfig, EngineContext, HttpFetcher, IngestionEngine};
use tracing::debug;

use crate::error::CliError;

/// Fetcher selected at startup.
pub enum Fetcher {
    /// One GET per attempt.
    Direct(HttpFetcher),
    /// Daily payload cache in front of the HTTP fetcher.
    Cached(CachedFetcher<HttpFetcher>),
}

impl FeedFetcher for Fetcher {
    async fn fetch(&self, source: &FeedSource) -> Result<RawPayload, FetchError> {
        match self {
            Self::Direct(fetcher) => fetcher.fetch(source).await,
            Self::Cached(fetcher) => fetcher.fetch(source).await,
        }
    }
}

/// Build the fetcher described by `config`. `force_cache` enables the cache regardless of config.
pub async fn build_fetcher(config: &EngineConfig, force_cache: bool) -> Result<Fetcher, CliError> {
    let http = HttpFetcher::new(config.fetch_timeout())?;
    if config.cache.enabled || force_cache {
        debug!(dir = %config.cache.dir.display(), "payload cache enabled");
        let cached = CachedFetcher::new(http, &config.cache.dir, config.cache_ttl()).await?;
        Ok(Fetcher::Cached(cached))
    } else {
        Ok(Fetcher::Direct(http))
    }
}

/// Pick the feed to use: explicit request, then `ingest.default_feed`, then the first feed.
pub fn resolve_feed<'a>(
    sources: &'a [FeedSource],
    requested: Option<&str>,
    default_feed: &str,
) -> Result<&'a FeedSource, CliError> {
    let wanted = requested.or((!default_feed.is_empty()).then_some(default_feed));
    match wanted {
        Some(name) => sources
            .iter()
            .find(|s| s.name == name)
            .ok_or_else(|| CliError::Operator(OperatorError::UnknownSource(name.to_owned()).to_string())),
        None => sources
            .first()
            .ok_or_else(|| CliError::Config("no feeds configured".to_owned())),
    }
}

/// Build an `EngineContext` with the resolved feed selected.
pub async fn build_context<S: RenderSink>(
    config: &IronfeedConfig,
    engine_config: EngineConfig,
    force_cache: bool,
    sink: S,
    requested: Option<&str>,
) -> Result<EngineContext<Fetcher, S>, CliError> {
    let sources = config.feed_sources()?;
    let selected = resolve_feed(&sources, requested, &config.ingest.default_feed)?
        .name
        .clone();

    let fetcher = build_fetcher(&engine_config, force_cache).await?;
    let engine = IngestionEngine::new(engine_config, fetcher, sink);
    let mut context = EngineContext::new(engine, sources);
    context.select_source(&selected).await?;
    Ok(context)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ironfeed_core::types::FeedFormat;

    fn sources() -> Vec<FeedSource> {
        ["URLhaus", "ThreatFox"]
            .iter()
            .map(|name| {
                FeedSource::new(*name, "https://feed.example/", FeedFormat::Csv, None)
                    .expect("valid source")
            })
            .collect()
    }

    #[test]
    fn test_resolve_feed_prefers_request() {
        let sources = sources();
        let feed = resolve_feed(&sources, Some("ThreatFox"), "URLhaus").expect("resolved");
        assert_eq!(feed.name, "ThreatFox");
    }

    #[test]
    fn test_resolve_feed_uses_default_then_first() {
        let sources = sources();
        assert_eq!(
            resolve_feed(&sources, None, "ThreatFox").expect("resolved").name,
            "ThreatFox"
        );
        assert_eq!(
            resolve_feed(&sources, None, "").expect("resolved").name,
            "URLhaus"
        );
    }

    #[test]
    fn test_resolve_feed_unknown_name() {
        let err = resolve_feed(&sources(), Some("nope"), "").expect_err("unknown feed");
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn test_resolve_feed_without_sources() {
        let err = resolve_feed(&[], None, "").expect_err("no feeds");
        assert_eq!(err.exit_code(), 2);
    }

    #[tokio::test]
    async fn test_build_fetcher_respects_cache_flag() {
        let dir = tempfile::tempdir().expect("temp dir");
        let mut config = EngineConfig::default();
        config.cache.dir = dir.path().join("cache");

        let direct = build_fetcher(&config, false).await.expect("fetcher");
        assert!(matches!(direct, Fetcher::Direct(_)));

        let cached = build_fetcher(&config, true).await.expect("fetcher");
        assert!(matches!(cached, Fetcher::Cached(_)));
        assert!(config.cache.dir.exists());
    }
}
