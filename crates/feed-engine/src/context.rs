//! 명령 표면 -- 피드 목록 관리와 운영자 명령을 엔진에 전달
//!
//! [`EngineContext`]는 등록된 피드 목록과 선택된 피드를 보관하고,
//! AddSource / SelectSource / Start / Stop / Pause / Resume / Search /
//! ShowMetrics / Export 명령을 [`IngestionEngine`]에 1:1로 매핑합니다.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{info, warn};

use ironfeed_core::error::OperatorError;
use ironfeed_core::pipeline::{FeedFetcher, RenderSink};
use ironfeed_core::types::FeedSource;

use crate::aggregator::{MetricsReport, SearchOutcome};
use crate::engine::{IngestionEngine, RunSnapshot};
use crate::error::FeedEngineError;
use crate::export::ExportSummary;

/// 피드 목록 + 엔진 명령 표면
pub struct EngineContext<F, S> {
    engine: Arc<IngestionEngine<F, S>>,
    sources: Vec<FeedSource>,
    selected: Option<String>,
}

impl<F: FeedFetcher, S: RenderSink> EngineContext<F, S> {
    /// 엔진과 초기 피드 목록으로 생성합니다. 첫 번째 피드가 선택됩니다.
    pub fn new(engine: IngestionEngine<F, S>, sources: Vec<FeedSource>) -> Self {
        let selected = sources.first().map(|s| s.name.clone());
        Self {
            engine: Arc::new(engine),
            sources,
            selected,
        }
    }

    /// 엔진 참조
    pub fn engine(&self) -> &Arc<IngestionEngine<F, S>> {
        &self.engine
    }

    /// 등록된 피드 목록
    pub fn sources(&self) -> &[FeedSource] {
        &self.sources
    }

    /// 선택된 피드
    pub fn selected(&self) -> Option<&FeedSource> {
        let name = self.selected.as_deref()?;
        self.sources.iter().find(|s| s.name == name)
    }

    // ─── 피드 관리 ──────────────────────────────────────────────────

    /// 피드를 등록합니다. 같은 이름이 있으면 [`OperatorError::DuplicateSource`]입니다.
    pub fn add_source(&mut self, source: FeedSource) -> Result<(), FeedEngineError> {
        if self.sources.iter().any(|s| s.name == source.name) {
            return Err(OperatorError::DuplicateSource(source.name).into());
        }
        info!(feed = %source.name, format = %source.format, "feed source added");
        if self.selected.is_none() {
            self.selected = Some(source.name.clone());
        }
        self.sources.push(source);
        Ok(())
    }

    /// 한 번의 인증된 요청으로 피드를 확인한 뒤 등록합니다.
    ///
    /// 요청이 실패하면 [`OperatorError::InvalidSource`]로 거부합니다.
    pub async fn add_source_verified(&mut self, source: FeedSource) -> Result<(), FeedEngineError> {
        if self.sources.iter().any(|s| s.name == source.name) {
            return Err(OperatorError::DuplicateSource(source.name).into());
        }
        if let Err(e) = self.engine.fetcher().fetch(&source).await {
            warn!(feed = %source.name, error = %e, "feed source probe failed");
            return Err(OperatorError::InvalidSource {
                name: source.name,
                reason: e.to_string(),
            }
            .into());
        }
        self.add_source(source)
    }

    /// 피드를 선택합니다.
    ///
    /// 실행 중이면 [`OperatorError::RunInProgress`], 모르는 이름이면
    /// [`OperatorError::UnknownSource`]입니다. 다른 피드를 선택하면 이전 실행 상태를 버립니다.
    pub async fn select_source(&mut self, name: &str) -> Result<&FeedSource, FeedEngineError> {
        let snapshot = self.engine.snapshot().await;
        if snapshot.status.is_active() {
            return Err(OperatorError::RunInProgress(snapshot.feed.unwrap_or_default()).into());
        }
        let Some(source) = self.sources.iter().find(|s| s.name == name) else {
            return Err(OperatorError::UnknownSource(name.to_owned()).into());
        };

        if self.selected.as_deref() != Some(name) {
            self.engine.reset().await?;
            self.selected = Some(source.name.clone());
            info!(feed = %source.name, "feed source selected");
        }
        Ok(source)
    }

    // ─── 운영자 명령 ────────────────────────────────────────────────

    /// 선택된 피드로 새 실행을 시작합니다.
    pub async fn start(&self) -> Result<(), FeedEngineError> {
        let source = self
            .selected()
            .cloned()
            .ok_or_else(|| OperatorError::UnknownSource(self.selected.clone().unwrap_or_default()))?;
        self.engine.start(source).await
    }

    /// 실행을 중지합니다.
    pub async fn stop(&self) -> Result<(), FeedEngineError> {
        self.engine.stop().await
    }

    /// 실행을 일시정지합니다.
    pub async fn pause(&self) -> Result<(), FeedEngineError> {
        self.engine.pause().await
    }

    /// 일시정지된 실행을 재개합니다.
    pub async fn resume(&self) -> Result<(), FeedEngineError> {
        self.engine.resume().await
    }

    /// 수집된 레코드를 검색합니다.
    pub async fn search(&self, query: &str) -> Result<SearchOutcome, FeedEngineError> {
        self.engine.search(query).await
    }

    /// 상위 N개 집계
    pub async fn show_metrics(&self) -> MetricsReport {
        self.engine.metrics().await
    }

    /// 수집된 레코드를 CSV로 내보냅니다.
    pub async fn export(&self, path: impl Into<PathBuf>) -> Result<ExportSummary, FeedEngineError> {
        self.engine.export(path).await
    }

    /// 실행 상태
    pub async fn status(&self) -> RunSnapshot {
        self.engine.snapshot().await
    }

    /// 활성 실행을 중지하고 종료를 기다립니다.
    pub async fn shutdown(&self) {
        self.engine.shutdown().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::sink::MemorySink;
    use ironfeed_core::error::FetchError;
    use ironfeed_core::pipeline::RawPayload;
    use ironfeed_core::types::FeedFormat;

    struct StaticFetcher {
        ok: bool,
    }

    impl FeedFetcher for StaticFetcher {
        async fn fetch(&self, source: &FeedSource) -> Result<RawPayload, FetchError> {
            if self.ok {
                Ok(RawPayload::from("[]"))
            } else {
                Err(FetchError::Network {
                    endpoint: source.endpoint.clone(),
                    reason: "HTTP 401 Unauthorized".to_owned(),
                })
            }
        }
    }

    fn source(name: &str) -> FeedSource {
        FeedSource::new(name, "https://feed.example/", FeedFormat::Json, None).unwrap()
    }

    fn context(ok: bool) -> EngineContext<StaticFetcher, MemorySink> {
        let engine = IngestionEngine::new(
            EngineConfig::default(),
            StaticFetcher { ok },
            MemorySink::new(),
        );
        EngineContext::new(engine, vec![source("URLhaus")])
    }

    #[test]
    fn first_source_is_selected() {
        let ctx = context(true);
        assert_eq!(ctx.selected().unwrap().name, "URLhaus");
    }

    #[test]
    fn duplicate_source_is_rejected() {
        let mut ctx = context(true);
        let err = ctx.add_source(source("URLhaus")).unwrap_err();
        assert!(matches!(
            err,
            FeedEngineError::Operator(OperatorError::DuplicateSource(_))
        ));
        ctx.add_source(source("ThreatFox")).unwrap();
        assert_eq!(ctx.sources().len(), 2);
    }

    #[tokio::test]
    async fn verified_add_rejects_failed_probe() {
        let mut ctx = context(false);
        let err = ctx.add_source_verified(source("Paid")).await.unwrap_err();
        assert!(matches!(
            err,
            FeedEngineError::Operator(OperatorError::InvalidSource { .. })
        ));
        assert_eq!(ctx.sources().len(), 1);
    }

    #[tokio::test]
    async fn verified_add_accepts_successful_probe() {
        let mut ctx = context(true);
        ctx.add_source_verified(source("Paid")).await.unwrap();
        assert_eq!(ctx.sources().len(), 2);
    }

    #[tokio::test]
    async fn select_unknown_source_fails() {
        let mut ctx = context(true);
        let err = ctx.select_source("nope").await.unwrap_err();
        assert!(matches!(
            err,
            FeedEngineError::Operator(OperatorError::UnknownSource(_))
        ));
    }

    #[tokio::test]
    async fn select_switches_feed() {
        let mut ctx = context(true);
        ctx.add_source(source("ThreatFox")).unwrap();
        ctx.select_source("ThreatFox").await.unwrap();
        assert_eq!(ctx.selected().unwrap().name, "ThreatFox");
    }
}
