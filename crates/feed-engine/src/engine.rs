//! 수집 엔진 -- 재개 가능한 피드 수집 상태 머신
//!
//! [`IngestionEngine`]은 다운로드 → 파싱 → 레코드 순회 → 렌더/집계 흐름을
//! 별도 tokio 태스크에서 실행하고, 운영자 명령(Start/Pause/Resume/Stop)을
//! 공유 상태([`IngestionRun`])와 [`CancellationToken`]으로 전달합니다.
//!
//! # 상태 전환
//! ```text
//! Idle/Stopped/Finished/Error --start--> Running --pause--> Paused --resume--> Running
//!                                        Running/Paused --stop--> Stopped
//!                                        Running --완료--> Finished, --실패--> Error
//! ```
//!
//! # 동시성
//! - 레코드 하나의 검증/집계/렌더/추가는 상태 잠금 안에서 원자적으로 수행됩니다.
//! - Pause/Stop은 레코드 사이에서만 관찰되며, 표시 지연과 다운로드는 토큰으로 즉시 깨어납니다.
//! - 실행 루프는 한 번에 하나만 존재합니다. 새 루프를 띄우기 전에 이전 루프의 종료를 기다립니다.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use ironfeed_core::error::{ExportError, OperatorError};
use ironfeed_core::event::{RenderEvent, StatusMessage};
use ironfeed_core::metrics as m;
use ironfeed_core::pipeline::{FeedFetcher, RenderSink};
use ironfeed_core::types::{FeedSource, Record, RunStatus};

use crate::aggregator::{Aggregator, Dimension, MetricsReport, SearchOutcome, search};
use crate::config::{EngineConfig, ResumeStrategy};
use crate::error::FeedEngineError;
use crate::export::{self, ExportSummary};
use crate::parser::{ParsedFeed, ParserRouter};

/// 실행 단위의 공유 상태
///
/// 실행 루프만 카운터와 집계 테이블을 변경하며, 명령 표면은 상태 필드만 바꿉니다.
#[derive(Debug, Default)]
struct IngestionRun {
    /// 새 실행마다 발급되는 ID
    run_id: Option<Uuid>,
    /// 수집 중인 피드
    feed: Option<FeedSource>,
    /// 현재 상태
    status: RunStatus,
    /// 다음에 처리할 레코드 위치 (0-based)
    cursor: usize,
    /// 처리된 유효 레코드 수
    processed: u64,
    /// 건너뛴 레코드 수
    skipped: u64,
    /// CSV 헤더 (내보내기용)
    header: Option<Vec<String>>,
    /// 빈도 테이블
    aggregator: Aggregator,
    /// 처리된 유효 레코드 (수집 순서)
    accumulated: Vec<Record>,
    /// `retain` 전략에서 일시정지 동안 보관하는 파싱 결과
    retained: Option<Arc<ParsedFeed>>,
    /// 실행 루프 세대. 루프는 자기 세대가 아니면 상태를 건드리지 않음
    epoch: u64,
    /// 현재 루프의 pause/stop 신호
    signal: CancellationToken,
    /// 마지막 실패 사유
    last_error: Option<String>,
}

impl IngestionRun {
    fn feed_name(&self) -> String {
        self.feed
            .as_ref()
            .map(|f| f.name.clone())
            .unwrap_or_default()
    }

    /// 새 실행을 위해 상태를 초기화합니다.
    fn reset_for(&mut self, feed: FeedSource) {
        self.run_id = Some(Uuid::new_v4());
        self.feed = Some(feed);
        self.cursor = 0;
        self.processed = 0;
        self.skipped = 0;
        self.header = None;
        self.aggregator.reset();
        self.accumulated.clear();
        self.retained = None;
        self.last_error = None;
    }
}

/// 실행 상태 스냅샷
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSnapshot {
    /// 실행 ID (시작 전에는 `None`)
    pub run_id: Option<Uuid>,
    /// 피드 이름
    pub feed: Option<String>,
    /// 상태
    pub status: RunStatus,
    /// 다음 처리 위치 (0-based)
    pub cursor: usize,
    /// 처리된 레코드 수
    pub processed: u64,
    /// 건너뛴 레코드 수
    pub skipped: u64,
    /// 수집된 레코드 수
    pub accumulated: usize,
    /// 마지막 실패 사유
    pub last_error: Option<String>,
}

/// 레코드 처리 결과
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RecordOutcome {
    Processed,
    Skipped,
}

/// 재개 가능한 피드 수집 엔진
///
/// # 사용 예시
/// ```ignore
/// use std::sync::Arc;
/// use ironfeed_engine::{IngestionEngine, HttpFetcher, ChannelSink, EngineConfig};
///
/// let config = EngineConfig::default();
/// let fetcher = HttpFetcher::new(config.fetch_timeout())?;
/// let (sink, mut events) = ChannelSink::new();
/// let engine = IngestionEngine::new(config, fetcher, sink);
///
/// engine.start(feed).await?;
/// engine.pause().await?;
/// engine.resume().await?;
/// ```
pub struct IngestionEngine<F, S> {
    config: EngineConfig,
    fetcher: Arc<F>,
    sink: Arc<S>,
    parser: Arc<ParserRouter>,
    run: Arc<Mutex<IngestionRun>>,
    /// 현재 실행 루프 핸들. start/resume을 직렬화하는 잠금도 겸함
    task: Mutex<Option<JoinHandle<()>>>,
}

impl<F: FeedFetcher, S: RenderSink> IngestionEngine<F, S> {
    /// 기본 파서 세트로 엔진을 생성합니다.
    pub fn new(config: EngineConfig, fetcher: F, sink: S) -> Self {
        let parser = ParserRouter::with_defaults().with_max_payload_bytes(config.max_payload_bytes);
        Self {
            config,
            fetcher: Arc::new(fetcher),
            sink: Arc::new(sink),
            parser: Arc::new(parser),
            run: Arc::new(Mutex::new(IngestionRun::default())),
            task: Mutex::new(None),
        }
    }

    /// 파서 라우터를 교체합니다.
    pub fn with_parser(mut self, parser: ParserRouter) -> Self {
        self.parser = Arc::new(parser);
        self
    }

    /// 엔진 설정
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// 다운로더
    pub fn fetcher(&self) -> &Arc<F> {
        &self.fetcher
    }

    /// 렌더 싱크
    pub fn sink(&self) -> &Arc<S> {
        &self.sink
    }

    // ─── 운영자 명령 ────────────────────────────────────────────────

    /// 새 실행을 시작합니다.
    ///
    /// `Idle`, `Stopped`, `Finished`, `Error` 상태에서만 허용됩니다.
    /// 커서/카운터/수집 레코드/집계를 초기화하고 표시 영역을 비운 뒤
    /// 실행 루프를 띄우고 바로 반환합니다.
    pub async fn start(&self, feed: FeedSource) -> Result<(), FeedEngineError> {
        let mut task = self.task.lock().await;

        {
            let run = self.run.lock().await;
            if !run.status.accepts_fresh_start() {
                return Err(OperatorError::RunInProgress(run.feed_name()).into());
            }
        }

        // 종료 상태여도 루프가 마무리 중일 수 있음
        if let Some(handle) = task.take() {
            let _ = handle.await;
        }

        let (epoch, token) = {
            let mut run = self.run.lock().await;
            if !run.status.accepts_fresh_start() {
                return Err(OperatorError::RunInProgress(run.feed_name()).into());
            }
            run.reset_for(feed.clone());
            run.status = RunStatus::Running;
            run.epoch += 1;
            run.signal = CancellationToken::new();

            self.sink.emit(RenderEvent::Cleared);
            self.sink.emit(RenderEvent::Status(StatusMessage::Running {
                feed: feed.name.clone(),
            }));
            info!(
                feed = %feed.name,
                run_id = ?run.run_id,
                format = %feed.format,
                "ingestion started"
            );
            (run.epoch, run.signal.clone())
        };

        *task = Some(self.spawn_loop(feed, epoch, token));
        Ok(())
    }

    /// 실행을 일시정지합니다. `Running` 상태에서만 허용됩니다.
    ///
    /// 이미 일시정지된 실행이면 [`OperatorError::AlreadyPaused`]입니다.
    /// 커서, 카운터, 수집 레코드는 그대로 유지됩니다.
    pub async fn pause(&self) -> Result<(), FeedEngineError> {
        let mut run = self.run.lock().await;
        match run.status {
            RunStatus::Running => {}
            RunStatus::Paused => return Err(OperatorError::AlreadyPaused.into()),
            _ => return Err(OperatorError::NoActiveRun.into()),
        }
        run.status = RunStatus::Paused;
        run.signal.cancel();

        let position = run.cursor + 1;
        self.sink
            .emit(RenderEvent::Status(StatusMessage::Paused { position }));
        info!(feed = %run.feed_name(), cursor = run.cursor, "ingestion paused");
        Ok(())
    }

    /// 일시정지된 실행을 재개합니다.
    ///
    /// `Paused` 상태가 아니면 [`OperatorError::NotPaused`],
    /// 수집된 레코드가 없으면 [`OperatorError::NothingToResume`]입니다.
    /// 카운터는 초기화하지 않고 저장된 커서부터 이어서 처리합니다.
    pub async fn resume(&self) -> Result<(), FeedEngineError> {
        let mut task = self.task.lock().await;

        check_resumable(&*self.run.lock().await)?;

        // 일시정지된 루프는 토큰 취소 후 다음 체크포인트에서 종료됨
        if let Some(handle) = task.take() {
            let _ = handle.await;
        }

        let (feed, epoch, token) = {
            let mut run = self.run.lock().await;
            check_resumable(&run)?;
            let Some(feed) = run.feed.clone() else {
                return Err(OperatorError::NothingToResume.into());
            };
            run.status = RunStatus::Running;
            run.epoch += 1;
            run.signal = CancellationToken::new();

            self.sink.emit(RenderEvent::Status(StatusMessage::Running {
                feed: feed.name.clone(),
            }));
            info!(
                feed = %feed.name,
                cursor = run.cursor,
                strategy = %self.config.resume_strategy,
                "ingestion resumed"
            );
            (feed, run.epoch, run.signal.clone())
        };

        *task = Some(self.spawn_loop(feed, epoch, token));
        Ok(())
    }

    /// 실행을 중지합니다. `Running` 또는 `Paused` 상태에서만 허용됩니다.
    ///
    /// 수집된 레코드는 검색/내보내기를 위해 유지됩니다.
    pub async fn stop(&self) -> Result<(), FeedEngineError> {
        let mut run = self.run.lock().await;
        if !run.status.is_active() {
            return Err(OperatorError::NoActiveRun.into());
        }
        run.status = RunStatus::Stopped;
        run.retained = None;
        run.signal.cancel();

        self.sink.emit(RenderEvent::Status(StatusMessage::Stopped));
        metrics::counter!(m::FEED_RUNS_TOTAL, m::LABEL_OUTCOME => "stopped").increment(1);
        info!(
            feed = %run.feed_name(),
            processed = run.processed,
            skipped = run.skipped,
            "ingestion stopped"
        );
        Ok(())
    }

    /// 이전 실행의 상태를 모두 버리고 `Idle`로 되돌립니다.
    ///
    /// 다른 피드를 선택할 때 사용합니다. 실행 중이면 [`OperatorError::RunInProgress`]입니다.
    pub async fn reset(&self) -> Result<(), FeedEngineError> {
        let mut task = self.task.lock().await;
        {
            let run = self.run.lock().await;
            if run.status.is_active() {
                return Err(OperatorError::RunInProgress(run.feed_name()).into());
            }
        }
        if let Some(handle) = task.take() {
            let _ = handle.await;
        }

        let mut run = self.run.lock().await;
        let epoch = run.epoch;
        *run = IngestionRun {
            epoch,
            ..IngestionRun::default()
        };
        self.sink.emit(RenderEvent::Cleared);
        debug!("ingestion state reset");
        Ok(())
    }

    /// 현재 실행 루프가 끝날 때까지 기다립니다.
    ///
    /// 일시정지 상태에서는 루프가 체크포인트에서 빠져나오는 즉시 반환합니다.
    /// 기다리는 도중 future가 drop되어도 핸들은 그대로 남습니다.
    pub async fn join(&self) {
        let mut task = self.task.lock().await;
        if let Some(handle) = task.as_mut() {
            if let Err(e) = handle.await {
                warn!(error = %e, "ingestion task ended abnormally");
            }
            *task = None;
        }
    }

    /// 활성 실행을 중지하고 루프 종료를 기다립니다.
    pub async fn shutdown(&self) {
        match self.stop().await {
            Ok(()) | Err(FeedEngineError::Operator(OperatorError::NoActiveRun)) => {}
            Err(e) => warn!(error = %e, "failed to stop ingestion during shutdown"),
        }
        self.join().await;
    }

    // ─── 조회 ───────────────────────────────────────────────────────

    /// 현재 상태
    pub async fn status(&self) -> RunStatus {
        self.run.lock().await.status
    }

    /// 실행 상태 스냅샷
    pub async fn snapshot(&self) -> RunSnapshot {
        let run = self.run.lock().await;
        RunSnapshot {
            run_id: run.run_id,
            feed: run.feed.as_ref().map(|f| f.name.clone()),
            status: run.status,
            cursor: run.cursor,
            processed: run.processed,
            skipped: run.skipped,
            accumulated: run.accumulated.len(),
            last_error: run.last_error.clone(),
        }
    }

    /// 수집된 레코드의 사본
    pub async fn accumulated(&self) -> Vec<Record> {
        self.run.lock().await.accumulated.clone()
    }

    /// 수집된 레코드를 검색합니다.
    ///
    /// 일치 항목이 없으면 렌더 싱크에 "no results" 이벤트를 보냅니다.
    pub async fn search(&self, query: &str) -> Result<SearchOutcome, FeedEngineError> {
        let outcome = {
            let run = self.run.lock().await;
            search(&run.accumulated, query)?
        };
        if outcome.is_empty() {
            self.sink.emit(RenderEvent::NoResults {
                query: query.to_owned(),
            });
        }
        debug!(query, matches = outcome.len(), "search completed");
        Ok(outcome)
    }

    /// 차원별 상위 `n`개
    pub async fn top(&self, dimension: Dimension, n: usize) -> Vec<(String, u64)> {
        self.run.lock().await.aggregator.top_n(dimension, n)
    }

    /// 설정된 `top_n`으로 세 차원의 상위 항목을 반환합니다.
    pub async fn metrics(&self) -> MetricsReport {
        self.run.lock().await.aggregator.report(self.config.top_n)
    }

    /// 수집된 레코드를 CSV 파일로 내보냅니다.
    ///
    /// 수집된 레코드가 없으면 파일을 만들지 않고 [`OperatorError::NoDataToExport`]입니다.
    pub async fn export(&self, path: impl Into<PathBuf>) -> Result<ExportSummary, FeedEngineError> {
        let path = path.into();
        let (header, records) = {
            let run = self.run.lock().await;
            if run.accumulated.is_empty() {
                return Err(OperatorError::NoDataToExport.into());
            }
            (run.header.clone(), run.accumulated.clone())
        };

        let target = path.clone();
        let summary = tokio::task::spawn_blocking(move || {
            export::write_csv(&target, header.as_deref(), &records)
        })
        .await
        .map_err(|e| ExportError::WriteFailed {
            path: path.display().to_string(),
            reason: e.to_string(),
        })??;

        info!(path = %path.display(), rows = summary.rows, "records exported");
        Ok(summary)
    }

    // ─── 실행 루프 ──────────────────────────────────────────────────

    fn spawn_loop(&self, feed: FeedSource, epoch: u64, token: CancellationToken) -> JoinHandle<()> {
        let worker = RunLoop {
            fetcher: Arc::clone(&self.fetcher),
            sink: Arc::clone(&self.sink),
            parser: Arc::clone(&self.parser),
            run: Arc::clone(&self.run),
            pacing: self.config.pacing(),
            strategy: self.config.resume_strategy,
            feed,
            epoch,
            token,
        };
        tokio::spawn(worker.run())
    }
}

fn check_resumable(run: &IngestionRun) -> Result<(), OperatorError> {
    if run.status != RunStatus::Paused {
        return Err(OperatorError::NotPaused);
    }
    if run.accumulated.is_empty() {
        return Err(OperatorError::NothingToResume);
    }
    Ok(())
}

/// 실행 루프 태스크가 소유하는 상태
struct RunLoop<F, S> {
    fetcher: Arc<F>,
    sink: Arc<S>,
    parser: Arc<ParserRouter>,
    run: Arc<Mutex<IngestionRun>>,
    pacing: Duration,
    strategy: ResumeStrategy,
    feed: FeedSource,
    epoch: u64,
    token: CancellationToken,
}

impl<F: FeedFetcher, S: RenderSink> RunLoop<F, S> {
    async fn run(self) {
        let Some(records) = self.load_records().await else {
            return;
        };

        loop {
            let outcome = {
                let mut run = self.run.lock().await;
                if run.epoch != self.epoch || run.status != RunStatus::Running {
                    debug!(feed = %self.feed.name, cursor = run.cursor, "run loop observed signal");
                    return;
                }
                let idx = run.cursor;
                let Some(record) = records.records.get(idx) else {
                    break;
                };
                process_record(&mut run, self.sink.as_ref(), &self.feed.name, idx, record)
            };

            if outcome == RecordOutcome::Processed && !self.pacing.is_zero() {
                tokio::select! {
                    _ = self.token.cancelled() => {}
                    _ = tokio::time::sleep(self.pacing) => {}
                }
            } else {
                tokio::task::yield_now().await;
            }
        }

        let mut run = self.run.lock().await;
        if run.epoch != self.epoch || run.status != RunStatus::Running {
            return;
        }
        run.status = RunStatus::Finished;
        run.retained = None;
        self.sink.emit(RenderEvent::Status(StatusMessage::Finished {
            feed: self.feed.name.clone(),
            processed: run.processed,
            skipped: run.skipped,
        }));
        metrics::counter!(m::FEED_RUNS_TOTAL, m::LABEL_OUTCOME => "finished").increment(1);
        info!(
            feed = %self.feed.name,
            processed = run.processed,
            skipped = run.skipped,
            "ingestion finished"
        );
    }

    /// 레코드 시퀀스를 얻습니다. 실패하면 `Error` 상태로 전환하고 `None`.
    async fn load_records(&self) -> Option<Arc<ParsedFeed>> {
        if self.strategy == ResumeStrategy::Retain {
            let run = self.run.lock().await;
            if let Some(retained) = &run.retained {
                debug!(feed = %self.feed.name, cursor = run.cursor, "reusing retained records");
                return Some(Arc::clone(retained));
            }
        }

        let fetched = tokio::select! {
            _ = self.token.cancelled() => {
                debug!(feed = %self.feed.name, "fetch abandoned by operator");
                return None;
            }
            result = self.fetcher.fetch(&self.feed) => result,
        };

        let payload = match fetched {
            Ok(payload) => payload,
            Err(e) => {
                self.fail(StatusMessage::FetchFailed {
                    feed: self.feed.name.clone(),
                }, e.to_string())
                .await;
                return None;
            }
        };

        let parsed = match self.parser.parse(self.feed.format, &payload) {
            Ok(parsed) => Arc::new(parsed),
            Err(e) => {
                self.fail(StatusMessage::NoData {
                    feed: self.feed.name.clone(),
                }, e.to_string())
                .await;
                return None;
            }
        };

        let mut run = self.run.lock().await;
        if run.epoch != self.epoch {
            return None;
        }
        if run.header.is_none() {
            run.header = parsed.header.clone();
        }
        if run.cursor > parsed.len() {
            warn!(
                feed = %self.feed.name,
                cursor = run.cursor,
                records = parsed.len(),
                "feed shrank below saved position since the last fetch"
            );
        }
        if self.strategy == ResumeStrategy::Retain {
            run.retained = Some(Arc::clone(&parsed));
        }
        Some(parsed)
    }

    async fn fail(&self, status: StatusMessage, reason: String) {
        let mut run = self.run.lock().await;
        if run.epoch != self.epoch || run.status != RunStatus::Running {
            return;
        }
        run.status = RunStatus::Error;
        run.last_error = Some(reason.clone());
        warn!(feed = %self.feed.name, error = %reason, status = %status, "ingestion failed");
        self.sink.emit(RenderEvent::Status(status));
        metrics::counter!(m::FEED_RUNS_TOTAL, m::LABEL_OUTCOME => "error").increment(1);
    }
}

/// 레코드 하나를 처리합니다. 호출자는 상태 잠금을 쥐고 있어야 합니다.
///
/// 커서는 검증/집계/렌더/추가가 모두 끝난 뒤에만 전진합니다.
fn process_record<S: RenderSink + ?Sized>(
    run: &mut IngestionRun,
    sink: &S,
    feed: &str,
    idx: usize,
    record: &Record,
) -> RecordOutcome {
    match record.validate() {
        Err(e) => {
            run.skipped += 1;
            run.cursor = idx + 1;
            warn!(feed, position = idx + 1, error = %e, "skipping invalid record");
            metrics::counter!(m::FEED_RECORDS_SKIPPED_TOTAL, m::LABEL_FEED => feed.to_owned())
                .increment(1);
            RecordOutcome::Skipped
        }
        Ok(()) => {
            run.processed += 1;
            run.aggregator.record_valid(record);
            sink.emit(RenderEvent::Record {
                display_index: idx + 1,
                record: record.clone(),
            });
            run.accumulated.push(record.clone());
            run.cursor = idx + 1;
            metrics::counter!(m::FEED_RECORDS_PROCESSED_TOTAL, m::LABEL_FEED => feed.to_owned())
                .increment(1);
            RecordOutcome::Processed
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::MemorySink;
    use ironfeed_core::types::{CsvRow, FeedFormat, JsonRecord};

    fn row(width: usize) -> Record {
        Record::Csv(CsvRow::new(
            (0..width).map(|i| format!("http://h{i}.example/")).collect(),
        ))
    }

    #[test]
    fn short_row_only_increments_skipped() {
        let mut run = IngestionRun::default();
        let sink = MemorySink::new();

        let outcome = process_record(&mut run, &sink, "F", 0, &row(3));
        assert_eq!(outcome, RecordOutcome::Skipped);
        assert_eq!(run.skipped, 1);
        assert_eq!(run.processed, 0);
        assert_eq!(run.cursor, 1);
        assert!(run.accumulated.is_empty());
        assert!(run.aggregator.report(5).authorities.is_empty());
        assert!(sink.events().is_empty());
    }

    #[test]
    fn valid_row_is_rendered_with_one_based_index() {
        let mut run = IngestionRun {
            cursor: 4,
            ..IngestionRun::default()
        };
        let sink = MemorySink::new();

        let outcome = process_record(&mut run, &sink, "F", 4, &row(9));
        assert_eq!(outcome, RecordOutcome::Processed);
        assert_eq!(run.processed, 1);
        assert_eq!(run.cursor, 5);
        assert_eq!(run.accumulated.len(), 1);
        assert_eq!(sink.record_indices(), vec![5]);
    }

    #[test]
    fn non_object_json_is_skipped() {
        let mut run = IngestionRun::default();
        let sink = MemorySink::new();
        let record = Record::Json(JsonRecord::new(serde_json::json!([1, 2])));

        assert_eq!(
            process_record(&mut run, &sink, "F", 0, &record),
            RecordOutcome::Skipped
        );
        assert_eq!(run.skipped, 1);
    }

    #[test]
    fn resumable_requires_paused_with_data() {
        let mut run = IngestionRun::default();
        assert_eq!(check_resumable(&run), Err(OperatorError::NotPaused));

        run.status = RunStatus::Paused;
        assert_eq!(check_resumable(&run), Err(OperatorError::NothingToResume));

        run.accumulated.push(row(9));
        assert!(check_resumable(&run).is_ok());
    }

    #[test]
    fn reset_clears_previous_run() {
        let mut run = IngestionRun::default();
        run.processed = 3;
        run.accumulated.push(row(9));
        run.aggregator.record_valid(&row(9));
        run.reset_for(
            FeedSource::new("F", "https://f.example/", FeedFormat::Csv, None).unwrap(),
        );

        assert_eq!(run.processed, 0);
        assert!(run.accumulated.is_empty());
        assert!(run.aggregator.report(5).authorities.is_empty());
        assert!(run.run_id.is_some());
    }
}
