//! # ironfeed-engine
//!
//! 위협 인텔리전스 피드를 다운로드하고, 레코드 단위로 검증/집계/렌더링하는
//! 재개 가능한 수집 엔진입니다.
//!
//! # 모듈 구성
//!
//! - [`fetcher`]: HTTP(S) 다운로드 (선택적 Bearer credential)
//! - [`cache`]: 일 단위 페이로드 캐시 (`FeedFetcher` 래퍼)
//! - [`parser`]: CSV, JSON 형식별 파서와 라우터
//! - [`aggregator`]: 빈도 테이블(authority, 리포터, 태그)과 검색
//! - [`engine`]: Start/Pause/Resume/Stop 상태 머신과 실행 루프
//! - [`context`]: 피드 목록과 운영자 명령 표면
//! - [`export`]: 수집된 레코드의 CSV 내보내기
//! - [`sink`]: 채널/메모리 렌더 싱크
//! - [`config`]: 엔진 설정 (core 설정 확장)
//! - [`error`]: 도메인 에러 타입
//!
//! # 아키텍처
//!
//! ```text
//! EngineContext --명령--> IngestionEngine --spawn--> run loop
//!                                                     |
//!                 Fetcher -> ParserRouter -> validate -> Aggregator + RenderSink + accumulated
//! ```

pub mod aggregator;
pub mod cache;
pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod export;
pub mod fetcher;
pub mod parser;
pub mod sink;

// --- 주요 타입 re-export ---

// 엔진
pub use context::EngineContext;
pub use engine::{IngestionEngine, RunSnapshot};

// 설정
pub use config::{CacheSettings, EngineConfig, EngineConfigBuilder, ResumeStrategy};

// 에러
pub use error::FeedEngineError;

// 다운로더
pub use cache::CachedFetcher;
pub use fetcher::HttpFetcher;

// 파서
pub use parser::{CsvFeedParser, FeedParser, JsonFeedParser, ParsedFeed, ParserRouter};

// 집계
pub use aggregator::{Aggregator, Dimension, FrequencyTable, MetricsReport, SearchOutcome};

// 내보내기
pub use export::ExportSummary;

// 렌더 싱크
pub use sink::{ChannelSink, MemorySink};
