//! # ironfeed-core
//!
//! Ironfeed 워크스페이스의 공통 기반 크레이트입니다.
//!
//! - [`types`]: 피드 정의, 정규화 레코드, 실행 상태
//! - [`error`]: 계층별 에러 분류
//! - [`event`]: 렌더 싱크로 전달되는 이벤트
//! - [`pipeline`]: 다운로드/렌더링 확장 포인트 trait
//! - [`config`]: `ironfeed.toml` 설정
//! - [`metrics`]: 메트릭 이름 상수

pub mod config;
pub mod error;
pub mod event;
pub mod metrics;
pub mod pipeline;
pub mod types;

// --- 주요 타입 re-export ---

// 에러
pub use error::{
    ConfigError, ExportError, FetchError, IronfeedError, OperatorError, ParseError, RecordError,
};

// 설정
pub use config::IronfeedConfig;

// 이벤트
pub use event::{RenderEvent, StatusMessage};

// 파이프라인 trait
pub use pipeline::{FeedFetcher, RawPayload, RenderSink};

// 도메인 타입
pub use types::{CsvRow, FeedFormat, FeedSource, JsonRecord, Record, RunStatus, ThreatFields};
