//! 수집 엔진 설정
//!
//! [`EngineConfig`]는 core의 [`IronfeedConfig`](ironfeed_core::config::IronfeedConfig)를
//! 기반으로 엔진 전용 설정을 제공합니다.
//!
//! # 사용 예시
//! ```ignore
//! use ironfeed_core::config::IronfeedConfig;
//! use ironfeed_engine::config::EngineConfig;
//!
//! let core_config = IronfeedConfig::default_with_feeds();
//! let config = EngineConfig::from_core(&core_config)?;
//! ```

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::FeedEngineError;

/// 일시정지 후 재개할 때 레코드 시퀀스를 얻는 방식
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResumeStrategy {
    /// 다시 다운로드/파싱한 뒤 저장된 위치로 건너뜀 (기본값)
    #[default]
    Refetch,
    /// 파싱된 시퀀스를 메모리에 유지
    Retain,
}

impl fmt::Display for ResumeStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Refetch => write!(f, "refetch"),
            Self::Retain => write!(f, "retain"),
        }
    }
}

impl FromStr for ResumeStrategy {
    type Err = FeedEngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "refetch" => Ok(Self::Refetch),
            "retain" => Ok(Self::Retain),
            other => Err(FeedEngineError::Config {
                field: "resume_strategy".to_owned(),
                reason: format!("unknown strategy '{other}' (expected refetch or retain)"),
            }),
        }
    }
}

/// 일일 캐시 설정
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheSettings {
    /// 활성화 여부
    pub enabled: bool,
    /// 캐시 디렉토리
    pub dir: PathBuf,
    /// 유효 시간 (시간)
    pub ttl_hours: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            dir: PathBuf::from(".ironfeed/cache"),
            ttl_hours: 24,
        }
    }
}

/// 수집 엔진 설정
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// 다운로드 타임아웃 (초)
    pub fetch_timeout_secs: u64,
    /// 레코드 간 표시 지연 (밀리초)
    pub pacing_ms: u64,
    /// 메트릭 화면의 상위 항목 수
    pub top_n: usize,
    /// 최대 페이로드 크기 (바이트)
    pub max_payload_bytes: usize,
    /// 재개 전략
    pub resume_strategy: ResumeStrategy,
    /// 일일 캐시
    pub cache: CacheSettings,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            fetch_timeout_secs: 10,
            pacing_ms: 1000,
            top_n: 5,
            max_payload_bytes: 64 * 1024 * 1024,
            resume_strategy: ResumeStrategy::Refetch,
            cache: CacheSettings::default(),
        }
    }
}

impl EngineConfig {
    /// core 설정에서 엔진 설정을 생성합니다.
    pub fn from_core(
        core: &ironfeed_core::config::IronfeedConfig,
    ) -> Result<Self, FeedEngineError> {
        let config = Self {
            fetch_timeout_secs: core.ingest.fetch_timeout_secs,
            pacing_ms: core.ingest.pacing_ms,
            top_n: core.ingest.top_n,
            max_payload_bytes: core.ingest.max_payload_bytes,
            resume_strategy: core.ingest.resume_strategy.parse()?,
            cache: CacheSettings {
                enabled: core.cache.enabled,
                dir: PathBuf::from(&core.cache.dir),
                ttl_hours: core.cache.ttl_hours,
            },
        };
        config.validate()?;
        Ok(config)
    }

    /// 다운로드 타임아웃
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    /// 레코드 간 지연
    pub fn pacing(&self) -> Duration {
        Duration::from_millis(self.pacing_ms)
    }

    /// 캐시 유효 시간
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache.ttl_hours.saturating_mul(3600))
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), FeedEngineError> {
        const MAX_FETCH_TIMEOUT_SECS: u64 = 300;
        const MAX_PACING_MS: u64 = 60_000;

        if self.fetch_timeout_secs == 0 || self.fetch_timeout_secs > MAX_FETCH_TIMEOUT_SECS {
            return Err(FeedEngineError::Config {
                field: "fetch_timeout_secs".to_owned(),
                reason: format!("must be 1-{}", MAX_FETCH_TIMEOUT_SECS),
            });
        }

        if self.pacing_ms > MAX_PACING_MS {
            return Err(FeedEngineError::Config {
                field: "pacing_ms".to_owned(),
                reason: format!("must be 0-{}", MAX_PACING_MS),
            });
        }

        if self.top_n == 0 {
            return Err(FeedEngineError::Config {
                field: "top_n".to_owned(),
                reason: "must be greater than 0".to_owned(),
            });
        }

        if self.max_payload_bytes == 0 {
            return Err(FeedEngineError::Config {
                field: "max_payload_bytes".to_owned(),
                reason: "must be greater than 0".to_owned(),
            });
        }

        if self.cache.enabled && self.cache.ttl_hours == 0 {
            return Err(FeedEngineError::Config {
                field: "cache.ttl_hours".to_owned(),
                reason: "must be greater than 0".to_owned(),
            });
        }

        Ok(())
    }
}

/// 엔진 설정 빌더
#[derive(Default)]
pub struct EngineConfigBuilder {
    config: EngineConfig,
}

impl EngineConfigBuilder {
    /// 새 빌더를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 다운로드 타임아웃(초)을 설정합니다.
    pub fn fetch_timeout_secs(mut self, secs: u64) -> Self {
        self.config.fetch_timeout_secs = secs;
        self
    }

    /// 레코드 간 지연(밀리초)을 설정합니다.
    pub fn pacing_ms(mut self, ms: u64) -> Self {
        self.config.pacing_ms = ms;
        self
    }

    /// 상위 항목 수를 설정합니다.
    pub fn top_n(mut self, n: usize) -> Self {
        self.config.top_n = n;
        self
    }

    /// 최대 페이로드 크기를 설정합니다.
    pub fn max_payload_bytes(mut self, bytes: usize) -> Self {
        self.config.max_payload_bytes = bytes;
        self
    }

    /// 재개 전략을 설정합니다.
    pub fn resume_strategy(mut self, strategy: ResumeStrategy) -> Self {
        self.config.resume_strategy = strategy;
        self
    }

    /// 일일 캐시를 설정합니다.
    pub fn cache(mut self, cache: CacheSettings) -> Self {
        self.config.cache = cache;
        self
    }

    /// 설정을 검증하고 빌드합니다.
    pub fn build(self) -> Result<EngineConfig, FeedEngineError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
