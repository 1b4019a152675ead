//! 설정 관리 -- ironfeed.toml 파싱 및 런타임 설정
//!
//! [`IronfeedConfig`]는 모든 모듈의 설정을 담는 최상위 구조체입니다.
//!
//! # 설정 로딩 우선순위
//! 1. CLI 인자 (최고 우선)
//! 2. 환경변수 (`IRONFEED_INGEST_PACING_MS=250` 형식)
//! 3. 설정 파일 (`ironfeed.toml`)
//! 4. 기본값 (`Default` 구현)
//!
//! # 사용 예시
//! ```no_run
//! # async fn example() -> Result<(), ironfeed_core::error::IronfeedError> {
//! use ironfeed_core::config::IronfeedConfig;
//!
//! // 파일에서 로드 + 환경변수 오버라이드
//! let config = IronfeedConfig::load("ironfeed.toml").await?;
//!
//! // TOML 문자열에서 직접 파싱
//! let config = IronfeedConfig::parse("[ingest]\npacing_ms = 0")?;
//! # Ok(())
//! # }
//! ```

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, IronfeedError};
use crate::types::{FeedFormat, FeedSource};

/// 허용되는 로그 레벨
const VALID_LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];
/// 허용되는 로그 형식
const VALID_LOG_FORMATS: [&str; 2] = ["json", "pretty"];
/// 허용되는 재개 전략
const VALID_RESUME_STRATEGIES: [&str; 2] = ["refetch", "retain"];
/// 다운로드 타임아웃 상한 (초)
const MAX_FETCH_TIMEOUT_SECS: u64 = 300;

/// Ironfeed 통합 설정
///
/// `ironfeed.toml` 파일의 최상위 구조를 나타냅니다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IronfeedConfig {
    /// 일반 설정
    #[serde(default)]
    pub general: GeneralConfig,
    /// 수집 엔진 설정
    #[serde(default)]
    pub ingest: IngestConfig,
    /// 일일 페이로드 캐시 설정
    #[serde(default)]
    pub cache: CacheConfig,
    /// 알려진 피드 목록
    #[serde(default = "default_feeds")]
    pub feeds: Vec<FeedConfig>,
}

impl IronfeedConfig {
    /// TOML 파일에서 설정을 로드하고 환경변수 오버라이드를 적용합니다.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, IronfeedError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// TOML 파일에서 설정을 로드합니다 (환경변수 오버라이드 없음).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, IronfeedError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                IronfeedError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                IronfeedError::Io(e)
            }
        })?;
        let config = Self::parse(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// 설정 파일이 없으면 기본값을 사용합니다.
    ///
    /// 환경변수 오버라이드와 검증은 항상 적용됩니다.
    pub async fn load_or_default(path: impl AsRef<Path>) -> Result<Self, IronfeedError> {
        match Self::from_file(path.as_ref()).await {
            Ok(mut config) => {
                config.apply_env_overrides();
                config.validate()?;
                Ok(config)
            }
            Err(IronfeedError::Config(ConfigError::FileNotFound { path })) => {
                tracing::debug!(path = %path, "config file not found, using defaults");
                let mut config = Self::default_with_feeds();
                config.apply_env_overrides();
                config.validate()?;
                Ok(config)
            }
            Err(e) => Err(e),
        }
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, IronfeedError> {
        toml::from_str(toml_str).map_err(|e| {
            IronfeedError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 기본 피드 목록을 포함한 기본 설정
    ///
    /// `Default` derive는 빈 피드 목록을 만들기 때문에 별도로 제공합니다.
    pub fn default_with_feeds() -> Self {
        Self {
            feeds: default_feeds(),
            ..Self::default()
        }
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 환경변수 네이밍 규칙: `IRONFEED_{SECTION}_{FIELD}`
    /// 예: `IRONFEED_INGEST_FETCH_TIMEOUT_SECS=30`
    pub fn apply_env_overrides(&mut self) {
        // General
        override_string(&mut self.general.log_level, "IRONFEED_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "IRONFEED_GENERAL_LOG_FORMAT");
        override_string(&mut self.general.data_dir, "IRONFEED_GENERAL_DATA_DIR");

        // Ingest
        override_string(
            &mut self.ingest.default_feed,
            "IRONFEED_INGEST_DEFAULT_FEED",
        );
        override_u64(
            &mut self.ingest.fetch_timeout_secs,
            "IRONFEED_INGEST_FETCH_TIMEOUT_SECS",
        );
        override_u64(&mut self.ingest.pacing_ms, "IRONFEED_INGEST_PACING_MS");
        override_usize(&mut self.ingest.top_n, "IRONFEED_INGEST_TOP_N");
        override_usize(
            &mut self.ingest.max_payload_bytes,
            "IRONFEED_INGEST_MAX_PAYLOAD_BYTES",
        );
        override_string(
            &mut self.ingest.resume_strategy,
            "IRONFEED_INGEST_RESUME_STRATEGY",
        );

        // Cache
        override_bool(&mut self.cache.enabled, "IRONFEED_CACHE_ENABLED");
        override_string(&mut self.cache.dir, "IRONFEED_CACHE_DIR");
        override_u64(&mut self.cache.ttl_hours, "IRONFEED_CACHE_TTL_HOURS");
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), IronfeedError> {
        // log_level 검증
        if !VALID_LOG_LEVELS.contains(&self.general.log_level.as_str()) {
            return Err(invalid(
                "general.log_level",
                format!("must be one of: {}", VALID_LOG_LEVELS.join(", ")),
            ));
        }

        // log_format 검증
        if !VALID_LOG_FORMATS.contains(&self.general.log_format.as_str()) {
            return Err(invalid(
                "general.log_format",
                format!("must be one of: {}", VALID_LOG_FORMATS.join(", ")),
            ));
        }

        // ingest 검증
        if self.ingest.fetch_timeout_secs == 0
            || self.ingest.fetch_timeout_secs > MAX_FETCH_TIMEOUT_SECS
        {
            return Err(invalid(
                "ingest.fetch_timeout_secs",
                format!("must be between 1 and {MAX_FETCH_TIMEOUT_SECS}"),
            ));
        }
        if self.ingest.top_n == 0 {
            return Err(invalid("ingest.top_n", "must be greater than 0".to_owned()));
        }
        if self.ingest.max_payload_bytes == 0 {
            return Err(invalid(
                "ingest.max_payload_bytes",
                "must be greater than 0".to_owned(),
            ));
        }
        if !VALID_RESUME_STRATEGIES.contains(&self.ingest.resume_strategy.as_str()) {
            return Err(invalid(
                "ingest.resume_strategy",
                format!("must be one of: {}", VALID_RESUME_STRATEGIES.join(", ")),
            ));
        }

        // cache 검증 (활성화된 경우에만)
        if self.cache.enabled {
            if self.cache.dir.trim().is_empty() {
                return Err(invalid(
                    "cache.dir",
                    "must not be empty when cache is enabled".to_owned(),
                ));
            }
            if self.cache.ttl_hours == 0 {
                return Err(invalid(
                    "cache.ttl_hours",
                    "must be greater than 0".to_owned(),
                ));
            }
        }

        // feeds 검증
        let mut seen = HashSet::new();
        for (i, feed) in self.feeds.iter().enumerate() {
            let field = format!("feeds[{i}]");
            if feed.name.trim().is_empty() {
                return Err(invalid(&format!("{field}.name"), "must not be empty".to_owned()));
            }
            if !seen.insert(feed.name.as_str()) {
                return Err(invalid(
                    &format!("{field}.name"),
                    format!("duplicate feed name '{}'", feed.name),
                ));
            }
            FeedSource::new(&feed.name, &feed.endpoint, feed.format, None).map_err(|e| {
                invalid(&format!("{field}.endpoint"), e.to_string())
            })?;
        }

        if !self.ingest.default_feed.is_empty() && !seen.contains(self.ingest.default_feed.as_str())
        {
            return Err(invalid(
                "ingest.default_feed",
                format!("'{}' is not defined in [[feeds]]", self.ingest.default_feed),
            ));
        }

        Ok(())
    }

    /// 피드 설정을 [`FeedSource`] 목록으로 변환합니다.
    ///
    /// `credential_env`가 지정된 피드는 해당 환경변수에서 토큰을 읽습니다.
    pub fn feed_sources(&self) -> Result<Vec<FeedSource>, IronfeedError> {
        self.feeds.iter().map(FeedConfig::to_source).collect()
    }

    /// credential을 가린 사본을 반환합니다. 설정 출력에 사용합니다.
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        for feed in &mut copy.feeds {
            if feed.credential.is_some() {
                feed.credential = Some(REDACTED.to_owned());
            }
        }
        copy
    }
}

/// 가려진 credential 표시 문자열
pub const REDACTED: &str = "***";

/// 일반 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// 로그 레벨 (trace, debug, info, warn, error)
    pub log_level: String,
    /// 로그 형식 (json, pretty)
    pub log_format: String,
    /// 데이터 디렉토리
    pub data_dir: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "pretty".to_owned(),
            data_dir: ".ironfeed".to_owned(),
        }
    }
}

/// 수집 엔진 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// 시작 시 선택할 피드 이름 (비어 있으면 첫 번째 피드)
    pub default_feed: String,
    /// 다운로드 타임아웃 (초)
    pub fetch_timeout_secs: u64,
    /// 레코드 간 표시 지연 (밀리초, 0이면 지연 없음)
    pub pacing_ms: u64,
    /// 메트릭 화면의 상위 항목 수
    pub top_n: usize,
    /// 최대 페이로드 크기 (바이트)
    pub max_payload_bytes: usize,
    /// 재개 전략 (refetch, retain)
    pub resume_strategy: String,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            default_feed: String::new(),
            fetch_timeout_secs: 10,
            pacing_ms: 1000,
            top_n: 5,
            max_payload_bytes: 64 * 1024 * 1024,
            resume_strategy: "refetch".to_owned(),
        }
    }
}

/// 일일 페이로드 캐시 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// 활성화 여부
    pub enabled: bool,
    /// 캐시 디렉토리
    pub dir: String,
    /// 캐시 유효 시간 (시간)
    pub ttl_hours: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            dir: ".ironfeed/cache".to_owned(),
            ttl_hours: 24,
        }
    }
}

/// 피드 정의 설정 (`[[feeds]]`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    /// 고유 이름
    pub name: String,
    /// HTTP(S) 엔드포인트
    pub endpoint: String,
    /// 페이로드 형식
    #[serde(default)]
    pub format: FeedFormat,
    /// Bearer 토큰
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credential: Option<String>,
    /// Bearer 토큰을 담은 환경변수 이름
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credential_env: Option<String>,
}

impl FeedConfig {
    /// [`FeedSource`]로 변환합니다.
    ///
    /// `credential`이 우선하며, 없으면 `credential_env` 환경변수를 읽습니다.
    pub fn to_source(&self) -> Result<FeedSource, IronfeedError> {
        let credential = match (&self.credential, &self.credential_env) {
            (Some(c), _) => Some(c.clone()),
            (None, Some(env_key)) => match std::env::var(env_key) {
                Ok(val) => Some(val),
                Err(_) => {
                    warn!(
                        feed = self.name.as_str(),
                        env_key = env_key.as_str(),
                        "credential env var not set, fetching without credential"
                    );
                    None
                }
            },
            (None, None) => None,
        };

        FeedSource::new(&self.name, &self.endpoint, self.format, credential).map_err(|e| {
            IronfeedError::Config(ConfigError::InvalidValue {
                field: format!("feeds.{}", self.name),
                reason: e.to_string(),
            })
        })
    }
}

fn default_feeds() -> Vec<FeedConfig> {
    vec![FeedConfig {
        name: "URLhaus".to_owned(),
        endpoint: "https://urlhaus.abuse.ch/downloads/csv_online/".to_owned(),
        format: FeedFormat::Csv,
        credential: None,
        credential_env: None,
    }]
}

fn invalid(field: &str, reason: String) -> IronfeedError {
    ConfigError::InvalidValue {
        field: field.to_owned(),
        reason,
    }
    .into()
}

// --- 환경변수 오버라이드 헬퍼 ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_bool(target: &mut bool, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<bool>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse bool from env var, ignoring"
            ),
        }
    }
}

fn override_usize(target: &mut usize, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<usize>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse usize from env var, ignoring"
            ),
        }
    }
}

fn override_u64(target: &mut u64, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u64>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u64 from env var, ignoring"
            ),
        }
    }
}
