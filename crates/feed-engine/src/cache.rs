//! 일일 페이로드 캐시
//!
//! [`CachedFetcher`]는 임의의 [`FeedFetcher`]를 감싸 피드별 원시 페이로드와
//! 마지막 다운로드 시각을 디스크에 저장합니다.
//!
//! - 유효 시간(`ttl`) 안이면 네트워크 호출 없이 캐시를 반환합니다.
//! - 다운로드가 실패하면 만료된 캐시라도 경고와 함께 반환합니다.
//! - 캐시 쓰기 실패는 다운로드 결과에 영향을 주지 않습니다.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use ironfeed_core::error::FetchError;
use ironfeed_core::metrics as m;
use ironfeed_core::pipeline::{FeedFetcher, RawPayload};
use ironfeed_core::types::FeedSource;

use crate::error::FeedEngineError;

/// 페이로드 파일 확장자
const PAYLOAD_EXT: &str = "payload";
/// 타임스탬프 파일 확장자
const TIMESTAMP_EXT: &str = "fetched_at";

/// 디스크에 저장된 캐시 항목
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// 저장된 페이로드
    pub payload: RawPayload,
    /// 마지막 다운로드 시각
    pub fetched_at: DateTime<Utc>,
}

impl CacheEntry {
    /// `now` 기준으로 `ttl` 안에 있는지 여부
    pub fn is_fresh(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        let age = now.signed_duration_since(self.fetched_at);
        match age.to_std() {
            Ok(age) => age < ttl,
            // 미래 시각은 시계 차이로 보고 신선한 것으로 취급
            Err(_) => true,
        }
    }
}

/// 일일 캐시 다운로더
#[derive(Debug, Clone)]
pub struct CachedFetcher<F> {
    inner: F,
    dir: PathBuf,
    ttl: Duration,
}

impl<F: FeedFetcher> CachedFetcher<F> {
    /// 캐시 디렉토리를 만들고 다운로더를 감쌉니다.
    pub async fn new(
        inner: F,
        dir: impl Into<PathBuf>,
        ttl: Duration,
    ) -> Result<Self, FeedEngineError> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| FeedEngineError::Cache {
                path: dir.display().to_string(),
                reason: e.to_string(),
            })?;
        Ok(Self { inner, dir, ttl })
    }

    /// 감싼 다운로더
    pub fn inner(&self) -> &F {
        &self.inner
    }

    /// 캐시 디렉토리
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// 피드의 캐시 항목을 읽습니다. 없거나 손상되었으면 `None`.
    pub async fn load(&self, source: &FeedSource) -> Option<CacheEntry> {
        let (payload_path, stamp_path) = self.paths(source);

        let stamp = tokio::fs::read_to_string(&stamp_path).await.ok()?;
        let fetched_at = match DateTime::parse_from_rfc3339(stamp.trim()) {
            Ok(ts) => ts.with_timezone(&Utc),
            Err(e) => {
                warn!(path = %stamp_path.display(), error = %e, "corrupt cache timestamp, ignoring");
                return None;
            }
        };
        let body = tokio::fs::read(&payload_path).await.ok()?;

        Some(CacheEntry {
            payload: RawPayload::new(body),
            fetched_at,
        })
    }

    /// 페이로드와 현재 시각을 저장합니다.
    pub async fn store(
        &self,
        source: &FeedSource,
        payload: &RawPayload,
    ) -> Result<(), FeedEngineError> {
        self.store_at(source, payload, Utc::now()).await
    }

    /// 지정한 시각으로 페이로드를 저장합니다.
    pub async fn store_at(
        &self,
        source: &FeedSource,
        payload: &RawPayload,
        fetched_at: DateTime<Utc>,
    ) -> Result<(), FeedEngineError> {
        let (payload_path, stamp_path) = self.paths(source);
        write_file(&payload_path, payload.bytes()).await?;
        write_file(&stamp_path, fetched_at.to_rfc3339().as_bytes()).await?;
        Ok(())
    }

    fn paths(&self, source: &FeedSource) -> (PathBuf, PathBuf) {
        let stem = cache_stem(&source.name);
        (
            self.dir.join(format!("{stem}.{PAYLOAD_EXT}")),
            self.dir.join(format!("{stem}.{TIMESTAMP_EXT}")),
        )
    }
}

impl<F: FeedFetcher> FeedFetcher for CachedFetcher<F> {
    async fn fetch(&self, source: &FeedSource) -> Result<RawPayload, FetchError> {
        let cached = self.load(source).await;

        if let Some(entry) = &cached
            && entry.is_fresh(Utc::now(), self.ttl)
        {
            metrics::counter!(m::FEED_FETCH_TOTAL, m::LABEL_RESULT => "cached").increment(1);
            info!(
                feed = %source.name,
                fetched_at = %entry.fetched_at.to_rfc3339(),
                "serving cached payload"
            );
            return Ok(entry.payload.clone());
        }

        match self.inner.fetch(source).await {
            Ok(payload) => {
                if let Err(e) = self.store(source, &payload).await {
                    warn!(feed = %source.name, error = %e, "failed to update payload cache");
                } else {
                    debug!(feed = %source.name, bytes = payload.len(), "payload cache updated");
                }
                Ok(payload)
            }
            Err(err) => match cached {
                Some(entry) => {
                    warn!(
                        feed = %source.name,
                        error = %err,
                        fetched_at = %entry.fetched_at.to_rfc3339(),
                        "download failed, serving stale cached payload"
                    );
                    Ok(entry.payload)
                }
                None => Err(err),
            },
        }
    }
}

/// 피드 이름을 파일 이름으로 쓸 수 있게 변환합니다.
fn cache_stem(name: &str) -> String {
    let stem: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect();
    if stem.is_empty() {
        "feed".to_owned()
    } else {
        stem
    }
}

async fn write_file(path: &Path, contents: &[u8]) -> Result<(), FeedEngineError> {
    tokio::fs::write(path, contents)
        .await
        .map_err(|e| FeedEngineError::Cache {
            path: path.display().to_string(),
            reason: e.to_string(),
        })
}
