//! HTTP 피드 다운로더
//!
//! [`HttpFetcher`]는 시도당 GET 한 번을 수행합니다. 재시도/백오프는 하지 않으며,
//! 실패는 [`FetchError`]로 보고되어 실행을 `Error` 상태로 전환시킵니다.

use std::time::{Duration, Instant};

use reqwest::Client;
use reqwest::header::{AUTHORIZATION, HeaderValue};
use tracing::{debug, warn};

use ironfeed_core::error::FetchError;
use ironfeed_core::metrics as m;
use ironfeed_core::pipeline::{FeedFetcher, RawPayload};
use ironfeed_core::types::FeedSource;

use crate::error::FeedEngineError;

/// 기본 User-Agent
const USER_AGENT: &str = concat!("ironfeed/", env!("CARGO_PKG_VERSION"));

/// reqwest 기반 피드 다운로더
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    timeout: Duration,
}

impl HttpFetcher {
    /// 지정한 타임아웃으로 다운로더를 생성합니다.
    pub fn new(timeout: Duration) -> Result<Self, FeedEngineError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| FeedEngineError::HttpClient(e.to_string()))?;
        Ok(Self { client, timeout })
    }

    /// 요청 타임아웃
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn classify(&self, source: &FeedSource, err: &reqwest::Error) -> FetchError {
        if err.is_timeout() {
            FetchError::Timeout {
                endpoint: source.endpoint.clone(),
                timeout_secs: self.timeout.as_secs(),
            }
        } else {
            FetchError::Network {
                endpoint: source.endpoint.clone(),
                reason: err.to_string(),
            }
        }
    }

    async fn get(&self, source: &FeedSource) -> Result<RawPayload, FetchError> {
        let mut request = self.client.get(&source.endpoint);
        if let Some(credential) = &source.credential {
            let value = HeaderValue::from_str(&format!("Bearer {credential}")).map_err(|_| {
                FetchError::Network {
                    endpoint: source.endpoint.clone(),
                    reason: "credential contains characters not allowed in a header".to_owned(),
                }
            })?;
            request = request.header(AUTHORIZATION, value);
        }

        let response = request.send().await.map_err(|e| self.classify(source, &e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Network {
                endpoint: source.endpoint.clone(),
                reason: format!("HTTP {status}"),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| self.classify(source, &e))?;
        Ok(RawPayload::new(body))
    }
}

impl FeedFetcher for HttpFetcher {
    async fn fetch(&self, source: &FeedSource) -> Result<RawPayload, FetchError> {
        let started = Instant::now();
        let result = self.get(source).await;
        metrics::histogram!(m::FEED_FETCH_DURATION_SECONDS)
            .record(started.elapsed().as_secs_f64());

        match &result {
            Ok(payload) => {
                metrics::counter!(m::FEED_FETCH_TOTAL, m::LABEL_RESULT => "success").increment(1);
                debug!(
                    feed = %source.name,
                    bytes = payload.len(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "feed downloaded"
                );
            }
            Err(e) => {
                metrics::counter!(m::FEED_FETCH_TOTAL, m::LABEL_RESULT => "failure").increment(1);
                warn!(feed = %source.name, error = %e, "feed download failed");
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ironfeed_core::types::FeedFormat;

    #[test]
    fn new_fetcher_keeps_timeout() {
        let fetcher = HttpFetcher::new(Duration::from_secs(3)).unwrap();
        assert_eq!(fetcher.timeout(), Duration::from_secs(3));
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_network_error() {
        let fetcher = HttpFetcher::new(Duration::from_secs(2)).unwrap();
        // 포트 1은 일반적으로 열려 있지 않음
        let source = FeedSource::new(
            "Closed",
            "http://127.0.0.1:1/feed.csv",
            FeedFormat::Csv,
            None,
        )
        .unwrap();
        let err = fetcher.fetch(&source).await.unwrap_err();
        assert!(matches!(err, FetchError::Network { .. }));
    }
}
