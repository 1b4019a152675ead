//! 파이프라인 trait -- 수집 엔진의 확장 포인트 정의
//!
//! 엔진은 네트워크와 표시 계층을 직접 다루지 않고 두 trait을 통해서만 접근합니다.
//! 테스트에서는 메모리 기반 구현으로 교체할 수 있습니다.

use std::future::Future;

use bytes::Bytes;

use crate::error::FetchError;
use crate::event::RenderEvent;
use crate::types::FeedSource;

/// 다운로드된 원시 페이로드
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawPayload {
    body: Bytes,
}

impl RawPayload {
    /// 바이트로 페이로드를 생성합니다.
    pub fn new(body: impl Into<Bytes>) -> Self {
        Self { body: body.into() }
    }

    /// 원시 바이트
    pub fn bytes(&self) -> &Bytes {
        &self.body
    }

    /// 페이로드 크기 (바이트)
    pub fn len(&self) -> usize {
        self.body.len()
    }

    /// 비어 있는지 여부
    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }

    /// UTF-8 텍스트로 변환합니다. 잘못된 시퀀스는 대체 문자로 바뀝니다.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

impl From<&'static str> for RawPayload {
    fn from(s: &'static str) -> Self {
        Self::new(Bytes::from_static(s.as_bytes()))
    }
}

impl From<String> for RawPayload {
    fn from(s: String) -> Self {
        Self::new(Bytes::from(s))
    }
}

/// 피드 다운로드 trait
///
/// 시도당 HTTP GET 한 번을 수행하며 재시도하지 않습니다.
/// `Send + Sync + 'static`이므로 실행 루프 태스크와 공유할 수 있습니다.
pub trait FeedFetcher: Send + Sync + 'static {
    /// 피드 페이로드를 다운로드합니다.
    ///
    /// credential이 있으면 `Authorization: Bearer <credential>` 헤더를 붙입니다.
    fn fetch(
        &self,
        source: &FeedSource,
    ) -> impl Future<Output = Result<RawPayload, FetchError>> + Send;
}

/// 렌더 싱크 trait
///
/// 유효 레코드와 상태 전환을 받아 표시합니다.
/// 엔진 상태 잠금을 잡은 채 호출될 수 있으므로 블로킹하지 않아야 합니다.
pub trait RenderSink: Send + Sync + 'static {
    /// 이벤트를 전달합니다.
    fn emit(&self, event: RenderEvent);
}
