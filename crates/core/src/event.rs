//! 렌더 이벤트 -- 수집 엔진이 표시 계층으로 보내는 메시지
//!
//! 엔진은 표시 방식을 알지 못하며, 유효 레코드와 상태 전환을
//! [`RenderEvent`]로 [`RenderSink`](crate::pipeline::RenderSink)에 전달합니다.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::Record;

/// 상태 표시줄 메시지
///
/// `Display` 구현이 운영자에게 보이는 문자열 형식을 결정합니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StatusMessage {
    /// 실행 시작 또는 재개
    Running { feed: String },
    /// 일시정지 (다음에 처리할 1-based 위치)
    Paused { position: usize },
    /// 모든 레코드 처리 완료
    Finished {
        feed: String,
        processed: u64,
        skipped: u64,
    },
    /// 다운로드 실패
    FetchFailed { feed: String },
    /// 파싱 실패 또는 빈 페이로드
    NoData { feed: String },
    /// 운영자가 중지
    Stopped,
}

impl fmt::Display for StatusMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Running { feed } => write!(f, "Running - {feed}"),
            Self::Paused { position } => write!(f, "Paused at {position}"),
            Self::Finished {
                feed,
                processed,
                skipped,
            } => write!(
                f,
                "Finished - {feed} - Processed: {processed}, Skipped: {skipped}"
            ),
            Self::FetchFailed { feed } => write!(f, "Error fetching {feed}"),
            Self::NoData { feed } => write!(f, "No data in {feed}"),
            Self::Stopped => write!(f, "Stopped"),
        }
    }
}

/// 렌더 싱크로 전달되는 이벤트
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RenderEvent {
    /// 새 실행 시작 -- 표시 영역 초기화
    Cleared,
    /// 처리된 유효 레코드
    Record {
        /// 피드 내 1-based 위치
        display_index: usize,
        record: Record,
    },
    /// 상태 전환
    Status(StatusMessage),
    /// 검색 결과 없음
    NoResults { query: String },
}

impl RenderEvent {
    /// 상태 이벤트를 생성합니다.
    pub fn status(message: StatusMessage) -> Self {
        Self::Status(message)
    }

    /// 상태 이벤트인 경우 메시지를 반환합니다.
    pub fn as_status(&self) -> Option<&StatusMessage> {
        match self {
            Self::Status(msg) => Some(msg),
            _ => None,
        }
    }
}
