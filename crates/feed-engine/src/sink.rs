//! 렌더 싱크 구현
//!
//! - [`ChannelSink`]: 이벤트를 mpsc 채널로 보내 별도 태스크가 표시하도록 함
//! - [`MemorySink`]: 이벤트를 메모리에 보관 (헤드리스 실행, 테스트)

use std::sync::Mutex;

use tokio::sync::mpsc;
use tracing::trace;

use ironfeed_core::event::{RenderEvent, StatusMessage};
use ironfeed_core::pipeline::RenderSink;

/// 채널 기반 렌더 싱크
///
/// 수신 측이 닫혀도 엔진은 계속 동작합니다.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<RenderEvent>,
}

impl ChannelSink {
    /// 싱크와 수신 채널을 생성합니다.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<RenderEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl RenderSink for ChannelSink {
    fn emit(&self, event: RenderEvent) {
        if self.tx.send(event).is_err() {
            trace!("render receiver dropped, event discarded");
        }
    }
}

/// 메모리 렌더 싱크
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<RenderEvent>>,
}

impl MemorySink {
    /// 빈 싱크를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 지금까지 받은 이벤트의 사본
    pub fn events(&self) -> Vec<RenderEvent> {
        self.lock().clone()
    }

    /// 상태 메시지만 순서대로 반환합니다.
    pub fn statuses(&self) -> Vec<StatusMessage> {
        self.lock()
            .iter()
            .filter_map(|e| e.as_status().cloned())
            .collect()
    }

    /// 가장 최근 상태 메시지
    pub fn last_status(&self) -> Option<StatusMessage> {
        self.lock()
            .iter()
            .rev()
            .find_map(|e| e.as_status().cloned())
    }

    /// 렌더된 레코드의 display index 목록
    pub fn record_indices(&self) -> Vec<usize> {
        self.lock()
            .iter()
            .filter_map(|e| match e {
                RenderEvent::Record { display_index, .. } => Some(*display_index),
                _ => None,
            })
            .collect()
    }

    /// 이벤트를 모두 비우고 반환합니다.
    pub fn drain(&self) -> Vec<RenderEvent> {
        std::mem::take(&mut *self.lock())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<RenderEvent>> {
        // 보관만 하므로 poison 상태여도 데이터는 유효함
        self.events.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl RenderSink for MemorySink {
    fn emit(&self, event: RenderEvent) {
        self.lock().push(event);
    }
}
