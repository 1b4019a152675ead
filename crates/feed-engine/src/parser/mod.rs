//! 피드 파싱 모듈 -- CSV, JSON 형식별 파서
//!
//! [`ParserRouter`]는 피드 형식에 맞는 파서를 선택해 원시 페이로드를
//! 레코드 시퀀스([`ParsedFeed`])로 변환합니다.
//!
//! # 지원 형식
//! - 주석 헤더가 붙은 CSV ([`CsvFeedParser`])
//! - 배열 또는 envelope 객체 JSON ([`JsonFeedParser`])
//!
//! # 사용 예시
//! ```ignore
//! use ironfeed_core::types::FeedFormat;
//! use ironfeed_engine::parser::ParserRouter;
//!
//! let router = ParserRouter::with_defaults();
//! let feed = router.parse(FeedFormat::Json, &payload)?;
//! ```

pub mod csv;
pub mod json;

pub use self::csv::CsvFeedParser;
pub use self::json::JsonFeedParser;

use ironfeed_core::error::ParseError;
use ironfeed_core::metrics as m;
use ironfeed_core::pipeline::RawPayload;
use ironfeed_core::types::{FeedFormat, Record};
use tracing::debug;

use crate::error::FeedEngineError;

/// 기본 최대 페이로드 크기 (64 MiB)
pub const DEFAULT_MAX_PAYLOAD_BYTES: usize = 64 * 1024 * 1024;

/// 파싱 결과
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedFeed {
    /// CSV 헤더 행 (JSON은 `None`)
    pub header: Option<Vec<String>>,
    /// 데이터 레코드 (구조 검증 전)
    pub records: Vec<Record>,
}

impl ParsedFeed {
    /// 레코드 수
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// 레코드가 없는지 여부
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// 피드 파서 trait
///
/// 새로운 피드 형식을 지원하려면 이 trait을 구현합니다.
pub trait FeedParser: Send + Sync {
    /// 처리하는 피드 형식
    fn format(&self) -> FeedFormat;

    /// 텍스트 페이로드를 레코드 시퀀스로 파싱합니다.
    fn parse(&self, text: &str) -> Result<ParsedFeed, ParseError>;
}

/// 파서 라우터 -- 피드 형식에 맞는 파서로 페이로드를 전달합니다.
pub struct ParserRouter {
    /// 등록된 파서 목록
    parsers: Vec<Box<dyn FeedParser>>,
    /// 최대 허용 페이로드 크기 (바이트)
    max_payload_bytes: usize,
}

impl ParserRouter {
    /// 빈 파서 라우터를 생성합니다.
    pub fn new() -> Self {
        Self {
            parsers: Vec::new(),
            max_payload_bytes: DEFAULT_MAX_PAYLOAD_BYTES,
        }
    }

    /// 기본 파서 세트 (CSV + JSON)로 라우터를 생성합니다.
    pub fn with_defaults() -> Self {
        Self::new()
            .register(Box::new(CsvFeedParser::new()))
            .register(Box::new(JsonFeedParser::new()))
    }

    /// 파서를 등록합니다. 같은 형식의 파서가 있으면 교체합니다.
    pub fn register(mut self, parser: Box<dyn FeedParser>) -> Self {
        self.parsers.retain(|p| p.format() != parser.format());
        self.parsers.push(parser);
        self
    }

    /// 최대 페이로드 크기를 설정합니다.
    pub fn with_max_payload_bytes(mut self, max: usize) -> Self {
        self.max_payload_bytes = max;
        self
    }

    /// 지정한 형식의 파서로 페이로드를 파싱합니다.
    pub fn parse(
        &self,
        format: FeedFormat,
        payload: &RawPayload,
    ) -> Result<ParsedFeed, FeedEngineError> {
        let parser = self
            .parsers
            .iter()
            .find(|p| p.format() == format)
            .ok_or_else(|| FeedEngineError::UnsupportedFormat(format.to_string()))?;

        if payload.len() > self.max_payload_bytes {
            metrics::counter!(m::FEED_PARSE_ERRORS_TOTAL, m::LABEL_FORMAT => format.to_string())
                .increment(1);
            return Err(ParseError::TooLarge {
                size: payload.len(),
                max: self.max_payload_bytes,
            }
            .into());
        }

        match parser.parse(&payload.text()) {
            Ok(feed) => {
                debug!(%format, records = feed.len(), "payload parsed");
                Ok(feed)
            }
            Err(e) => {
                metrics::counter!(m::FEED_PARSE_ERRORS_TOTAL, m::LABEL_FORMAT => format.to_string())
                    .increment(1);
                Err(e.into())
            }
        }
    }

    /// 등록된 파서 형식 목록을 반환합니다.
    pub fn registered_formats(&self) -> Vec<FeedFormat> {
        self.parsers.iter().map(|p| p.format()).collect()
    }
}

impl Default for ParserRouter {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_router_returns_unsupported_format() {
        let router = ParserRouter::new();
        let err = router
            .parse(FeedFormat::Csv, &RawPayload::from("a,b\n"))
            .unwrap_err();
        assert!(matches!(err, FeedEngineError::UnsupportedFormat(_)));
    }

    #[test]
    fn with_defaults_has_both_parsers() {
        let router = ParserRouter::with_defaults();
        let formats = router.registered_formats();
        assert!(formats.contains(&FeedFormat::Csv));
        assert!(formats.contains(&FeedFormat::Json));
    }

    #[test]
    fn register_replaces_same_format() {
        let router = ParserRouter::with_defaults().register(Box::new(
            JsonFeedParser::new().with_envelope_fields(vec!["entries".to_owned()]),
        ));
        assert_eq!(router.registered_formats().len(), 2);
        let feed = router
            .parse(
                FeedFormat::Json,
                &RawPayload::from(r#"{"entries": [{"a": 1}, {"a": 2}]}"#),
            )
            .unwrap();
        assert_eq!(feed.len(), 2);
    }

    #[test]
    fn oversized_payload_is_rejected() {
        let router = ParserRouter::with_defaults().with_max_payload_bytes(4);
        let err = router
            .parse(FeedFormat::Csv, &RawPayload::from("id,url\n1,2\n"))
            .unwrap_err();
        assert!(matches!(
            err,
            FeedEngineError::Parse(ParseError::TooLarge { max: 4, .. })
        ));
    }

    #[test]
    fn routes_by_format() {
        let router = ParserRouter::with_defaults();
        let payload = RawPayload::from("[{\"id\": 1}]");
        assert!(router.parse(FeedFormat::Json, &payload).is_ok());
        // 같은 페이로드를 CSV로 해석하면 헤더 한 줄뿐
        let feed = router.parse(FeedFormat::Csv, &payload).unwrap();
        assert!(feed.is_empty());
    }
}
