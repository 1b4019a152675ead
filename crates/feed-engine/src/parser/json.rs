//! JSON 피드 파서
//!
//! # 지원 형식
//! - 최상위 배열: 그대로 레코드 시퀀스로 사용
//! - envelope 객체: `data`, `items`, `results`, `threats` 순서로 배열 필드를 탐색
//! - 그 밖의 객체: 단일 레코드로 취급
//!
//! 문자열/숫자 등 다른 최상위 값은 [`ParseError::UnexpectedShape`]입니다.

use ironfeed_core::error::ParseError;
use ironfeed_core::types::{FeedFormat, JsonRecord, Record};
use serde_json::Value;

use super::{FeedParser, ParsedFeed};

/// envelope 배열 필드 탐색 순서
pub const ENVELOPE_FIELDS: [&str; 4] = ["data", "items", "results", "threats"];

/// JSON 피드 파서
#[derive(Debug, Clone)]
pub struct JsonFeedParser {
    envelope_fields: Vec<String>,
}

impl JsonFeedParser {
    /// 기본 envelope 필드 목록으로 파서를 생성합니다.
    pub fn new() -> Self {
        Self {
            envelope_fields: ENVELOPE_FIELDS.iter().map(|f| (*f).to_owned()).collect(),
        }
    }

    /// envelope 필드 탐색 순서를 교체합니다.
    pub fn with_envelope_fields(mut self, fields: Vec<String>) -> Self {
        self.envelope_fields = fields;
        self
    }

    /// 객체에서 envelope 배열을 찾아 꺼냅니다.
    fn unwrap_envelope(&self, mut obj: serde_json::Map<String, Value>) -> Vec<Value> {
        for field in &self.envelope_fields {
            if matches!(obj.get(field), Some(Value::Array(_)))
                && let Some(Value::Array(items)) = obj.remove(field)
            {
                return items;
            }
        }
        vec![Value::Object(obj)]
    }
}

impl Default for JsonFeedParser {
    fn default() -> Self {
        Self::new()
    }
}

impl FeedParser for JsonFeedParser {
    fn format(&self) -> FeedFormat {
        FeedFormat::Json
    }

    fn parse(&self, text: &str) -> Result<ParsedFeed, ParseError> {
        let root: Value = serde_json::from_str(text).map_err(|e| ParseError::Malformed {
            format: "json".to_owned(),
            reason: e.to_string(),
        })?;

        let items = match root {
            Value::Array(items) => items,
            Value::Object(obj) => self.unwrap_envelope(obj),
            Value::Null => return Err(ParseError::UnexpectedShape("null".to_owned())),
            Value::Bool(_) => return Err(ParseError::UnexpectedShape("bool".to_owned())),
            Value::Number(_) => return Err(ParseError::UnexpectedShape("number".to_owned())),
            Value::String(_) => return Err(ParseError::UnexpectedShape("string".to_owned())),
        };

        if items.is_empty() {
            return Err(ParseError::Empty {
                format: "json".to_owned(),
            });
        }

        Ok(ParsedFeed {
            header: None,
            records: items
                .into_iter()
                .map(|v| Record::Json(JsonRecord::new(v)))
                .collect(),
        })
    }
}
