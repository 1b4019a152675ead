//! 도메인 타입 -- 시스템 전역에서 사용되는 공통 타입
//!
//! 피드 정의([`FeedSource`]), 정규화된 위협 레코드([`Record`]),
//! 실행 상태([`RunStatus`])를 정의합니다.
//!
//! CSV 행과 JSON 객체는 [`Record`] 태그드 variant로 구분되며,
//! 집계에 필요한 접근자는 [`ThreatFields`] trait으로 variant마다 구현됩니다.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{OperatorError, RecordError};

/// 정규화 레코드가 갖는 의미 필드 (CSV 컬럼 0~8 순서)
pub const RECORD_FIELDS: [&str; 9] = [
    "id",
    "dateAdded",
    "url",
    "status",
    "lastOnline",
    "threatType",
    "tags",
    "details",
    "reporter",
];

/// 렌더링용 필드 라벨 (`RECORD_FIELDS`와 같은 순서)
pub const RECORD_LABELS: [&str; 9] = [
    "ID",
    "Date Added",
    "URL",
    "Status",
    "Last Online",
    "Threat",
    "Tags",
    "Details",
    "Reporter",
];

/// 유효한 CSV 행의 최소 필드 수
pub const CSV_MIN_FIELDS: usize = RECORD_FIELDS.len();

/// URL 컬럼 위치
const CSV_URL_COLUMN: usize = 2;
/// 태그 컬럼 위치
const CSV_TAGS_COLUMN: usize = 6;
/// 리포터 컬럼 위치
const CSV_REPORTER_COLUMN: usize = 8;

/// 파싱할 수 없는 URL이나 빈 값을 집계할 때 사용하는 키
pub const UNKNOWN_KEY: &str = "unknown";

// ─── FeedFormat ──────────────────────────────────────────────────────

/// 피드 페이로드 형식
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedFormat {
    /// 쉼표 구분 CSV
    #[default]
    Csv,
    /// JSON 배열 또는 envelope 객체
    Json,
}

impl fmt::Display for FeedFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Csv => write!(f, "csv"),
            Self::Json => write!(f, "json"),
        }
    }
}

impl FromStr for FeedFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            other => Err(format!("unsupported feed format '{other}' (expected csv or json)")),
        }
    }
}

// ─── FeedSource ──────────────────────────────────────────────────────

/// 피드 정의
///
/// 생성 후에는 변경되지 않습니다. `name`은 피드 목록에서 고유한 표시 키입니다.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedSource {
    /// 고유 이름
    pub name: String,
    /// HTTP(S) 엔드포인트
    pub endpoint: String,
    /// 페이로드 형식
    pub format: FeedFormat,
    /// Bearer 토큰 (선택)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credential: Option<String>,
}

impl FeedSource {
    /// 피드 정의를 검증하여 생성합니다.
    ///
    /// 이름이 비어 있거나 엔드포인트가 http/https URL이 아니면 실패합니다.
    /// 빈 문자열 credential은 `None`으로 취급합니다.
    pub fn new(
        name: impl Into<String>,
        endpoint: impl Into<String>,
        format: FeedFormat,
        credential: Option<String>,
    ) -> Result<Self, OperatorError> {
        let name = name.into().trim().to_owned();
        let endpoint = endpoint.into().trim().to_owned();

        if name.is_empty() {
            return Err(OperatorError::InvalidSource {
                name,
                reason: "name is required".to_owned(),
            });
        }

        let parsed = url::Url::parse(&endpoint).map_err(|e| OperatorError::InvalidSource {
            name: name.clone(),
            reason: format!("invalid endpoint '{endpoint}': {e}"),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(OperatorError::InvalidSource {
                name,
                reason: format!("unsupported scheme '{}'", parsed.scheme()),
            });
        }

        let credential = credential
            .map(|c| c.trim().to_owned())
            .filter(|c| !c.is_empty());

        Ok(Self {
            name,
            endpoint,
            format,
            credential,
        })
    }

    /// credential 보유 여부
    pub fn has_credential(&self) -> bool {
        self.credential.is_some()
    }
}

// credential이 로그에 남지 않도록 Debug를 직접 구현합니다.
impl fmt::Debug for FeedSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FeedSource")
            .field("name", &self.name)
            .field("endpoint", &self.endpoint)
            .field("format", &self.format)
            .field("credential", &self.credential.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl fmt::Display for FeedSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}, {})", self.name, self.format, self.endpoint)
    }
}

// ─── ThreatFields ────────────────────────────────────────────────────

/// 집계/검색에 필요한 레코드 접근자
///
/// CSV 행은 위치로, JSON 객체는 키 이름으로 필드를 찾습니다.
pub trait ThreatFields {
    /// URL 필드 값
    fn url(&self) -> Option<String>;

    /// 리포터 필드 값
    fn reporter(&self) -> Option<String>;

    /// 레코드의 고유 태그 목록 (입력 순서 유지)
    fn tags(&self) -> Vec<String>;

    /// (라벨, 값) 쌍 목록. 렌더링과 검색에 사용합니다.
    fn labeled_values(&self) -> Vec<(String, String)>;

    /// URL의 scheme+host 부분
    fn authority(&self) -> Option<String> {
        self.url().map(|u| origin_authority(&u))
    }
}

// ─── CsvRow ──────────────────────────────────────────────────────────

/// CSV 데이터 행
///
/// 필드 수가 [`CSV_MIN_FIELDS`]보다 적은 행도 그대로 보관하며,
/// 건너뛸지 여부는 레코드 처리 단계에서 [`CsvRow::validate`]로 결정합니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CsvRow {
    fields: Vec<String>,
}

impl CsvRow {
    /// 필드 목록으로 행을 생성합니다.
    pub fn new(fields: Vec<String>) -> Self {
        Self { fields }
    }

    /// 전체 필드
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// 위치로 필드를 조회합니다.
    pub fn get(&self, index: usize) -> Option<&str> {
        self.fields.get(index).map(String::as_str)
    }

    /// 필드 수
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// 필드가 없는지 여부
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// 필드 수를 검증합니다.
    pub fn validate(&self) -> Result<(), RecordError> {
        if self.fields.len() < CSV_MIN_FIELDS {
            return Err(RecordError::InsufficientFields {
                expected: CSV_MIN_FIELDS,
                found: self.fields.len(),
            });
        }
        Ok(())
    }
}

impl ThreatFields for CsvRow {
    fn url(&self) -> Option<String> {
        self.get(CSV_URL_COLUMN).map(str::to_owned)
    }

    fn reporter(&self) -> Option<String> {
        self.get(CSV_REPORTER_COLUMN).map(str::to_owned)
    }

    fn tags(&self) -> Vec<String> {
        self.get(CSV_TAGS_COLUMN).map(split_tags).unwrap_or_default()
    }

    fn labeled_values(&self) -> Vec<(String, String)> {
        self.fields
            .iter()
            .enumerate()
            .map(|(i, value)| {
                let label = RECORD_LABELS
                    .get(i)
                    .map(|l| (*l).to_owned())
                    .unwrap_or_else(|| format!("Field {}", i + 1));
                (label, value.clone())
            })
            .collect()
    }
}

// ─── JsonRecord ──────────────────────────────────────────────────────

/// JSON 레코드
///
/// 배열 원소를 그대로 보관합니다. 객체가 아닌 원소는 [`JsonRecord::validate`]에서 걸러집니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JsonRecord {
    value: serde_json::Value,
}

impl JsonRecord {
    /// JSON 값으로 레코드를 생성합니다.
    pub fn new(value: serde_json::Value) -> Self {
        Self { value }
    }

    /// 원본 JSON 값
    pub fn value(&self) -> &serde_json::Value {
        &self.value
    }

    /// 키로 값을 조회합니다.
    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.value.get(key)
    }

    /// 객체 키 목록 (입력 순서)
    pub fn keys(&self) -> Vec<&str> {
        self.value
            .as_object()
            .map(|obj| obj.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// 원소가 객체인지 검증합니다.
    pub fn validate(&self) -> Result<(), RecordError> {
        if self.value.is_object() {
            Ok(())
        } else {
            Err(RecordError::NotAnObject {
                kind: json_kind(&self.value).to_owned(),
            })
        }
    }

    fn text_field(&self, key: &str) -> Option<String> {
        match self.get(key) {
            None | Some(serde_json::Value::Null) => None,
            Some(v) => Some(json_text(v)),
        }
    }
}

impl ThreatFields for JsonRecord {
    fn url(&self) -> Option<String> {
        self.text_field("url")
    }

    fn reporter(&self) -> Option<String> {
        self.text_field("reporter")
    }

    fn tags(&self) -> Vec<String> {
        match self.get("tags") {
            Some(serde_json::Value::String(s)) => split_tags(s),
            Some(serde_json::Value::Array(items)) => {
                let mut tags: Vec<String> = Vec::new();
                for item in items {
                    for tag in split_tags(&json_text(item)) {
                        if !tags.contains(&tag) {
                            tags.push(tag);
                        }
                    }
                }
                tags
            }
            Some(serde_json::Value::Null) | None => Vec::new(),
            Some(other) => split_tags(&json_text(other)),
        }
    }

    fn labeled_values(&self) -> Vec<(String, String)> {
        match self.value.as_object() {
            Some(obj) => obj
                .iter()
                .map(|(k, v)| (k.clone(), json_text(v)))
                .collect(),
            None => vec![("value".to_owned(), json_text(&self.value))],
        }
    }
}

// ─── Record ──────────────────────────────────────────────────────────

/// 정규화 레코드 -- CSV 행 또는 JSON 객체
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "format", content = "record", rename_all = "lowercase")]
pub enum Record {
    /// 위치 기반 CSV 행
    Csv(CsvRow),
    /// 키 기반 JSON 객체
    Json(JsonRecord),
}

impl Record {
    /// 레코드 형식
    pub fn format(&self) -> FeedFormat {
        match self {
            Self::Csv(_) => FeedFormat::Csv,
            Self::Json(_) => FeedFormat::Json,
        }
    }

    /// 레코드 구조를 검증합니다.
    pub fn validate(&self) -> Result<(), RecordError> {
        match self {
            Self::Csv(row) => row.validate(),
            Self::Json(rec) => rec.validate(),
        }
    }

    /// 어느 필드든 `query`를 포함하는지 대소문자 구분 없이 검사합니다.
    ///
    /// `needle`은 이미 소문자로 변환된 검색어여야 합니다.
    pub fn matches_lowercase(&self, needle: &str) -> bool {
        match self {
            Self::Csv(row) => row
                .fields()
                .iter()
                .any(|f| f.to_lowercase().contains(needle)),
            Self::Json(rec) => rec
                .labeled_values()
                .iter()
                .any(|(_, v)| v.to_lowercase().contains(needle)),
        }
    }
}

impl ThreatFields for Record {
    fn url(&self) -> Option<String> {
        match self {
            Self::Csv(row) => row.url(),
            Self::Json(rec) => rec.url(),
        }
    }

    fn reporter(&self) -> Option<String> {
        match self {
            Self::Csv(row) => row.reporter(),
            Self::Json(rec) => rec.reporter(),
        }
    }

    fn tags(&self) -> Vec<String> {
        match self {
            Self::Csv(row) => row.tags(),
            Self::Json(rec) => rec.tags(),
        }
    }

    fn labeled_values(&self) -> Vec<(String, String)> {
        match self {
            Self::Csv(row) => row.labeled_values(),
            Self::Json(rec) => rec.labeled_values(),
        }
    }
}

// ─── RunStatus ───────────────────────────────────────────────────────

/// 수집 실행 상태
///
/// 상태 전환:
/// - `Idle`/`Stopped`/`Finished`/`Error` → Start → `Running`
/// - `Running` → Pause → `Paused` → Resume → `Running`
/// - `Running`/`Paused` → Stop → `Stopped`
/// - `Running` → 완료 → `Finished`, 다운로드/파싱 실패 → `Error`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    /// 실행 전
    #[default]
    Idle,
    /// 실행 중
    Running,
    /// 일시정지
    Paused,
    /// 운영자가 중지
    Stopped,
    /// 모든 레코드 처리 완료
    Finished,
    /// 다운로드 또는 파싱 실패
    Error,
}

impl RunStatus {
    /// 새 실행(fresh start)을 시작할 수 있는 상태인지 여부
    pub fn accepts_fresh_start(self) -> bool {
        matches!(
            self,
            Self::Idle | Self::Stopped | Self::Finished | Self::Error
        )
    }

    /// 실행 루프가 살아 있을 수 있는 상태인지 여부
    pub fn is_active(self) -> bool {
        matches!(self, Self::Running | Self::Paused)
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Running => write!(f, "running"),
            Self::Paused => write!(f, "paused"),
            Self::Stopped => write!(f, "stopped"),
            Self::Finished => write!(f, "finished"),
            Self::Error => write!(f, "error"),
        }
    }
}

// ─── 헬퍼 ────────────────────────────────────────────────────────────

/// URL의 scheme+host(+port) 부분을 반환합니다.
///
/// 파싱할 수 없거나 host가 없으면 [`UNKNOWN_KEY`]를 반환합니다.
pub fn origin_authority(raw: &str) -> String {
    let Ok(parsed) = url::Url::parse(raw.trim()) else {
        return UNKNOWN_KEY.to_owned();
    };
    match (parsed.host_str(), parsed.port()) {
        (Some(host), Some(port)) => format!("{}://{}:{}", parsed.scheme(), host, port),
        (Some(host), None) => format!("{}://{}", parsed.scheme(), host),
        (None, _) => UNKNOWN_KEY.to_owned(),
    }
}

/// 쉼표로 구분된 태그 문자열을 고유 태그 목록으로 분리합니다.
pub fn split_tags(raw: &str) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();
    for tag in raw.split(',').map(str::trim).filter(|t| !t.is_empty()) {
        if !tags.iter().any(|t| t == tag) {
            tags.push(tag.to_owned());
        }
    }
    tags
}

/// JSON 값을 표시용 문자열로 변환합니다. 문자열은 따옴표 없이 그대로 사용합니다.
pub fn json_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
