//! 에러 타입 -- 도메인별 에러 정의
//!
//! 피드 수집 과정의 에러는 처리 방식에 따라 구분됩니다.
//!
//! | 에러 | 전파 방식 |
//! |------|-----------|
//! | [`FetchError`], [`ParseError`] | 현재 실행을 중단하고 `Error` 상태로 전환 |
//! | [`RecordError`] | 해당 레코드만 건너뛰고 `skipped` 카운터 증가 |
//! | [`OperatorError`] | 사용자 경고로 표시, 실행 상태는 변경하지 않음 |

/// Ironfeed 최상위 에러 타입
#[derive(Debug, thiserror::Error)]
pub enum IronfeedError {
    /// 설정 관련 에러
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// 피드 다운로드 에러
    #[error("fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// 페이로드 파싱 에러
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// 운영자 명령 에러
    #[error("{0}")]
    Operator(#[from] OperatorError),

    /// 내보내기 에러
    #[error("export error: {0}")]
    Export(#[from] ExportError),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// 설정 관련 에러
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// 설정 파일을 찾을 수 없음
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// 설정 파싱 실패
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// 유효하지 않은 설정 값
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// 피드 다운로드 에러
///
/// 단일 시도만 수행하며 재시도하지 않습니다.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    /// 연결 실패, 비정상 HTTP 상태 코드 등
    #[error("network error fetching {endpoint}: {reason}")]
    Network { endpoint: String, reason: String },

    /// 요청 타임아웃
    #[error("timed out after {timeout_secs}s fetching {endpoint}")]
    Timeout { endpoint: String, timeout_secs: u64 },
}

/// 페이로드 파싱 에러
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    /// 문법 오류 (잘못된 JSON, CSV 토큰화 실패)
    #[error("malformed {format} payload: {reason}")]
    Malformed { format: String, reason: String },

    /// 객체도 배열도 아닌 JSON 루트
    #[error("unexpected payload shape: {0}")]
    UnexpectedShape(String),

    /// 데이터가 전혀 없는 페이로드
    #[error("empty {format} payload")]
    Empty { format: String },

    /// 입력 데이터 초과
    #[error("payload too large: {size} bytes (max: {max})")]
    TooLarge { size: usize, max: usize },
}

/// 레코드 단위 에러
///
/// 실행을 중단하지 않고 해당 레코드만 건너뜁니다.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecordError {
    /// CSV 행의 필드 수 부족
    #[error("insufficient fields: expected at least {expected}, found {found}")]
    InsufficientFields { expected: usize, found: usize },

    /// JSON 배열 원소가 객체가 아님
    #[error("json element is not an object: {kind}")]
    NotAnObject { kind: String },
}

/// 운영자 명령 에러
///
/// 명령 표면(CLI 등)에서 경고로 표시되며 실행 상태를 바꾸지 않습니다.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OperatorError {
    /// 실행 중이거나 일시정지된 실행이 없음
    #[error("no feed is currently running")]
    NoActiveRun,

    /// 일시정지 상태가 아님
    #[error("feed is not paused")]
    NotPaused,

    /// 이미 일시정지됨
    #[error("feed is already paused")]
    AlreadyPaused,

    /// 재개할 데이터가 없음
    #[error("no data to resume from")]
    NothingToResume,

    /// 빈 검색어
    #[error("please enter a search term")]
    EmptyQuery,

    /// 내보낼 데이터가 없음
    #[error("no data to export")]
    NoDataToExport,

    /// 이미 실행 중
    #[error("feed '{0}' is already running")]
    RunInProgress(String),

    /// 등록되지 않은 피드 이름
    #[error("unknown feed source: {0}")]
    UnknownSource(String),

    /// 이미 등록된 피드 이름
    #[error("feed source already exists: {0}")]
    DuplicateSource(String),

    /// 피드 정의가 유효하지 않음
    #[error("invalid feed source '{name}': {reason}")]
    InvalidSource { name: String, reason: String },
}

/// 내보내기 에러
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    /// 대상 파일 쓰기 실패
    #[error("failed to write {path}: {reason}")]
    WriteFailed { path: String, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fetch_error_display_includes_endpoint() {
        let err = FetchError::Timeout {
            endpoint: "https://feeds.example/csv".to_owned(),
            timeout_secs: 10,
        };
        let msg = err.to_string();
        assert!(msg.contains("feeds.example"));
        assert!(msg.contains("10s"));
    }

    #[test]
    fn parse_error_converts_to_top_level() {
        let err: IronfeedError = ParseError::UnexpectedShape("number".to_owned()).into();
        assert!(matches!(err, IronfeedError::Parse(_)));
    }

    #[test]
    fn operator_error_is_user_facing() {
        let err: IronfeedError = OperatorError::NoDataToExport.into();
        assert_eq!(err.to_string(), "no data to export");
    }

    #[test]
    fn record_error_display() {
        let err = RecordError::InsufficientFields {
            expected: 9,
            found: 3,
        };
        assert!(err.to_string().contains("found 3"));
    }
}
