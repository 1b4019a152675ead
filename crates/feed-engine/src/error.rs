//! 수집 엔진 에러 타입
//!
//! [`FeedEngineError`]는 수집 엔진 내부에서 발생하는 모든 에러를 표현합니다.
//! `From<FeedEngineError> for IronfeedError` 변환이 구현되어 있어
//! 상위 레이어에서 `?` 연산자로 자연스럽게 전파할 수 있습니다.

use ironfeed_core::error::{
    ConfigError, ExportError, FetchError, IronfeedError, OperatorError, ParseError,
};

/// 수집 엔진 도메인 에러
#[derive(Debug, thiserror::Error)]
pub enum FeedEngineError {
    /// 운영자 명령 거부
    #[error(transparent)]
    Operator(#[from] OperatorError),

    /// 피드 다운로드 실패
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// 페이로드 파싱 실패
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// 내보내기 실패
    #[error(transparent)]
    Export(#[from] ExportError),

    /// 지원하지 않는 피드 형식 (파서 미등록)
    #[error("unsupported feed format: {0}")]
    UnsupportedFormat(String),

    /// 설정 에러
    #[error("config error: {field}: {reason}")]
    Config {
        /// 설정 필드명
        field: String,
        /// 에러 사유
        reason: String,
    },

    /// HTTP 클라이언트 초기화 실패
    #[error("http client error: {0}")]
    HttpClient(String),

    /// 캐시 읽기/쓰기 실패
    #[error("cache error: {path}: {reason}")]
    Cache {
        /// 캐시 파일 경로
        path: String,
        /// 에러 사유
        reason: String,
    },

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<FeedEngineError> for IronfeedError {
    fn from(err: FeedEngineError) -> Self {
        match err {
            FeedEngineError::Operator(e) => IronfeedError::Operator(e),
            FeedEngineError::Fetch(e) => IronfeedError::Fetch(e),
            FeedEngineError::Parse(e) => IronfeedError::Parse(e),
            FeedEngineError::Export(e) => IronfeedError::Export(e),
            FeedEngineError::Io(e) => IronfeedError::Io(e),
            FeedEngineError::Config { field, reason } => {
                IronfeedError::Config(ConfigError::InvalidValue { field, reason })
            }
            FeedEngineError::Cache { path, reason } => {
                IronfeedError::Io(std::io::Error::other(format!("cache {path}: {reason}")))
            }
            FeedEngineError::UnsupportedFormat(format) => {
                IronfeedError::Config(ConfigError::InvalidValue {
                    field: "feeds.format".to_owned(),
                    reason: format!("no parser registered for '{format}'"),
                })
            }
            FeedEngineError::HttpClient(reason) => {
                IronfeedError::Config(ConfigError::InvalidValue {
                    field: "http_client".to_owned(),
                    reason,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operator_error_is_transparent() {
        let err = FeedEngineError::from(OperatorError::NotPaused);
        assert_eq!(err.to_string(), "feed is not paused");
    }

    #[test]
    fn config_error_display() {
        let err = FeedEngineError::Config {
            field: "top_n".to_owned(),
            reason: "must be greater than 0".to_owned(),
        };
        let msg = err.to_string();
        assert!(msg.contains("top_n"));
        assert!(msg.contains("greater than 0"));
    }

    #[test]
    fn converts_to_ironfeed_error_preserving_kind() {
        let err: IronfeedError = FeedEngineError::from(ParseError::Empty {
            format: "csv".to_owned(),
        })
        .into();
        assert!(matches!(err, IronfeedError::Parse(ParseError::Empty { .. })));

        let err: IronfeedError = FeedEngineError::from(OperatorError::EmptyQuery).into();
        assert!(matches!(
            err,
            IronfeedError::Operator(OperatorError::EmptyQuery)
        ));
    }

    #[test]
    fn cache_error_maps_to_io() {
        let err: IronfeedError = FeedEngineError::Cache {
            path: "/tmp/x".to_owned(),
            reason: "denied".to_owned(),
        }
        .into();
        assert!(matches!(err, IronfeedError::Io(_)));
        assert!(err.to_string().contains("/tmp/x"));
    }
}
