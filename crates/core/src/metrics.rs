//! 메트릭 상수 및 설명 등록
//!
//! 수집 엔진이 기록하는 메트릭의 이름과 설명을 중앙에서 정의합니다.
//! 엔진은 이 상수로 `metrics::counter!()`를 호출합니다.
//! recorder를 설치하지 않으면 모든 기록은 no-op입니다.
//!
//! # 네이밍 컨벤션
//!
//! - 접두어: `ironfeed_feed_`
//! - 접미어: `_total` (counter), `_seconds` (histogram)

// ─── 레이블 키 상수 ────────────────────────────────────────────────

/// 피드 이름 레이블 키
pub const LABEL_FEED: &str = "feed";

/// 페이로드 형식 레이블 키 (csv, json)
pub const LABEL_FORMAT: &str = "format";

/// 다운로드 결과 레이블 키 (success, failure, cached)
pub const LABEL_RESULT: &str = "result";

/// 실행 종료 결과 레이블 키 (finished, stopped, error)
pub const LABEL_OUTCOME: &str = "outcome";

// ─── Feed Engine 메트릭 ────────────────────────────────────────────

/// 처리된 유효 레코드 수 (counter, label: feed)
pub const FEED_RECORDS_PROCESSED_TOTAL: &str = "ironfeed_feed_records_processed_total";

/// 건너뛴 레코드 수 (counter, label: feed)
pub const FEED_RECORDS_SKIPPED_TOTAL: &str = "ironfeed_feed_records_skipped_total";

/// 다운로드 시도 수 (counter, label: result)
pub const FEED_FETCH_TOTAL: &str = "ironfeed_feed_fetch_total";

/// 페이로드 파싱 실패 수 (counter, label: format)
pub const FEED_PARSE_ERRORS_TOTAL: &str = "ironfeed_feed_parse_errors_total";

/// 종료된 실행 수 (counter, label: outcome)
pub const FEED_RUNS_TOTAL: &str = "ironfeed_feed_runs_total";

/// 다운로드 소요 시간 (histogram, 초)
pub const FEED_FETCH_DURATION_SECONDS: &str = "ironfeed_feed_fetch_duration_seconds";

/// 모든 메트릭의 설명을 등록합니다.
///
/// recorder 설치 직후 한 번 호출합니다.
pub fn describe_all() {
    use metrics::{describe_counter, describe_histogram};

    describe_counter!(
        FEED_RECORDS_PROCESSED_TOTAL,
        "Total number of valid feed records rendered and aggregated"
    );
    describe_counter!(
        FEED_RECORDS_SKIPPED_TOTAL,
        "Total number of structurally invalid feed records skipped"
    );
    describe_counter!(
        FEED_FETCH_TOTAL,
        "Feed download attempts by result (success, failure, cached)"
    );
    describe_counter!(
        FEED_PARSE_ERRORS_TOTAL,
        "Feed payloads that failed to parse, by format"
    );
    describe_counter!(
        FEED_RUNS_TOTAL,
        "Ingestion runs that reached a terminal state, by outcome"
    );
    describe_histogram!(
        FEED_FETCH_DURATION_SECONDS,
        "Feed download latency in seconds"
    );
}
