//! 집계 및 검색 -- 수집된 레코드의 빈도 테이블과 부분 문자열 검색
//!
//! [`Aggregator`]는 세 개의 빈도 테이블(origin-authority, 리포터, 태그)을 유지합니다.
//! 유효 레코드마다 [`Aggregator::record_valid`]가 한 번 호출되며,
//! 건너뛴 레코드는 테이블에 반영되지 않습니다.
//!
//! [`FrequencyTable::top_n`]의 동률은 처음 등장한 순서로 정렬됩니다.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use ironfeed_core::error::OperatorError;
use ironfeed_core::types::{Record, ThreatFields, UNKNOWN_KEY};

/// 삽입 순서를 기억하는 빈도 테이블
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrequencyTable {
    /// (키, 횟수) -- 처음 등장한 순서
    entries: Vec<(String, u64)>,
    /// 키 → `entries` 위치
    index: HashMap<String, usize>,
}

impl FrequencyTable {
    /// 빈 테이블을 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 키의 횟수를 1 증가시킵니다.
    pub fn increment(&mut self, key: &str) {
        match self.index.get(key) {
            Some(&pos) => self.entries[pos].1 += 1,
            None => {
                self.index.insert(key.to_owned(), self.entries.len());
                self.entries.push((key.to_owned(), 1));
            }
        }
    }

    /// 키의 현재 횟수
    pub fn count(&self, key: &str) -> u64 {
        self.index
            .get(key)
            .map(|&pos| self.entries[pos].1)
            .unwrap_or(0)
    }

    /// 서로 다른 키의 수
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// 비어 있는지 여부
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 모든 키의 횟수 합
    pub fn total(&self) -> u64 {
        self.entries.iter().map(|(_, c)| c).sum()
    }

    /// 횟수가 많은 순으로 최대 `n`개를 반환합니다.
    ///
    /// 동률은 처음 등장한 순서를 유지합니다 (안정 정렬).
    pub fn top_n(&self, n: usize) -> Vec<(String, u64)> {
        let mut sorted: Vec<&(String, u64)> = self.entries.iter().collect();
        sorted.sort_by(|a, b| b.1.cmp(&a.1));
        sorted.into_iter().take(n).cloned().collect()
    }

    /// 모든 항목을 초기화합니다.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.index.clear();
    }
}

/// 집계 차원
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dimension {
    /// URL의 scheme+host
    Authority,
    /// 리포터
    Reporter,
    /// 태그
    Tag,
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Authority => write!(f, "Top URLs"),
            Self::Reporter => write!(f, "Top Reporters"),
            Self::Tag => write!(f, "Top Tags"),
        }
    }
}

/// 상위 N개 집계 결과
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsReport {
    /// 상위 origin-authority
    pub authorities: Vec<(String, u64)>,
    /// 상위 리포터
    pub reporters: Vec<(String, u64)>,
    /// 상위 태그
    pub tags: Vec<(String, u64)>,
}

impl MetricsReport {
    /// 차원별 항목
    pub fn entries(&self, dimension: Dimension) -> &[(String, u64)] {
        match dimension {
            Dimension::Authority => &self.authorities,
            Dimension::Reporter => &self.reporters,
            Dimension::Tag => &self.tags,
        }
    }
}

/// 빈도 집계기
#[derive(Debug, Clone, Default)]
pub struct Aggregator {
    authorities: FrequencyTable,
    reporters: FrequencyTable,
    tags: FrequencyTable,
}

impl Aggregator {
    /// 빈 집계기를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 유효 레코드를 세 테이블에 반영합니다.
    ///
    /// CSV 행은 항상 authority와 리포터를 한 번씩 증가시킵니다.
    /// JSON 레코드는 해당 키가 있을 때만 증가시킵니다.
    pub fn record_valid(&mut self, record: &Record) {
        if let Some(authority) = record.authority() {
            if authority == UNKNOWN_KEY {
                debug!(url = ?record.url(), "url has no parseable authority");
            }
            self.authorities.increment(&authority);
        }

        if let Some(reporter) = record.reporter() {
            let reporter = reporter.trim();
            if reporter.is_empty() {
                self.reporters.increment(UNKNOWN_KEY);
            } else {
                self.reporters.increment(reporter);
            }
        }

        for tag in record.tags() {
            self.tags.increment(&tag);
        }
    }

    /// 차원별 테이블
    pub fn table(&self, dimension: Dimension) -> &FrequencyTable {
        match dimension {
            Dimension::Authority => &self.authorities,
            Dimension::Reporter => &self.reporters,
            Dimension::Tag => &self.tags,
        }
    }

    /// 차원별 상위 `n`개
    pub fn top_n(&self, dimension: Dimension, n: usize) -> Vec<(String, u64)> {
        self.table(dimension).top_n(n)
    }

    /// 세 차원의 상위 `n`개
    pub fn report(&self, n: usize) -> MetricsReport {
        MetricsReport {
            authorities: self.authorities.top_n(n),
            reporters: self.reporters.top_n(n),
            tags: self.tags.top_n(n),
        }
    }

    /// 모든 테이블을 초기화합니다.
    pub fn reset(&mut self) {
        self.authorities.clear();
        self.reporters.clear();
        self.tags.clear();
    }
}

/// 검색 결과
#[derive(Debug, Clone, PartialEq)]
pub enum SearchOutcome {
    /// 일치한 레코드 (수집 순서)
    Matches(Vec<Record>),
    /// 일치 항목 없음
    NoMatches,
}

impl SearchOutcome {
    /// 일치한 레코드 수
    pub fn len(&self) -> usize {
        match self {
            Self::Matches(records) => records.len(),
            Self::NoMatches => 0,
        }
    }

    /// 일치 항목이 없는지 여부
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::NoMatches)
    }
}

/// 수집된 레코드에서 `query`를 대소문자 구분 없이 검색합니다.
///
/// 공백뿐인 검색어는 [`OperatorError::EmptyQuery`]입니다.
/// 그 외에는 앞뒤 공백까지 포함한 부분 문자열로 비교합니다.
pub fn search(records: &[Record], query: &str) -> Result<SearchOutcome, OperatorError> {
    if query.trim().is_empty() {
        return Err(OperatorError::EmptyQuery);
    }
    let needle = query.to_lowercase();

    let matches: Vec<Record> = records
        .iter()
        .filter(|r| r.matches_lowercase(&needle))
        .cloned()
        .collect();

    if matches.is_empty() {
        Ok(SearchOutcome::NoMatches)
    } else {
        Ok(SearchOutcome::Matches(matches))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ironfeed_core::types::{CsvRow, JsonRecord};

    fn csv_record(url: &str, tags: &str, reporter: &str) -> Record {
        Record::Csv(CsvRow::new(
            [
                "1",
                "2024-05-01",
                url,
                "online",
                "",
                "malware_download",
                tags,
                "",
                reporter,
            ]
            .iter()
            .map(|s| (*s).to_owned())
            .collect(),
        ))
    }

    #[test]
    fn top_n_breaks_ties_by_first_seen() {
        let mut table = FrequencyTable::new();
        for key in ["A", "B", "C", "A", "B", "A", "B"] {
            table.increment(key);
        }
        assert_eq!(
            table.top_n(2),
            vec![("A".to_owned(), 3), ("B".to_owned(), 3)]
        );
    }

    #[test]
    fn top_n_orders_by_count() {
        let mut table = FrequencyTable::new();
        for key in ["x", "y", "y", "z", "z", "z"] {
            table.increment(key);
        }
        let top = table.top_n(5);
        assert_eq!(top[0], ("z".to_owned(), 3));
        assert_eq!(top[1], ("y".to_owned(), 2));
        assert_eq!(top[2], ("x".to_owned(), 1));
        assert_eq!(table.total(), 6);
    }

    #[test]
    fn csv_record_updates_all_tables_once() {
        let mut agg = Aggregator::new();
        agg.record_valid(&csv_record("http://a.example/x", "elf,mozi", "r1"));
        agg.record_valid(&csv_record("http://a.example/y", "elf", "r2"));

        assert_eq!(agg.table(Dimension::Authority).count("http://a.example"), 2);
        assert_eq!(agg.table(Dimension::Reporter).count("r1"), 1);
        assert_eq!(agg.table(Dimension::Tag).count("elf"), 2);
        assert_eq!(agg.table(Dimension::Tag).count("mozi"), 1);
    }

    #[test]
    fn unparseable_url_counts_as_unknown() {
        let mut agg = Aggregator::new();
        agg.record_valid(&csv_record("::garbage::", "", ""));
        assert_eq!(agg.table(Dimension::Authority).count(UNKNOWN_KEY), 1);
        assert_eq!(agg.table(Dimension::Reporter).count(UNKNOWN_KEY), 1);
        assert!(agg.table(Dimension::Tag).is_empty());
    }

    #[test]
    fn json_record_updates_only_present_fields() {
        let mut agg = Aggregator::new();
        agg.record_valid(&Record::Json(JsonRecord::new(
            serde_json::json!({"tags": "phish, kit"}),
        )));
        assert!(agg.table(Dimension::Authority).is_empty());
        assert!(agg.table(Dimension::Reporter).is_empty());
        assert_eq!(agg.table(Dimension::Tag).len(), 2);
    }

    #[test]
    fn report_and_reset() {
        let mut agg = Aggregator::new();
        agg.record_valid(&csv_record("https://b.example/", "t", "r"));
        let report = agg.report(5);
        assert_eq!(report.entries(Dimension::Authority).len(), 1);
        agg.reset();
        assert!(agg.report(5).tags.is_empty());
    }

    #[test]
    fn search_finds_url_case_insensitively() {
        let records = vec![
            csv_record("http://example.com/x", "", "r"),
            csv_record("http://other.example/", "", "r"),
        ];
        match search(&records, "EXAMPLE.COM").unwrap() {
            SearchOutcome::Matches(found) => {
                assert_eq!(found.len(), 1);
                assert_eq!(found[0], records[0]);
            }
            SearchOutcome::NoMatches => panic!("expected a match"),
        }
    }

    #[test]
    fn search_reports_no_matches_explicitly() {
        let records = vec![csv_record("http://example.com/x", "", "r")];
        assert_eq!(
            search(&records, "zzz-no-match").unwrap(),
            SearchOutcome::NoMatches
        );
        assert_eq!(search(&[], "anything").unwrap(), SearchOutcome::NoMatches);
    }

    #[test]
    fn search_keeps_surrounding_whitespace() {
        let records = vec![
            csv_record("http://a.example/x", "elf", "alice"),
            Record::Json(JsonRecord::new(serde_json::json!({
                "url": "http://b.example/y",
                "threat": "botnet cc",
            }))),
        ];

        let SearchOutcome::Matches(found) = search(&records, " cc").unwrap() else {
            panic!("expected a match");
        };
        assert_eq!(found, vec![records[1].clone()]);

        // "elf" only appears without a leading space
        assert_eq!(search(&records, " elf").unwrap(), SearchOutcome::NoMatches);
        assert!(matches!(search(&records, "elf").unwrap(), SearchOutcome::Matches(_)));
    }

    #[test]
    fn search_rejects_blank_query() {
        assert_eq!(search(&[], "   "), Err(OperatorError::EmptyQuery));
    }

    #[test]
    fn search_preserves_accumulation_order() {
        let records = vec![
            csv_record("http://x.example/1", "", "r"),
            csv_record("http://y.example/2", "", "r"),
            csv_record("http://x.example/3", "", "r"),
        ];
        let SearchOutcome::Matches(found) = search(&records, "x.example").unwrap() else {
            panic!("expected matches");
        };
        assert_eq!(found, vec![records[0].clone(), records[2].clone()]);
    }
}
