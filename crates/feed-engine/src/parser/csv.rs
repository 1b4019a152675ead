//! CSV 피드 파서
//!
//! 위협 피드 CSV는 보통 `#` 주석 블록으로 시작합니다. 파서는 다음 순서로 동작합니다.
//!
//! 1. 앞쪽의 빈 줄과 `#`으로 시작하는 줄을 건너뜀
//! 2. 나머지를 표준 쉼표 구분 규칙(따옴표 처리 포함)으로 토큰화
//! 3. 모든 필드가 공백인 행 제거
//! 4. 첫 행은 헤더, 이후 행은 데이터 후보
//!
//! 필드 수가 부족한 행도 그대로 반환합니다. 건너뛸지 여부는 엔진이 결정합니다.

use ironfeed_core::error::ParseError;
use ironfeed_core::types::{CsvRow, FeedFormat, Record};

use super::{FeedParser, ParsedFeed};

/// 주석 표시 문자
const COMMENT_MARKER: char = '#';

/// CSV 피드 파서
#[derive(Debug, Clone, Default)]
pub struct CsvFeedParser;

impl CsvFeedParser {
    /// 새 파서를 생성합니다.
    pub fn new() -> Self {
        Self
    }
}

impl FeedParser for CsvFeedParser {
    fn format(&self) -> FeedFormat {
        FeedFormat::Csv
    }

    fn parse(&self, text: &str) -> Result<ParsedFeed, ParseError> {
        let body = skip_preamble(text);

        let mut reader = ::csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(body.as_bytes());

        let mut rows: Vec<Vec<String>> = Vec::new();
        for (line, result) in reader.records().enumerate() {
            let record = result.map_err(|e| ParseError::Malformed {
                format: "csv".to_owned(),
                reason: format!("row {}: {e}", line + 1),
            })?;
            if record.iter().all(|field| field.trim().is_empty()) {
                continue;
            }
            rows.push(record.iter().map(str::to_owned).collect());
        }

        let mut rows = rows.into_iter();
        let Some(header) = rows.next() else {
            return Err(ParseError::Empty {
                format: "csv".to_owned(),
            });
        };

        Ok(ParsedFeed {
            header: Some(header),
            records: rows.map(|fields| Record::Csv(CsvRow::new(fields))).collect(),
        })
    }
}

/// 앞쪽의 빈 줄과 주석 줄을 건너뛴 나머지 본문을 반환합니다.
fn skip_preamble(text: &str) -> &str {
    let mut offset = 0;
    for line in text.split_inclusive('\n') {
        let content = line.trim_end_matches(['\r', '\n']);
        if content.trim().is_empty() || content.starts_with(COMMENT_MARKER) {
            offset += line.len();
        } else {
            break;
        }
    }
    &text[offset..]
}

#[cfg(test)]
mod tests {
    use super::*;

    const URLHAUS_SAMPLE: &str = "\
################################################################
# abuse.ch URLhaus Database Dump (CSV - online URLs only)      #
################################################################
#
id,dateadded,url,url_status,last_online,threat,tags,urlhaus_link,reporter
\"3301234\",\"2024-05-01 10:00:00\",\"http://198.51.100.7:8080/bins/mozi.m\",\"online\",\"2024-05-01 11:00:00\",\"malware_download\",\"elf,mozi\",\"https://urlhaus.abuse.ch/url/3301234/\",\"lrz_urlhaus\"
\"3301235\",\"2024-05-01 10:05:00\",\"https://bad.example/x.exe\",\"online\",\"2024-05-01 11:00:00\",\"malware_download\",\"exe\",\"https://urlhaus.abuse.ch/url/3301235/\",\"anonymous\"
";

    fn csv_fields(record: &Record) -> &[String] {
        match record {
            Record::Csv(row) => row.fields(),
            Record::Json(_) => panic!("expected csv record"),
        }
    }

    #[test]
    fn format_is_csv() {
        assert_eq!(CsvFeedParser::new().format(), FeedFormat::Csv);
    }

    #[test]
    fn parses_urlhaus_dump() {
        let feed = CsvFeedParser::new().parse(URLHAUS_SAMPLE).unwrap();
        let header = feed.header.unwrap();
        assert_eq!(header[0], "id");
        assert_eq!(header.len(), 9);
        assert_eq!(feed.records.len(), 2);

        let first = csv_fields(&feed.records[0]);
        assert_eq!(first[0], "3301234");
        // 따옴표 안의 쉼표는 필드를 나누지 않음
        assert_eq!(first[6], "elf,mozi");
    }

    #[test]
    fn drops_blank_rows() {
        let text = "a,b,c\n1,2,3\n , ,\n\n4,5,6\n";
        let feed = CsvFeedParser::new().parse(text).unwrap();
        assert_eq!(feed.records.len(), 2);
    }

    #[test]
    fn short_rows_are_kept_for_the_engine() {
        let text = "h1,h2\nonly,two\n";
        let feed = CsvFeedParser::new().parse(text).unwrap();
        assert_eq!(feed.records.len(), 1);
        assert!(feed.records[0].validate().is_err());
    }

    #[test]
    fn header_only_yields_no_records() {
        let feed = CsvFeedParser::new().parse("# c\nid,url\n").unwrap();
        assert!(feed.records.is_empty());
    }

    #[test]
    fn comment_only_payload_is_empty() {
        let err = CsvFeedParser::new().parse("# nothing\n#\n\n").unwrap_err();
        assert!(matches!(err, ParseError::Empty { .. }));
    }

    #[test]
    fn empty_payload_is_empty() {
        let err = CsvFeedParser::new().parse("").unwrap_err();
        assert!(matches!(err, ParseError::Empty { .. }));
    }

    #[test]
    fn comment_lines_after_header_are_rows() {
        let text = "h\n# not preamble\n";
        let feed = CsvFeedParser::new().parse(text).unwrap();
        assert_eq!(feed.records.len(), 1);
    }

    #[test]
    fn crlf_line_endings() {
        let text = "# c\r\nh1,h2\r\na,b\r\n";
        let feed = CsvFeedParser::new().parse(text).unwrap();
        assert_eq!(feed.header.unwrap(), vec!["h1", "h2"]);
        assert_eq!(csv_fields(&feed.records[0]), ["a", "b"]);
    }

    #[test]
    fn skip_preamble_stops_at_first_content_line() {
        assert_eq!(skip_preamble("\n# x\n\nid,url\n# y\n"), "id,url\n# y\n");
        assert_eq!(skip_preamble("# only"), "");
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn parse_arbitrary_text_does_not_panic(text in ".{0,2000}") {
                let _ = CsvFeedParser::new().parse(&text);
            }

            #[test]
            fn data_row_count_matches_input(rows in 1usize..50) {
                let mut text = String::from("# preamble\nid,url\n");
                for i in 0..rows {
                    text.push_str(&format!("{i},http://h{i}.example/\n"));
                }
                let feed = CsvFeedParser::new().parse(&text).unwrap();
                prop_assert_eq!(feed.records.len(), rows);
            }
        }
    }
}
