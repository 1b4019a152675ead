//! 내보내기 -- 수집된 레코드를 CSV 파일로 직렬화
//!
//! - CSV 피드: 원본 헤더 행(없으면 표준 필드명) + 데이터 행
//! - JSON 피드: 모든 레코드 키의 합집합(처음 등장한 순서)을 헤더로 사용하고,
//!   중첩 값은 compact JSON 텍스트로 기록

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::debug;

use ironfeed_core::error::{ExportError, OperatorError};
use ironfeed_core::types::{RECORD_FIELDS, Record, json_text};

use crate::error::FeedEngineError;

/// 내보내기 결과
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportSummary {
    /// 대상 파일
    pub path: PathBuf,
    /// 기록된 데이터 행 수 (헤더 제외)
    pub rows: usize,
    /// 헤더 컬럼
    pub columns: Vec<String>,
}

/// 레코드를 CSV 파일로 기록합니다.
///
/// `records`가 비어 있으면 파일을 만들지 않고 [`OperatorError::NoDataToExport`]를 반환합니다.
pub fn write_csv(
    path: &Path,
    header: Option<&[String]>,
    records: &[Record],
) -> Result<ExportSummary, FeedEngineError> {
    if records.is_empty() {
        return Err(OperatorError::NoDataToExport.into());
    }

    let (columns, rows) = tabulate(header, records);

    let mut writer = ::csv::WriterBuilder::new()
        .flexible(true)
        .from_path(path)
        .map_err(|e| write_failed(path, e))?;
    writer
        .write_record(&columns)
        .map_err(|e| write_failed(path, e))?;
    for row in &rows {
        writer.write_record(row).map_err(|e| write_failed(path, e))?;
    }
    writer.flush().map_err(|e| write_failed(path, e))?;

    debug!(path = %path.display(), rows = rows.len(), "csv written");
    Ok(ExportSummary {
        path: path.to_path_buf(),
        rows: rows.len(),
        columns,
    })
}

/// 헤더와 데이터 행으로 펼칩니다.
pub fn tabulate(header: Option<&[String]>, records: &[Record]) -> (Vec<String>, Vec<Vec<String>>) {
    let is_json = records.iter().any(|r| matches!(r, Record::Json(_)));
    if !is_json {
        let columns = header
            .map(<[String]>::to_vec)
            .unwrap_or_else(|| RECORD_FIELDS.iter().map(|f| (*f).to_owned()).collect());
        let rows = records
            .iter()
            .filter_map(|r| match r {
                Record::Csv(row) => Some(row.fields().to_vec()),
                Record::Json(_) => None,
            })
            .collect();
        return (columns, rows);
    }

    let mut columns: Vec<String> = Vec::new();
    for record in records {
        if let Record::Json(rec) = record {
            for key in rec.keys() {
                if !columns.iter().any(|c| c == key) {
                    columns.push(key.to_owned());
                }
            }
        }
    }

    let rows = records
        .iter()
        .filter_map(|r| match r {
            Record::Json(rec) => Some(
                columns
                    .iter()
                    .map(|c| rec.get(c).map(json_text).unwrap_or_default())
                    .collect(),
            ),
            Record::Csv(_) => None,
        })
        .collect();
    (columns, rows)
}

fn write_failed(path: &Path, err: impl std::fmt::Display) -> ExportError {
    ExportError::WriteFailed {
        path: path.display().to_string(),
        reason: err.to_string(),
    }
}
