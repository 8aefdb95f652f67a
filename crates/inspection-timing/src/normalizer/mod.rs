//! Record normalization.
//!
//! Turns a raw table (any column superset, arbitrary row order) into an
//! [`OrderedTable`]: the three required columns only, timestamps parsed where
//! possible, sorted chronologically with unparseable rows last.

mod timestamp;

pub use timestamp::TimestampParser;

use crate::config::ColumnMapping;
use crate::error::{AnalysisError, Result, ResultExt};
use crate::types::{DataQualityWarning, Record, Timestamp};
use polars::prelude::*;
use std::collections::HashSet;
use tracing::{info, warn};

/// Records in canonical chronological order, ready for duration derivation.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderedTable {
    records: Vec<Record>,
    columns: ColumnMapping,
    warnings: Vec<DataQualityWarning>,
}

impl OrderedTable {
    /// Assemble a table from records that are already in their final order.
    pub(crate) fn from_parts(
        records: Vec<Record>,
        columns: ColumnMapping,
        warnings: Vec<DataQualityWarning>,
    ) -> Self {
        Self {
            records,
            columns,
            warnings,
        }
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn columns(&self) -> &ColumnMapping {
        &self.columns
    }

    /// Warnings raised while parsing timestamps.
    pub fn warnings(&self) -> &[DataQualityWarning] {
        &self.warnings
    }

    pub(crate) fn into_parts(self) -> (Vec<Record>, ColumnMapping, Vec<DataQualityWarning>) {
        (self.records, self.columns, self.warnings)
    }
}

/// Normalize a raw table.
///
/// # Errors
///
/// Returns [`AnalysisError::MissingColumns`] listing every required column
/// absent from the header. No partial table is produced in that case.
pub fn normalize(
    raw: &DataFrame,
    columns: &ColumnMapping,
    parser: &TimestampParser,
) -> Result<OrderedTable> {
    let present: HashSet<&str> = raw
        .get_column_names()
        .into_iter()
        .map(|name| name.as_str())
        .collect();
    let missing: Vec<String> = columns
        .required()
        .iter()
        .filter(|name| !present.contains(*name))
        .map(|name| name.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(AnalysisError::MissingColumns { missing });
    }

    let timestamps = text_column(raw, &columns.timestamp)?;
    let identifiers = text_column(raw, &columns.identifier)?;
    let outcomes = text_column(raw, &columns.outcome)?;

    let mut warnings = Vec::new();
    let mut records: Vec<Record> = timestamps
        .into_iter()
        .zip(identifiers)
        .zip(outcomes)
        .enumerate()
        .map(|(row, ((timestamp, identifier), outcome))| {
            let timestamp = parser.parse(timestamp.as_deref().unwrap_or_default());
            if let Timestamp::Unparsed { raw } = &timestamp {
                warn!("Row {}: timestamp '{}' could not be parsed", row, raw);
                warnings.push(DataQualityWarning::TimestampParse {
                    row,
                    raw: raw.clone(),
                });
            }
            Record {
                timestamp,
                identifier: identifier.unwrap_or_default(),
                outcome: outcome.unwrap_or_default(),
                source_row: row,
            }
        })
        .collect();

    records.sort_by(|a, b| a.timestamp.chronological_cmp(&b.timestamp));

    info!(
        "Normalized {} records ({} with unparsed timestamps)",
        records.len(),
        warnings.len()
    );

    Ok(OrderedTable::from_parts(records, columns.clone(), warnings))
}

/// Read a column as optional text, whatever its dtype.
fn text_column(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>> {
    let column = df
        .column(name)
        .context(format!("Reading column '{name}'"))?
        .cast(&DataType::String)
        .context(format!("Casting column '{name}' to text"))?;
    let values = column
        .str()
        .context(format!("Reading column '{name}' as text"))?
        .into_iter()
        .map(|value| value.map(str::to_string))
        .collect();
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn raw_table() -> DataFrame {
        df! {
            "timestamp" => ["2024-01-01 10:00:00", "2024-01-01 10:00:05", "2024-01-01 10:00:02"],
            "identifier" => ["A", "B", "C"],
            "outcome" => ["OK", "NG", "OK"],
            "operator" => ["x", "y", "z"],
        }
        .unwrap()
    }

    fn identifiers(table: &OrderedTable) -> Vec<&str> {
        table
            .records()
            .iter()
            .map(|r| r.identifier.as_str())
            .collect()
    }

    #[test]
    fn test_sorts_chronologically() {
        let table = normalize(
            &raw_table(),
            &ColumnMapping::default(),
            &TimestampParser::default(),
        )
        .unwrap();
        assert_eq!(identifiers(&table), vec!["A", "C", "B"]);
        assert_eq!(
            table
                .records()
                .iter()
                .map(|r| r.source_row)
                .collect::<Vec<_>>(),
            vec![0, 2, 1]
        );
        assert!(table.warnings().is_empty());
    }

    #[test]
    fn test_missing_columns_rejected() {
        let raw = df! {
            "timestamp" => ["2024-01-01 10:00:00"],
            "identifier" => ["A"],
        }
        .unwrap();
        let err = normalize(&raw, &ColumnMapping::default(), &TimestampParser::default())
            .unwrap_err();
        match err {
            AnalysisError::MissingColumns { missing } => {
                assert_eq!(missing, vec!["outcome".to_string()])
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_reports_all_missing_columns() {
        let raw = df! { "other" => [1i64] }.unwrap();
        let err = normalize(&raw, &ColumnMapping::default(), &TimestampParser::default())
            .unwrap_err();
        assert!(matches!(
            err,
            AnalysisError::MissingColumns { ref missing } if missing.len() == 3
        ));
    }

    #[test]
    fn test_unparsed_timestamps_last_in_original_order() {
        let raw = df! {
            "timestamp" => ["bad-1", "2024-01-01 10:00:05", "bad-2", "2024-01-01 10:00:01"],
            "identifier" => ["U1", "B", "U2", "A"],
            "outcome" => ["OK", "OK", "OK", "OK"],
        }
        .unwrap();
        let table =
            normalize(&raw, &ColumnMapping::default(), &TimestampParser::default()).unwrap();
        assert_eq!(identifiers(&table), vec!["A", "B", "U1", "U2"]);
        assert_eq!(
            table.warnings(),
            &[
                DataQualityWarning::TimestampParse {
                    row: 0,
                    raw: "bad-1".to_string()
                },
                DataQualityWarning::TimestampParse {
                    row: 2,
                    raw: "bad-2".to_string()
                },
            ]
        );
        assert_eq!(table.records()[2].timestamp.raw(), "bad-1");
    }

    #[test]
    fn test_null_cells() {
        let raw = df! {
            "timestamp" => [Some("2024-01-01 10:00:00"), None],
            "identifier" => [None, Some("B")],
            "outcome" => [Some("OK"), None],
        }
        .unwrap();
        let table =
            normalize(&raw, &ColumnMapping::default(), &TimestampParser::default()).unwrap();
        assert_eq!(table.records()[0].identifier, "");
        assert_eq!(table.records()[1].outcome, "");
        assert!(!table.records()[1].timestamp.is_parsed());
        assert_eq!(table.warnings().len(), 1);
    }

    #[test]
    fn test_custom_column_names() {
        let raw = df! {
            "日時" => ["2024/01/01 10:00:09", "2024/01/01 10:00:00"],
            "ファイル名" => ["b.png", "a.png"],
            "判定結果" => ["OK", "NG"],
        }
        .unwrap();
        let table = normalize(
            &raw,
            &ColumnMapping::inspection_log_ja(),
            &TimestampParser::default(),
        )
        .unwrap();
        assert_eq!(identifiers(&table), vec!["a.png", "b.png"]);
        assert_eq!(table.columns().duration, "Time");
    }

    #[test]
    fn test_empty_table() {
        let raw = df! {
            "timestamp" => Vec::<String>::new(),
            "identifier" => Vec::<String>::new(),
            "outcome" => Vec::<String>::new(),
        }
        .unwrap();
        let table =
            normalize(&raw, &ColumnMapping::default(), &TimestampParser::default()).unwrap();
        assert!(table.is_empty());
    }
}
