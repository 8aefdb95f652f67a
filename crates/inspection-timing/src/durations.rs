//! Duration derivation over an ordered table.

use crate::config::ColumnMapping;
use crate::error::{Result, ResultExt};
use crate::normalizer::OrderedTable;
use crate::types::{DataQualityWarning, DerivedRecord, DurationBounds, Record};
use polars::prelude::*;
use std::collections::HashSet;
use tracing::{debug, warn};

/// Ordered records with the derived duration column.
///
/// Immutable once built; filters produce separate views over it.
#[derive(Debug, Clone, PartialEq)]
pub struct DurationTable {
    rows: Vec<DerivedRecord>,
    columns: ColumnMapping,
    warnings: Vec<DataQualityWarning>,
}

/// Compute the elapsed seconds between each record and its predecessor.
///
/// Row 0, and any row where either timestamp is unparsed, gets `None`.
/// Negative durations are kept as-is and reported as warnings.
pub fn derive_durations(table: OrderedTable) -> DurationTable {
    let (records, columns, mut warnings) = table.into_parts();

    let mut rows = Vec::with_capacity(records.len());
    let mut previous: Option<&Record> = None;
    for (row, record) in records.iter().enumerate() {
        let duration = previous
            .and_then(|prev| prev.timestamp.instant())
            .zip(record.timestamp.instant())
            .map(|(prev, current)| seconds_between(prev, current));

        if let Some(seconds) = duration.filter(|s| *s < 0.0) {
            warn!("Row {}: negative duration {:.3} sec", row, seconds);
            warnings.push(DataQualityWarning::NegativeDuration { row, seconds });
        }

        rows.push(DerivedRecord {
            record: record.clone(),
            duration,
        });
        previous = Some(record);
    }

    debug!(
        "Derived {} durations over {} rows",
        rows.iter().filter(|r| r.duration.is_some()).count(),
        rows.len()
    );

    DurationTable {
        rows,
        columns,
        warnings,
    }
}

fn seconds_between(previous: chrono::NaiveDateTime, current: chrono::NaiveDateTime) -> f64 {
    let delta = current - previous;
    match delta.num_microseconds() {
        Some(micros) => micros as f64 / 1_000_000.0,
        None => delta.num_milliseconds() as f64 / 1_000.0,
    }
}

impl DurationTable {
    pub fn rows(&self) -> &[DerivedRecord] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn columns(&self) -> &ColumnMapping {
        &self.columns
    }

    /// Timestamp-parse and negative-duration warnings, in detection order.
    pub fn warnings(&self) -> &[DataQualityWarning] {
        &self.warnings
    }

    /// The duration column, one entry per row.
    pub fn durations(&self) -> Vec<Option<f64>> {
        self.rows.iter().map(|r| r.duration).collect()
    }

    /// Non-null durations in table order.
    pub fn non_null_durations(&self) -> Vec<f64> {
        self.rows.iter().filter_map(|r| r.duration).collect()
    }

    /// Integer slider bounds over the non-null durations.
    ///
    /// `floor(min)` and `ceil(max)`, so filtering with these bounds keeps
    /// every non-null duration. `None` when there are no durations at all.
    pub fn duration_bounds(&self) -> Option<DurationBounds> {
        let values = self.non_null_durations();
        let (min, max) = values.iter().fold(None, |acc: Option<(f64, f64)>, &v| {
            Some(match acc {
                Some((lo, hi)) => (lo.min(v), hi.max(v)),
                None => (v, v),
            })
        })?;
        Some(DurationBounds {
            lower: min.floor() as i64,
            upper: max.ceil() as i64,
        })
    }

    /// Identifiers in order of first appearance.
    pub fn unique_identifiers(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.rows
            .iter()
            .map(|r| r.record.identifier.as_str())
            .filter(|id| seen.insert(*id))
            .collect()
    }

    /// Rows whose identifier equals `identifier` exactly.
    pub fn rows_for(&self, identifier: &str) -> Vec<&DerivedRecord> {
        self.rows
            .iter()
            .filter(|r| r.record.identifier == identifier)
            .collect()
    }

    /// Render the table for display or export.
    ///
    /// Columns in order: timestamp, identifier, duration, outcome. Parsed
    /// timestamps use the canonical text form; unparsed ones keep their text.
    pub fn to_dataframe(&self) -> Result<DataFrame> {
        let timestamps: Vec<String> = self
            .rows
            .iter()
            .map(|r| r.record.timestamp.to_string())
            .collect();
        let identifiers: Vec<&str> = self
            .rows
            .iter()
            .map(|r| r.record.identifier.as_str())
            .collect();
        let outcomes: Vec<&str> = self
            .rows
            .iter()
            .map(|r| r.record.outcome.as_str())
            .collect();

        let [timestamp, identifier, duration, outcome] = self.columns.output_order();
        let columns = vec![
            Column::new(timestamp.into(), timestamps),
            Column::new(identifier.into(), identifiers),
            Column::new(duration.into(), self.durations()),
            Column::new(outcome.into(), outcomes),
        ];
        DataFrame::new(columns).context("Building duration table")
    }
}
