//! Inclusive range filtering over the duration column.

use crate::durations::DurationTable;
use crate::error::{AnalysisError, Result};
use crate::types::DurationBounds;
use serde::{Deserialize, Serialize};

/// Inclusive integer bounds chosen by the operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RangeFilter {
    pub lower: i64,
    pub upper: i64,
}

impl RangeFilter {
    pub fn new(lower: i64, upper: i64) -> Result<Self> {
        if lower > upper {
            return Err(AnalysisError::InvalidRange { lower, upper });
        }
        Ok(Self { lower, upper })
    }

    /// Whether a raw duration lies within `[lower, upper]`.
    pub fn contains(&self, value: f64) -> bool {
        value >= self.lower as f64 && value <= self.upper as f64
    }
}

impl From<DurationBounds> for RangeFilter {
    fn from(bounds: DurationBounds) -> Self {
        Self {
            lower: bounds.lower,
            upper: bounds.upper,
        }
    }
}

/// Rows of a [`DurationTable`] whose duration fell inside a range.
///
/// A view: it holds row indices and copied values, never the records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilteredSubset {
    range: RangeFilter,
    indices: Vec<usize>,
    values: Vec<f64>,
}

impl FilteredSubset {
    pub fn range(&self) -> RangeFilter {
        self.range
    }

    /// Row indices into the source table, ascending.
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    /// Durations of the selected rows, in table order.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Select the rows whose `column` value lies in `[lower, upper]`.
///
/// Only the table's duration column is numeric; nulls are never selected.
///
/// # Errors
///
/// [`AnalysisError::ColumnNotFound`] for any other column name and
/// [`AnalysisError::InvalidRange`] when `lower > upper`.
pub fn filter_range(
    table: &DurationTable,
    column: &str,
    lower: i64,
    upper: i64,
) -> Result<FilteredSubset> {
    if column != table.columns().duration {
        return Err(AnalysisError::ColumnNotFound(column.to_string()));
    }
    let range = RangeFilter::new(lower, upper)?;
    Ok(apply_range(table, range))
}

/// Apply an already validated range to the duration column.
pub(crate) fn apply_range(table: &DurationTable, range: RangeFilter) -> FilteredSubset {
    let (indices, values): (Vec<usize>, Vec<f64>) = table
        .rows()
        .iter()
        .enumerate()
        .filter_map(|(idx, row)| row.duration.map(|d| (idx, d)))
        .filter(|(_, d)| range.contains(*d))
        .unzip();
    FilteredSubset {
        range,
        indices,
        values,
    }
}
