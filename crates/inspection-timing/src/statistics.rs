//! Summary statistics over a filtered subset, computed on demand.

use crate::error::{AnalysisError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Mean and median of a non-empty set of durations, in seconds.
///
/// Values are kept at full precision; `Display` renders the two-decimal
/// text shown next to the histogram.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StatisticsReport {
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    pub min: f64,
    pub max: f64,
}

/// Compute mean and median.
///
/// # Errors
///
/// [`AnalysisError::EmptyData`] when `values` is empty.
pub fn report(values: &[f64]) -> Result<StatisticsReport> {
    if values.is_empty() {
        return Err(AnalysisError::EmptyData);
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let count = sorted.len();
    let mean = sorted.iter().sum::<f64>() / count as f64;
    let mid = count / 2;
    let median = if count % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    };

    Ok(StatisticsReport {
        count,
        mean,
        median,
        min: sorted[0],
        max: sorted[count - 1],
    })
}

impl StatisticsReport {
    /// Text lines for an annotation box.
    pub fn lines(&self) -> [String; 2] {
        [
            format!("Mean: {:.2} sec", self.mean),
            format!("Median: {:.2} sec", self.median),
        ]
    }
}

impl fmt::Display for StatisticsReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [mean, median] = self.lines();
        write!(f, "{mean}\n{median}")
    }
}
