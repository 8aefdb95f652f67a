//! Equal-width histogram over a filtered subset of durations.

use crate::config::{MAX_BIN_COUNT, MIN_BIN_COUNT};
use crate::error::{AnalysisError, Result};
use serde::{Deserialize, Serialize};

/// One bucket of a histogram.
///
/// Covers `[start, end)`, except the last bucket which also includes `end`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistogramBin {
    pub start: f64,
    pub end: f64,
    pub count: usize,
}

/// Histogram of a set of values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Histogram {
    /// No values to bin; rendered as "no data in range".
    Empty { bin_count: usize },
    /// `bin_count` equal-width buckets spanning the values' range.
    Binned { bins: Vec<HistogramBin> },
}

impl Histogram {
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty { .. })
    }

    pub fn bin_count(&self) -> usize {
        match self {
            Self::Empty { bin_count } => *bin_count,
            Self::Binned { bins } => bins.len(),
        }
    }

    pub fn bins(&self) -> &[HistogramBin] {
        match self {
            Self::Empty { .. } => &[],
            Self::Binned { bins } => bins,
        }
    }

    /// Bucket boundaries as `(lower, upper)` pairs.
    pub fn edges(&self) -> Vec<(f64, f64)> {
        self.bins().iter().map(|b| (b.start, b.end)).collect()
    }

    pub fn counts(&self) -> Vec<usize> {
        self.bins().iter().map(|b| b.count).collect()
    }

    /// Sum of all bucket counts.
    pub fn total(&self) -> usize {
        self.bins().iter().map(|b| b.count).sum()
    }

    /// Largest bucket count, for scaling a rendering.
    pub fn max_count(&self) -> usize {
        self.bins().iter().map(|b| b.count).max().unwrap_or(0)
    }

    /// The buckets, or [`AnalysisError::EmptyData`] for the empty state.
    pub fn ensure_data(&self) -> Result<&[HistogramBin]> {
        match self {
            Self::Empty { .. } => Err(AnalysisError::EmptyData),
            Self::Binned { bins } => Ok(bins),
        }
    }
}

/// Validate a bin count against the accepted range.
pub fn validate_bin_count(bin_count: usize) -> Result<()> {
    if (MIN_BIN_COUNT..=MAX_BIN_COUNT).contains(&bin_count) {
        Ok(())
    } else {
        Err(AnalysisError::InvalidBinCount {
            count: bin_count,
            min: MIN_BIN_COUNT,
            max: MAX_BIN_COUNT,
        })
    }
}

/// Bin `values` into `bin_count` equal-width buckets.
///
/// Edges span exactly `[min, max]` of the given values. When every value is
/// equal the range is widened to `[v - 0.5, v + 0.5]`. Counts always sum to
/// `values.len()`.
pub fn build_histogram(values: &[f64], bin_count: usize) -> Result<Histogram> {
    validate_bin_count(bin_count)?;

    let Some((min, max)) = value_range(values) else {
        return Ok(Histogram::Empty { bin_count });
    };

    let (lo, hi) = if max > min {
        (min, max)
    } else {
        (min - 0.5, max + 0.5)
    };
    let width = (hi - lo) / bin_count as f64;

    let mut counts = vec![0usize; bin_count];
    for value in values {
        let index = ((value - lo) / width) as usize;
        counts[index.min(bin_count - 1)] += 1;
    }

    let bins = counts
        .into_iter()
        .enumerate()
        .map(|(idx, count)| HistogramBin {
            start: lo + idx as f64 * width,
            end: if idx + 1 == bin_count {
                hi
            } else {
                lo + (idx as f64 + 1.0) * width
            },
            count,
        })
        .collect();

    Ok(Histogram::Binned { bins })
}

fn value_range(values: &[f64]) -> Option<(f64, f64)> {
    values.iter().fold(None, |acc, &v| {
        Some(match acc {
            Some((lo, hi)) => (f64::min(lo, v), f64::max(hi, v)),
            None => (v, v),
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    #[test]
    fn test_equal_width_bins() {
        let histogram = build_histogram(&[0.0, 1.0, 2.0, 3.0, 4.0, 10.0], 5).unwrap();
        assert_eq!(
            histogram.edges(),
            vec![
                (0.0, 2.0),
                (2.0, 4.0),
                (4.0, 6.0),
                (6.0, 8.0),
                (8.0, 10.0)
            ]
        );
        assert_eq!(histogram.counts(), vec![2, 2, 1, 0, 1]);
    }

    #[test]
    fn test_max_value_lands_in_last_bin() {
        let histogram = build_histogram(&[1.0, 6.0], 5).unwrap();
        assert_eq!(histogram.counts(), vec![1, 0, 0, 0, 1]);
        assert_eq!(histogram.bins().last().unwrap().end, 6.0);
    }

    #[test]
    fn test_single_distinct_value_widens_range() {
        let histogram = build_histogram(&[2.0], 5).unwrap();
        assert_eq!(histogram.bin_count(), 5);
        assert_eq!(histogram.total(), 1);
        let edges = histogram.edges();
        assert_eq!(edges.first().unwrap().0, 1.5);
        assert_eq!(edges.last().unwrap().1, 2.5);
        assert_eq!(histogram.counts(), vec![0, 0, 1, 0, 0]);
    }

    #[test]
    fn test_empty_values_give_sentinel() {
        let histogram = build_histogram(&[], 20).unwrap();
        assert_eq!(histogram, Histogram::Empty { bin_count: 20 });
        assert!(histogram.is_empty());
        assert!(histogram.edges().is_empty());
        assert!(histogram.ensure_data().unwrap_err().is_empty_data());
    }

    #[test]
    fn test_bin_count_limits() {
        assert!(build_histogram(&[1.0], 4).is_err());
        assert!(build_histogram(&[1.0], 101).is_err());
        assert!(build_histogram(&[1.0], 5).is_ok());
        assert!(build_histogram(&[1.0], 100).is_ok());
    }

    #[test]
    fn test_counts_sum_to_len_for_every_bin_count() {
        let mut rng = StdRng::seed_from_u64(7);
        let values: Vec<f64> = (0..500).map(|_| rng.gen_range(0.0..120.0)).collect();
        for bins in MIN_BIN_COUNT..=MAX_BIN_COUNT {
            let histogram = build_histogram(&values, bins).unwrap();
            assert_eq!(histogram.total(), values.len(), "bins = {bins}");
            assert_eq!(histogram.bin_count(), bins);
        }
    }
}
