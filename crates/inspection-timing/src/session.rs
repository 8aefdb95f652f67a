//! Analysis session state.
//!
//! An [`AnalysisSession`] holds one source table and everything derived from
//! it. States and transitions:
//!
//! ```text
//!            load (ok)                 set_range / set_bin_count
//!   Empty ─────────────▶ Loaded ─────────────────────────────▶ Filtered ─┐
//!     ▲                    │                                     ▲       │
//!     │     load (ok)      │                                     └───────┘
//!     └────────────────────┴── (new table: Empty, then Loaded)
//! ```
//!
//! A failed load leaves the current table, range and bin count untouched.
//! The ordered table is computed once per load; histograms are memoized per
//! `(range, bin count)`.

use crate::config::AnalysisConfig;
use crate::durations::{DurationTable, derive_durations};
use crate::error::{AnalysisError, Result};
use crate::filter::{self, FilteredSubset, RangeFilter};
use crate::histogram::{Histogram, build_histogram, validate_bin_count};
use crate::loader::{self, LoadSummary};
use crate::normalizer::{TimestampParser, normalize};
use crate::statistics::{self, StatisticsReport};
use crate::types::DurationBounds;
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, error, info};

/// Range used when the table has no durations at all; selects nothing.
const NO_DATA_RANGE: RangeFilter = RangeFilter { lower: 0, upper: 0 };

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// No table loaded.
    Empty,
    /// A table is loaded with its default range and bin count.
    Loaded,
    /// The operator changed the range or bin count at least once.
    Filtered,
}

/// Everything the presentation layer needs to draw one histogram.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistogramView {
    pub range: Option<RangeFilter>,
    pub bin_count: usize,
    pub histogram: Histogram,
    /// Present only when requested and the subset is non-empty.
    pub statistics: Option<StatisticsReport>,
}

struct LoadedSource {
    source: DataFrame,
    load_summary: Option<LoadSummary>,
    table: DurationTable,
    bounds: Option<DurationBounds>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct HistogramKey {
    range: RangeFilter,
    bin_count: usize,
}

/// Single-writer container for one ingested table and its derived views.
pub struct AnalysisSession {
    config: AnalysisConfig,
    parser: TimestampParser,
    state: SessionState,
    loaded: Option<LoadedSource>,
    active_range: Option<RangeFilter>,
    bin_count: usize,
    histogram_cache: Option<(HistogramKey, Histogram)>,
}

static_assertions::assert_impl_all!(AnalysisSession: Send);

impl Default for AnalysisSession {
    fn default() -> Self {
        Self::from_valid_config(AnalysisConfig::default())
    }
}

impl AnalysisSession {
    /// Create an empty session.
    ///
    /// # Errors
    ///
    /// [`AnalysisError::InvalidConfig`] when the configuration fails validation.
    pub fn new(config: AnalysisConfig) -> Result<Self> {
        config
            .validate()
            .map_err(|e| AnalysisError::InvalidConfig(e.to_string()))?;
        Ok(Self::from_valid_config(config))
    }

    fn from_valid_config(config: AnalysisConfig) -> Self {
        Self {
            parser: TimestampParser::from_config(&config),
            bin_count: config.default_bin_count,
            config,
            state: SessionState::Empty,
            loaded: None,
            active_range: None,
            histogram_cache: None,
        }
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Load a raw table, replacing any previous one on success.
    pub fn load_table(&mut self, raw: DataFrame) -> Result<&DurationTable> {
        self.install(raw, None)
    }

    /// Parse CSV bytes and load the resulting table.
    pub fn load_csv_bytes(&mut self, bytes: &[u8]) -> Result<&DurationTable> {
        let loaded = loader::read_csv_bytes(bytes)?;
        self.install(loaded.df, Some(loaded.summary))
    }

    /// Read a CSV file and load the resulting table.
    pub fn load_csv_path(&mut self, path: impl AsRef<Path>) -> Result<&DurationTable> {
        let loaded = loader::read_csv_path(path)?;
        self.install(loaded.df, Some(loaded.summary))
    }

    fn install(
        &mut self,
        source: DataFrame,
        load_summary: Option<LoadSummary>,
    ) -> Result<&DurationTable> {
        let ordered = match normalize(&source, &self.config.columns, &self.parser) {
            Ok(ordered) => ordered,
            Err(e) => {
                error!("Table rejected: {}", e);
                return Err(e);
            }
        };
        let table = derive_durations(ordered);
        let bounds = table.duration_bounds();

        self.clear();

        info!(
            "Loaded table with {} rows; duration bounds {:?}",
            table.len(),
            bounds
        );
        self.active_range = bounds.map(RangeFilter::from);
        self.bin_count = self.config.default_bin_count;
        self.state = SessionState::Loaded;
        let loaded = self.loaded.insert(LoadedSource {
            source,
            load_summary,
            table,
            bounds,
        });
        Ok(&loaded.table)
    }

    /// Drop the table and every value derived from it.
    pub fn clear(&mut self) {
        self.loaded = None;
        self.active_range = None;
        self.histogram_cache = None;
        self.bin_count = self.config.default_bin_count;
        self.state = SessionState::Empty;
    }

    fn loaded(&self) -> Result<&LoadedSource> {
        self.loaded.as_ref().ok_or(AnalysisError::NoDataLoaded)
    }

    /// The ordered table with its duration column.
    pub fn table(&self) -> Result<&DurationTable> {
        Ok(&self.loaded()?.table)
    }

    /// The raw table as it was loaded.
    pub fn source(&self) -> Option<&DataFrame> {
        self.loaded.as_ref().map(|l| &l.source)
    }

    /// Loader summary when the table came from CSV content.
    pub fn load_summary(&self) -> Option<&LoadSummary> {
        self.loaded.as_ref().and_then(|l| l.load_summary.as_ref())
    }

    /// Integer bounds of the live durations; `None` when nothing is analyzable.
    pub fn bounds(&self) -> Option<DurationBounds> {
        self.loaded.as_ref().and_then(|l| l.bounds)
    }

    pub fn active_range(&self) -> Option<RangeFilter> {
        self.active_range
    }

    pub fn bin_count(&self) -> usize {
        self.bin_count
    }

    /// Change the bin count; the selected rows are unaffected.
    pub fn set_bin_count(&mut self, bin_count: usize) -> Result<()> {
        self.loaded()?;
        validate_bin_count(bin_count)?;
        self.bin_count = bin_count;
        self.state = SessionState::Filtered;
        Ok(())
    }

    /// Change the inclusive duration range.
    pub fn set_range(&mut self, lower: i64, upper: i64) -> Result<()> {
        self.loaded()?;
        self.active_range = Some(RangeFilter::new(lower, upper)?);
        self.state = SessionState::Filtered;
        Ok(())
    }

    /// Return to the full live-data range.
    pub fn reset_range(&mut self) -> Result<()> {
        let bounds = self.loaded()?.bounds;
        self.active_range = bounds.map(RangeFilter::from);
        self.state = SessionState::Filtered;
        Ok(())
    }

    fn effective_range(&self) -> Result<RangeFilter> {
        self.loaded()?;
        Ok(self.active_range.unwrap_or(NO_DATA_RANGE))
    }

    /// Rows inside the active range.
    pub fn filtered(&self) -> Result<FilteredSubset> {
        let range = self.effective_range()?;
        Ok(filter::apply_range(self.table()?, range))
    }

    /// Histogram of the filtered subset, memoized per range and bin count.
    pub fn histogram(&mut self) -> Result<&Histogram> {
        let key = HistogramKey {
            range: self.effective_range()?,
            bin_count: self.bin_count,
        };

        let entry = match self.histogram_cache.take_if(|(cached, _)| *cached == key) {
            Some(entry) => entry,
            None => {
                let subset = self.filtered()?;
                let histogram = build_histogram(subset.values(), key.bin_count)?;
                debug!(
                    "Built histogram: {} values, {} bins, range {:?}",
                    subset.len(),
                    key.bin_count,
                    key.range
                );
                (key, histogram)
            }
        };
        Ok(&self.histogram_cache.insert(entry).1)
    }

    /// Mean and median of the filtered subset.
    ///
    /// # Errors
    ///
    /// [`AnalysisError::EmptyData`] when no duration falls in the range.
    pub fn statistics(&self) -> Result<StatisticsReport> {
        statistics::report(self.filtered()?.values())
    }

    /// Histogram plus, if requested, statistics.
    ///
    /// An empty subset yields the empty histogram and no statistics rather
    /// than an error.
    pub fn view(&mut self, with_statistics: bool) -> Result<HistogramView> {
        let histogram = self.histogram()?.clone();
        let statistics = if with_statistics {
            match self.statistics() {
                Ok(stats) => Some(stats),
                Err(e) if e.is_empty_data() => None,
                Err(e) => return Err(e),
            }
        } else {
            None
        };

        Ok(HistogramView {
            range: self.active_range,
            bin_count: self.bin_count,
            histogram,
            statistics,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_BIN_COUNT;

    const SCENARIO: &[u8] = b"timestamp,identifier,outcome\n\
        2024-01-01 10:00:00,A,OK\n\
        2024-01-01 10:00:05,B,NG\n\
        2024-01-01 10:00:02,C,OK\n";

    const OTHER: &[u8] = b"timestamp,identifier,outcome\n\
        2024-02-01 08:00:00,X,OK\n\
        2024-02-01 08:01:40,Y,OK\n";

    #[test]
    fn test_starts_empty() {
        let mut session = AnalysisSession::default();
        assert_eq!(session.state(), SessionState::Empty);
        assert!(matches!(session.table(), Err(AnalysisError::NoDataLoaded)));
        assert!(session.histogram().is_err());
        assert!(session.set_range(0, 1).is_err());
    }

    #[test]
    fn test_load_sets_default_range_and_bins() {
        let mut session = AnalysisSession::default();
        session.load_csv_bytes(SCENARIO).unwrap();
        assert_eq!(session.state(), SessionState::Loaded);
        assert_eq!(session.active_range(), Some(RangeFilter { lower: 2, upper: 3 }));
        assert_eq!(session.bin_count(), DEFAULT_BIN_COUNT);
        assert_eq!(session.filtered().unwrap().values(), &[2.0, 3.0]);
    }

    #[test]
    fn test_parameter_changes_move_to_filtered() {
        let mut session = AnalysisSession::default();
        session.load_csv_bytes(SCENARIO).unwrap();
        session.set_range(2, 2).unwrap();
        assert_eq!(session.state(), SessionState::Filtered);
        session.set_bin_count(10).unwrap();
        assert_eq!(session.state(), SessionState::Filtered);

        let stats = session.statistics().unwrap();
        assert_eq!((stats.mean, stats.median), (2.0, 2.0));
        assert_eq!(session.histogram().unwrap().total(), 1);
    }

    #[test]
    fn test_invalid_parameters_leave_state_unchanged() {
        let mut session = AnalysisSession::default();
        session.load_csv_bytes(SCENARIO).unwrap();
        assert!(session.set_bin_count(3).is_err());
        assert!(session.set_range(4, 1).is_err());
        assert_eq!(session.state(), SessionState::Loaded);
        assert_eq!(session.bin_count(), DEFAULT_BIN_COUNT);
    }

    #[test]
    fn test_histogram_is_memoized_per_parameters() {
        let mut session = AnalysisSession::default();
        session.load_csv_bytes(SCENARIO).unwrap();
        session.histogram().unwrap();
        let first_key = session.histogram_cache.as_ref().map(|(k, _)| *k);

        session.histogram().unwrap();
        assert_eq!(session.histogram_cache.as_ref().map(|(k, _)| *k), first_key);

        session.set_bin_count(5).unwrap();
        assert_eq!(session.histogram().unwrap().bin_count(), 5);
        assert_ne!(session.histogram_cache.as_ref().map(|(k, _)| *k), first_key);
    }

    #[test]
    fn test_cached_histogram_is_served_until_parameters_change() {
        let mut session = AnalysisSession::default();
        session.load_csv_bytes(SCENARIO).unwrap();
        let first = session.histogram().unwrap().clone();
        assert_eq!(session.histogram().unwrap(), &first);

        session.set_range(3, 3).unwrap();
        assert_eq!(session.histogram().unwrap().total(), 1);
        assert_eq!(
            session.histogram_cache.as_ref().map(|(k, _)| k.range),
            Some(RangeFilter { lower: 3, upper: 3 })
        );

        session.set_range(2, 3).unwrap();
        assert_eq!(session.histogram().unwrap(), &first);
    }

    #[test]
    fn test_new_table_invalidates_derived_state() {
        let mut session = AnalysisSession::default();
        session.load_csv_bytes(SCENARIO).unwrap();
        session.set_range(2, 2).unwrap();
        session.set_bin_count(7).unwrap();
        session.histogram().unwrap();

        session.load_csv_bytes(OTHER).unwrap();
        assert_eq!(session.state(), SessionState::Loaded);
        assert_eq!(session.bin_count(), DEFAULT_BIN_COUNT);
        assert_eq!(
            session.active_range(),
            Some(RangeFilter {
                lower: 100,
                upper: 100
            })
        );
        assert_eq!(session.table().unwrap().unique_identifiers(), vec!["X", "Y"]);
        assert_eq!(session.histogram().unwrap().total(), 1);
    }

    #[test]
    fn test_rejected_table_keeps_previous_data() {
        let mut session = AnalysisSession::default();
        session.load_csv_bytes(SCENARIO).unwrap();
        session.set_range(2, 2).unwrap();

        let err = session
            .load_csv_bytes(b"timestamp,identifier\n2024-01-01 10:00:00,A\n")
            .unwrap_err();
        assert!(err.is_ingestion_error());
        assert_eq!(session.state(), SessionState::Filtered);
        assert_eq!(session.table().unwrap().len(), 3);
        assert_eq!(session.active_range(), Some(RangeFilter { lower: 2, upper: 2 }));
    }

    #[test]
    fn test_empty_range_reports_no_data() {
        let mut session = AnalysisSession::default();
        session.load_csv_bytes(SCENARIO).unwrap();
        session.set_range(100, 200).unwrap();

        assert!(session.statistics().unwrap_err().is_empty_data());
        assert!(session.histogram().unwrap().is_empty());

        let view = session.view(true).unwrap();
        assert!(view.histogram.is_empty());
        assert!(view.statistics.is_none());
    }

    #[test]
    fn test_all_null_durations_have_no_bounds() {
        let mut session = AnalysisSession::default();
        session
            .load_csv_bytes(b"timestamp,identifier,outcome\nnot-a-time,A,OK\n2024-01-01 10:00:00,B,OK\n")
            .unwrap();
        assert_eq!(session.bounds(), None);
        assert_eq!(session.active_range(), None);
        assert!(session.histogram().unwrap().is_empty());
        assert_eq!(session.table().unwrap().warnings().len(), 1);
    }

    #[test]
    fn test_reset_range_restores_bounds() {
        let mut session = AnalysisSession::default();
        session.load_csv_bytes(SCENARIO).unwrap();
        session.set_range(3, 3).unwrap();
        session.reset_range().unwrap();
        assert_eq!(session.active_range(), Some(RangeFilter { lower: 2, upper: 3 }));
    }

    #[test]
    fn test_load_summary_reports_skipped_lines() {
        let mut session = AnalysisSession::default();
        session
            .load_csv_bytes(b"timestamp,identifier,outcome\n2024-01-01 10:00:00,A,OK,x\n2024-01-01 10:00:01,B,OK\n")
            .unwrap();
        assert_eq!(session.load_summary().unwrap().skipped_lines, vec![2]);
        assert_eq!(session.table().unwrap().len(), 1);
    }

    #[test]
    fn test_rejects_invalid_config() {
        let config = AnalysisConfig {
            default_bin_count: 1,
            ..AnalysisConfig::default()
        };
        assert!(matches!(
            AnalysisSession::new(config),
            Err(AnalysisError::InvalidConfig(_))
        ));
    }
}
