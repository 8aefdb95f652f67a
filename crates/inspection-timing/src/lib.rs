//! Inspection Timing Analysis Library
//!
//! Derives inter-event durations from timestamped inspection logs and
//! summarizes them as histograms and statistics, built with Rust and Polars.
//!
//! # Overview
//!
//! - **Loading**: CSV bytes or files read as text columns, malformed lines skipped
//! - **Normalization**: required-column validation, timestamp parsing, stable chronological order
//! - **Durations**: seconds elapsed since the previous record
//! - **Filtering**: inclusive integer range over the duration column
//! - **Histogram**: equal-width bins over the filtered subset
//! - **Statistics**: mean and median on demand, with an explicit empty-data error
//! - **Artifacts**: deterministic lookup of the image tied to a record
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use inspection_timing::{AnalysisConfig, AnalysisSession, ColumnMapping};
//!
//! let config = AnalysisConfig::builder()
//!     .columns(ColumnMapping::inspection_log_ja())
//!     .build()?;
//!
//! let mut session = AnalysisSession::new(config)?;
//! session.load_csv_path("inspection_log.csv")?;
//!
//! session.set_range(0, 30)?;
//! session.set_bin_count(20)?;
//!
//! let histogram = session.histogram()?;
//! println!("{} values in {} bins", histogram.total(), histogram.bin_count());
//!
//! match session.statistics() {
//!     Ok(stats) => println!("{stats}"),
//!     Err(e) if e.is_empty_data() => println!("No data in range"),
//!     Err(e) => return Err(e.into()),
//! }
//! ```
//!
//! # Pipeline Functions
//!
//! Each stage is also usable on its own:
//!
//! ```rust,ignore
//! use inspection_timing::{build_histogram, derive_durations, filter_range, normalize, report};
//!
//! let ordered = normalize(&raw_df, &ColumnMapping::default(), &TimestampParser::default())?;
//! let table = derive_durations(ordered);
//! let subset = filter_range(&table, "duration", 0, 10)?;
//! let histogram = build_histogram(subset.values(), 50)?;
//! let stats = report(subset.values())?;
//! ```

pub mod artifacts;
pub mod config;
pub mod durations;
pub mod error;
pub mod filter;
pub mod histogram;
pub mod loader;
pub mod normalizer;
pub mod reporting;
pub mod session;
pub mod statistics;
pub mod types;

// Re-exports for convenient access
pub use artifacts::{ArtifactHandle, ArtifactIndex};
pub use config::{AnalysisConfig, AnalysisConfigBuilder, ColumnMapping, ConfigValidationError};
pub use durations::{DurationTable, derive_durations};
pub use error::{AnalysisError, Result, ResultExt};
pub use filter::{FilteredSubset, RangeFilter, filter_range};
pub use histogram::{Histogram, HistogramBin, build_histogram};
pub use loader::{LoadSummary, LoadedCsv, read_csv_bytes, read_csv_path};
pub use normalizer::{OrderedTable, TimestampParser, normalize};
pub use reporting::{AnalysisReport, ReportGenerator, TableSummary};
pub use session::{AnalysisSession, HistogramView, SessionState};
pub use statistics::{StatisticsReport, report};
pub use types::{DataQualityWarning, DerivedRecord, DurationBounds, Record, Timestamp};
