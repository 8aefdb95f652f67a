//! Configuration types for the inspection timing analysis.
//!
//! This module provides configuration options using the builder pattern
//! for flexible and ergonomic session setup.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Smallest bin count a histogram request may use.
pub const MIN_BIN_COUNT: usize = 5;

/// Largest bin count a histogram request may use.
pub const MAX_BIN_COUNT: usize = 100;

/// Bin count used until the operator picks another one.
pub const DEFAULT_BIN_COUNT: usize = 50;

/// Naive datetime formats tried, in order, after RFC 3339.
pub const DEFAULT_TIMESTAMP_FORMATS: [&str; 5] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y/%m/%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M",
];

/// Names of the source columns and of the derived duration column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnMapping {
    /// Column holding the event time.
    pub timestamp: String,
    /// Column naming the associated artifact (an image file name).
    pub identifier: String,
    /// Column holding the inspection outcome.
    pub outcome: String,
    /// Name given to the derived duration column.
    pub duration: String,
}

impl Default for ColumnMapping {
    fn default() -> Self {
        Self {
            timestamp: "timestamp".to_string(),
            identifier: "identifier".to_string(),
            outcome: "outcome".to_string(),
            duration: "duration".to_string(),
        }
    }
}

impl ColumnMapping {
    /// Headers written by the inspection station export (date/time, file name, result).
    pub fn inspection_log_ja() -> Self {
        Self {
            timestamp: "日時".to_string(),
            identifier: "ファイル名".to_string(),
            outcome: "判定結果".to_string(),
            duration: "Time".to_string(),
        }
    }

    /// Required source columns, in the order they are reported when missing.
    pub fn required(&self) -> [&str; 3] {
        [&self.timestamp, &self.identifier, &self.outcome]
    }

    /// Output column order: timestamp, identifier, duration, outcome.
    pub fn output_order(&self) -> [&str; 4] {
        [
            &self.timestamp,
            &self.identifier,
            &self.duration,
            &self.outcome,
        ]
    }
}

/// Configuration for an analysis session.
///
/// Use [`AnalysisConfig::builder()`] to create a new configuration
/// with fluent API.
///
/// # Example
///
/// ```rust,ignore
/// use inspection_timing::config::{AnalysisConfig, ColumnMapping};
///
/// let config = AnalysisConfig::builder()
///     .columns(ColumnMapping::inspection_log_ja())
///     .default_bin_count(30)
///     .build()?;
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Source and derived column names.
    #[serde(default)]
    pub columns: ColumnMapping,

    /// Bin count applied when a table is loaded.
    /// Default: 50
    #[serde(default = "default_bin_count")]
    pub default_bin_count: usize,

    /// chrono format strings tried after RFC 3339 when parsing timestamps.
    /// Date-only `%Y-%m-%d` and `%Y/%m/%d` are always tried last.
    #[serde(default = "default_timestamp_formats")]
    pub timestamp_formats: Vec<String>,

    /// Output directory for reports and exported tables.
    /// Default: "./outputs"
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Custom output file name (without extension).
    /// If None, the input file stem is used.
    #[serde(default)]
    pub output_name: Option<String>,
}

fn default_bin_count() -> usize {
    DEFAULT_BIN_COUNT
}

fn default_timestamp_formats() -> Vec<String> {
    DEFAULT_TIMESTAMP_FORMATS
        .iter()
        .map(|f| f.to_string())
        .collect()
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("./outputs")
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            columns: ColumnMapping::default(),
            default_bin_count: DEFAULT_BIN_COUNT,
            timestamp_formats: default_timestamp_formats(),
            output_dir: default_output_dir(),
            output_name: None,
        }
    }
}

impl AnalysisConfig {
    /// Create a new configuration builder.
    pub fn builder() -> AnalysisConfigBuilder {
        AnalysisConfigBuilder::default()
    }

    /// Read and validate a configuration from a JSON file.
    ///
    /// Missing fields fall back to their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: AnalysisConfig = serde_json::from_str(&content)?;
        config
            .validate()
            .map_err(|e| crate::AnalysisError::InvalidConfig(e.to_string()))?;
        Ok(config)
    }

    /// Validate the configuration and return errors if invalid.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if !(MIN_BIN_COUNT..=MAX_BIN_COUNT).contains(&self.default_bin_count) {
            return Err(ConfigValidationError::InvalidBinCount(
                self.default_bin_count,
            ));
        }

        if self.timestamp_formats.is_empty() {
            return Err(ConfigValidationError::NoTimestampFormats);
        }

        let names = [
            &self.columns.timestamp,
            &self.columns.identifier,
            &self.columns.outcome,
            &self.columns.duration,
        ];
        if let Some(empty) = names.iter().find(|n| n.trim().is_empty()) {
            return Err(ConfigValidationError::EmptyColumnName((*empty).clone()));
        }

        let mut seen = HashSet::new();
        for name in names {
            if !seen.insert(name.as_str()) {
                return Err(ConfigValidationError::DuplicateColumnName(name.clone()));
            }
        }

        Ok(())
    }
}

/// Errors that can occur during configuration validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Invalid default bin count: {0} (must be between 5 and 100)")]
    InvalidBinCount(usize),

    #[error("At least one timestamp format is required")]
    NoTimestampFormats,

    #[error("Column name must not be empty: '{0}'")]
    EmptyColumnName(String),

    #[error("Column name '{0}' is used more than once")]
    DuplicateColumnName(String),
}

/// Builder for [`AnalysisConfig`] with fluent API.
#[derive(Debug, Default)]
pub struct AnalysisConfigBuilder {
    columns: Option<ColumnMapping>,
    default_bin_count: Option<usize>,
    timestamp_formats: Option<Vec<String>>,
    output_dir: Option<PathBuf>,
    output_name: Option<String>,
}

impl AnalysisConfigBuilder {
    /// Set the source and derived column names.
    pub fn columns(mut self, columns: ColumnMapping) -> Self {
        self.columns = Some(columns);
        self
    }

    /// Set the bin count applied when a table is loaded.
    pub fn default_bin_count(mut self, count: usize) -> Self {
        self.default_bin_count = Some(count);
        self
    }

    /// Replace the naive timestamp formats tried after RFC 3339.
    pub fn timestamp_formats<I, S>(mut self, formats: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.timestamp_formats = Some(formats.into_iter().map(Into::into).collect());
        self
    }

    /// Set the output directory for reports and exported tables.
    pub fn output_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(path.into());
        self
    }

    /// Set a custom output file name (without extension).
    pub fn output_name(mut self, name: impl Into<String>) -> Self {
        self.output_name = Some(name.into());
        self
    }

    /// Build the configuration.
    ///
    /// Returns a validated `AnalysisConfig` or an error if validation fails.
    pub fn build(self) -> Result<AnalysisConfig, ConfigValidationError> {
        let config = AnalysisConfig {
            columns: self.columns.unwrap_or_default(),
            default_bin_count: self.default_bin_count.unwrap_or(DEFAULT_BIN_COUNT),
            timestamp_formats: self
                .timestamp_formats
                .unwrap_or_else(default_timestamp_formats),
            output_dir: self.output_dir.unwrap_or_else(default_output_dir),
            output_name: self.output_name,
        };

        config.validate()?;
        Ok(config)
    }
}
