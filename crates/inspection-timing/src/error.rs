//! Error types for the inspection timing analysis.
//!
//! This module provides the error hierarchy using `thiserror`. Ingestion
//! failures (missing columns) stop the pipeline for that table only; every
//! other error is scoped to a single computation such as one histogram request.
//!
//! Errors are serializable so a presentation layer can show them directly.

use serde::Serialize;
use serde::ser::SerializeStruct;
use thiserror::Error;

/// The main error type for the analysis pipeline.
#[derive(Error, Debug)]
pub enum AnalysisError {
    /// One or more required columns are absent from the source table.
    #[error("Missing required columns: {}", .missing.join(", "))]
    MissingColumns { missing: Vec<String> },

    /// The filtered subset contains no values.
    #[error("No data in range")]
    EmptyData,

    /// A column was not found or is not a numeric column of the table.
    #[error("Column '{0}' not found in table")]
    ColumnNotFound(String),

    /// Bin count outside the accepted range.
    #[error("Invalid bin count: {count} (must be between {min} and {max})")]
    InvalidBinCount { count: usize, min: usize, max: usize },

    /// Range bounds in the wrong order.
    #[error("Invalid range: lower bound {lower} is greater than upper bound {upper}")]
    InvalidRange { lower: i64, upper: i64 },

    /// No table has been loaded into the session.
    #[error("No data loaded")]
    NoDataLoaded,

    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Polars error wrapper.
    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context.
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<AnalysisError>,
    },
}

impl AnalysisError {
    /// Add context to an error.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        AnalysisError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Get error code for frontend handling.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::MissingColumns { .. } => "MISSING_COLUMNS",
            Self::EmptyData => "EMPTY_DATA",
            Self::ColumnNotFound(_) => "COLUMN_NOT_FOUND",
            Self::InvalidBinCount { .. } => "INVALID_BIN_COUNT",
            Self::InvalidRange { .. } => "INVALID_RANGE",
            Self::NoDataLoaded => "NO_DATA_LOADED",
            Self::InvalidConfig(_) => "INVALID_CONFIG",
            Self::Io(_) => "IO_ERROR",
            Self::Polars(_) => "POLARS_ERROR",
            Self::Json(_) => "JSON_ERROR",
            Self::WithContext { source, .. } => source.error_code(),
        }
    }

    /// Check if this error is an empty filtered subset.
    ///
    /// Callers render this as a "no data in range" state rather than a failure.
    pub fn is_empty_data(&self) -> bool {
        match self {
            Self::EmptyData => true,
            Self::WithContext { source, .. } => source.is_empty_data(),
            _ => false,
        }
    }

    /// Check if this error rejects a source table during ingestion.
    pub fn is_ingestion_error(&self) -> bool {
        match self {
            Self::MissingColumns { .. } => true,
            Self::WithContext { source, .. } => source.is_ingestion_error(),
            _ => false,
        }
    }
}

/// Errors are serialized as a struct with `code` and `message` fields.
impl Serialize for AnalysisError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("AnalysisError", 2)?;
        state.serialize_field("code", &self.error_code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

/// Result type alias for analysis operations.
pub type Result<T> = std::result::Result<T, AnalysisError>;

/// Extension trait for adding context to Results.
pub trait ResultExt<T> {
    /// Add context to an error result.
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, polars::error::PolarsError> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| AnalysisError::Polars(e).with_context(context))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, std::io::Error> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| AnalysisError::Io(e).with_context(context))
    }
}
