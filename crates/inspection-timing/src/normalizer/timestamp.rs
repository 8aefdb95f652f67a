//! Timestamp parsing for the normalizer.

use crate::config::{AnalysisConfig, DEFAULT_TIMESTAMP_FORMATS};
use crate::types::{TIMESTAMP_DISPLAY_FORMAT, Timestamp};
use chrono::{DateTime, NaiveDate, NaiveDateTime};

/// Offset-carrying formats tried after RFC 3339.
const OFFSET_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f%:z", "%Y/%m/%d %H:%M:%S%.f%:z"];

/// Date-only formats, interpreted as midnight.
const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%Y/%m/%d"];

/// Parses timestamp text into instants.
///
/// Order of attempts: RFC 3339, offset formats, the canonical display format,
/// the configured naive formats, then date-only formats. Values with an offset
/// are converted to UTC.
#[derive(Debug, Clone)]
pub struct TimestampParser {
    formats: Vec<String>,
}

impl Default for TimestampParser {
    fn default() -> Self {
        Self::new(DEFAULT_TIMESTAMP_FORMATS.iter().map(|f| f.to_string()))
    }
}

impl TimestampParser {
    pub fn new<I, S>(formats: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            formats: formats.into_iter().map(Into::into).collect(),
        }
    }

    pub fn from_config(config: &AnalysisConfig) -> Self {
        Self::new(config.timestamp_formats.iter().cloned())
    }

    /// Parse a single value, returning `None` when no format matches.
    pub fn parse_instant(&self, value: &str) -> Option<NaiveDateTime> {
        let value = value.trim();
        if value.is_empty() {
            return None;
        }

        if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
            return Some(dt.naive_utc());
        }
        for format in OFFSET_FORMATS {
            if let Ok(dt) = DateTime::parse_from_str(value, format) {
                return Some(dt.naive_utc());
            }
        }

        std::iter::once(TIMESTAMP_DISPLAY_FORMAT)
            .chain(self.formats.iter().map(String::as_str))
            .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
            .or_else(|| {
                DATE_FORMATS.iter().find_map(|format| {
                    NaiveDate::parse_from_str(value, format)
                        .ok()
                        .and_then(|date| date.and_hms_opt(0, 0, 0))
                })
            })
    }

    /// Parse a cell, keeping the original text either way.
    pub fn parse(&self, raw: &str) -> Timestamp {
        match self.parse_instant(raw) {
            Some(instant) => Timestamp::Parsed {
                instant,
                raw: raw.to_string(),
            },
            None => Timestamp::Unparsed {
                raw: raw.to_string(),
            },
        }
    }
}
