use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Canonical text form of a parsed timestamp.
pub const TIMESTAMP_DISPLAY_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// Event time of a record.
///
/// A value that cannot be parsed keeps its original text and is never
/// coerced into a different instant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Timestamp {
    /// Parsed into a structured instant (UTC when the source carried an offset).
    Parsed { instant: NaiveDateTime, raw: String },
    /// Left as the original text; excluded from ordering and duration derivation.
    Unparsed { raw: String },
}

impl Timestamp {
    /// The parsed instant, if any.
    pub fn instant(&self) -> Option<NaiveDateTime> {
        match self {
            Self::Parsed { instant, .. } => Some(*instant),
            Self::Unparsed { .. } => None,
        }
    }

    /// The text exactly as it appeared in the source table.
    pub fn raw(&self) -> &str {
        match self {
            Self::Parsed { raw, .. } | Self::Unparsed { raw } => raw,
        }
    }

    pub fn is_parsed(&self) -> bool {
        matches!(self, Self::Parsed { .. })
    }

    /// Chronological order with every unparsed value after every parsed one.
    ///
    /// Unparsed values compare equal to each other so a stable sort keeps
    /// their original relative order.
    pub fn chronological_cmp(&self, other: &Self) -> Ordering {
        match (self.instant(), other.instant()) {
            (Some(a), Some(b)) => a.cmp(&b),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parsed { instant, .. } => {
                write!(f, "{}", instant.format(TIMESTAMP_DISPLAY_FORMAT))
            }
            Self::Unparsed { raw } => f.write_str(raw),
        }
    }
}

/// One normalized row of the source table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub timestamp: Timestamp,
    pub identifier: String,
    pub outcome: String,
    /// Row index in the source table before sorting.
    pub source_row: usize,
}

/// A record together with its derived duration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivedRecord {
    #[serde(flatten)]
    pub record: Record,
    /// Seconds since the chronologically previous record; `None` when undefined.
    pub duration: Option<f64>,
}

/// Non-fatal data-quality findings carried alongside a table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DataQualityWarning {
    /// A timestamp could not be parsed; the row keeps its text and gets no duration.
    TimestampParse { row: usize, raw: String },
    /// A derived duration is negative despite ascending order.
    NegativeDuration { row: usize, seconds: f64 },
}

impl DataQualityWarning {
    /// Stable code for frontend handling.
    pub fn code(&self) -> &'static str {
        match self {
            Self::TimestampParse { .. } => "TIMESTAMP_PARSE",
            Self::NegativeDuration { .. } => "NEGATIVE_DURATION",
        }
    }
}

impl fmt::Display for DataQualityWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TimestampParse { row, raw } => {
                write!(f, "row {row}: timestamp '{raw}' could not be parsed")
            }
            Self::NegativeDuration { row, seconds } => {
                write!(f, "row {row}: negative duration {seconds:.3} sec")
            }
        }
    }
}

/// Inclusive integer bounds of the non-null durations of a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DurationBounds {
    pub lower: i64,
    pub upper: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32, s: u32) -> Timestamp {
        let instant = NaiveDate::from_ymd_opt(2024, 5, 1)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap();
        Timestamp::Parsed {
            instant,
            raw: instant.to_string(),
        }
    }

    #[test]
    fn test_unparsed_sorts_after_parsed() {
        let unparsed = Timestamp::Unparsed {
            raw: "garbage".to_string(),
        };
        assert_eq!(at(23, 59, 59).chronological_cmp(&unparsed), Ordering::Less);
        assert_eq!(unparsed.chronological_cmp(&at(0, 0, 0)), Ordering::Greater);
        assert_eq!(unparsed.chronological_cmp(&unparsed), Ordering::Equal);
    }

    #[test]
    fn test_display_uses_canonical_format() {
        assert_eq!(at(9, 5, 3).to_string(), "2024-05-01 09:05:03");
        let unparsed = Timestamp::Unparsed {
            raw: "yesterday".to_string(),
        };
        assert_eq!(unparsed.to_string(), "yesterday");
    }

    #[test]
    fn test_warning_serialization() {
        let warning = DataQualityWarning::TimestampParse {
            row: 3,
            raw: "n/a".to_string(),
        };
        let json = serde_json::to_string(&warning).unwrap();
        assert!(json.contains("timestamp_parse"));
        assert_eq!(warning.code(), "TIMESTAMP_PARSE");
    }
}
