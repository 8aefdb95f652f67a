//! CSV loading for inspection logs.
//!
//! The loader reads every column as text so that timestamp parsing stays in
//! the normalizer, where failures are reported per row instead of failing the
//! whole file. Lines whose field count differs from the header are dropped
//! before Polars sees the content.

use crate::error::{Result, ResultExt};
use polars::io::csv::read::CsvReadOptions;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::io::Cursor;
use std::path::Path;
use tracing::{debug, info, warn};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// What the loader did to the raw content.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadSummary {
    /// Number of data rows handed to Polars.
    pub rows: usize,
    /// 1-based line numbers of records skipped for a wrong field count.
    pub skipped_lines: Vec<usize>,
    /// Whether invalid UTF-8 sequences were replaced.
    pub lossy_decode: bool,
}

/// A raw table read from CSV plus the loader summary.
#[derive(Debug, Clone)]
pub struct LoadedCsv {
    pub df: DataFrame,
    pub summary: LoadSummary,
}

/// Read a CSV file from disk.
pub fn read_csv_path(path: impl AsRef<Path>) -> Result<LoadedCsv> {
    let path = path.as_ref();
    info!("Loading inspection log from: {}", path.display());
    let bytes = std::fs::read(path).context(format!("Failed to read {}", path.display()))?;
    read_csv_bytes(&bytes)
}

/// Read CSV content already held in memory (e.g. an upload).
pub fn read_csv_bytes(bytes: &[u8]) -> Result<LoadedCsv> {
    let (text, lossy_decode) = decode_text(bytes);
    if lossy_decode {
        warn!("Input is not valid UTF-8; invalid sequences were replaced");
    }

    let sanitized = drop_malformed_records(&text);
    for line in &sanitized.skipped_lines {
        warn!("Skipping malformed line {}: field count differs from header", line);
    }

    if sanitized.content.is_empty() {
        debug!("Input has no header line");
        return Ok(LoadedCsv {
            df: DataFrame::empty(),
            summary: LoadSummary {
                rows: 0,
                skipped_lines: sanitized.skipped_lines,
                lossy_decode,
            },
        });
    }

    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0))
        .into_reader_with_file_handle(Cursor::new(sanitized.content.into_bytes()))
        .finish()
        .context("Failed to parse CSV")?;

    info!("Loaded {} rows x {} columns", df.height(), df.width());

    Ok(LoadedCsv {
        summary: LoadSummary {
            rows: df.height(),
            skipped_lines: sanitized.skipped_lines,
            lossy_decode,
        },
        df,
    })
}

/// Strip a UTF-8 BOM and decode, replacing invalid sequences.
pub(crate) fn decode_text(bytes: &[u8]) -> (Cow<'_, str>, bool) {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    let text = String::from_utf8_lossy(bytes);
    let lossy = matches!(text, Cow::Owned(_));
    (text, lossy)
}

pub(crate) struct SanitizedCsv {
    pub content: String,
    pub skipped_lines: Vec<usize>,
}

/// Keep the header and every record with the header's field count.
///
/// Records are split on newlines outside double quotes, so quoted fields may
/// span lines. Blank lines are dropped without being reported.
pub(crate) fn drop_malformed_records(text: &str) -> SanitizedCsv {
    let mut kept: Vec<&str> = Vec::new();
    let mut skipped_lines = Vec::new();
    let mut expected_fields = None;

    for (line_no, record) in split_records(text) {
        if record.trim().is_empty() {
            continue;
        }
        let fields = count_fields(record);
        match expected_fields {
            None => {
                expected_fields = Some(fields);
                kept.push(record);
            }
            Some(expected) if fields == expected => kept.push(record),
            Some(_) => skipped_lines.push(line_no),
        }
    }

    SanitizedCsv {
        content: kept.join("\n"),
        skipped_lines,
    }
}

/// Position of a scan within one CSV field.
///
/// A double quote opens a quoted section only as the first character of a
/// field; anywhere else it is a literal. Inside a quoted section `""` is an
/// escaped quote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FieldState {
    Start,
    Unquoted,
    Quoted,
    /// A quote seen inside a quoted section: either a closing quote or the
    /// first half of `""`.
    QuotedQuote,
}

impl FieldState {
    fn in_quotes(self) -> bool {
        self == Self::Quoted
    }

    fn next(self, ch: char) -> Self {
        match (self, ch) {
            (Self::Start, '"') => Self::Quoted,
            (Self::Start | Self::Unquoted | Self::QuotedQuote, ',') => Self::Start,
            (Self::Start | Self::Unquoted, _) => Self::Unquoted,
            (Self::Quoted, '"') => Self::QuotedQuote,
            (Self::Quoted, _) => Self::Quoted,
            (Self::QuotedQuote, '"') => Self::Quoted,
            (Self::QuotedQuote, _) => Self::Unquoted,
        }
    }
}

/// Split text into `(starting line number, record)` pairs.
fn split_records(text: &str) -> Vec<(usize, &str)> {
    let mut records = Vec::new();
    let mut state = FieldState::Start;
    let mut start = 0;
    let mut line = 1;
    let mut record_line = 1;

    for (idx, ch) in text.char_indices() {
        if ch == '\n' {
            if !state.in_quotes() {
                records.push((record_line, trim_cr(&text[start..idx])));
                start = idx + 1;
                record_line = line + 1;
                state = FieldState::Start;
            }
            line += 1;
            continue;
        }
        state = state.next(ch);
    }
    if start < text.len() {
        records.push((record_line, trim_cr(&text[start..])));
    }
    records
}

fn trim_cr(record: &str) -> &str {
    record.strip_suffix('\r').unwrap_or(record)
}

/// Count comma-separated fields, ignoring commas inside quoted sections.
fn count_fields(record: &str) -> usize {
    let mut state = FieldState::Start;
    let mut fields = 1;
    for ch in record.chars() {
        if ch == ',' && !state.in_quotes() {
            fields += 1;
        }
        state = state.next(ch);
    }
    fields
}
