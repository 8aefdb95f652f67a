use crate::config::AnalysisConfig;
use crate::durations::DurationTable;
use crate::error::{Result, ResultExt};
use crate::filter::RangeFilter;
use crate::histogram::Histogram;
use crate::loader::LoadSummary;
use crate::session::AnalysisSession;
use crate::statistics::StatisticsReport;
use crate::types::{DataQualityWarning, DurationBounds};
use chrono::Local;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

// ============================================================================
// Report Types
// ============================================================================

/// Full analysis report for CLI and library output.
///
/// Used for both JSON output (`--json`) and file writing (`--emit-report`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    /// Timestamp when the report was generated
    pub generated_at: String,
    /// Path to the input file
    pub input_file: String,
    /// Path to the exported derived table (if written)
    pub output_file: Option<String>,

    /// What the CSV loader skipped or replaced
    pub load_summary: Option<LoadSummary>,
    /// Shape of the derived table
    pub table_summary: TableSummary,
    /// Non-fatal data-quality findings
    pub warnings: Vec<DataQualityWarning>,

    /// Integer bounds of the live durations
    pub bounds: Option<DurationBounds>,
    /// Range the histogram was built over
    pub range: Option<RangeFilter>,
    pub bin_count: usize,
    /// Number of durations inside the range
    pub filtered_rows: usize,
    pub histogram: Histogram,

    pub statistics: Option<StatisticsReport>,
    /// Annotation text, e.g. `Mean: 2.00 sec`
    pub statistics_text: Vec<String>,
}

/// Row and column counts of the derived table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSummary {
    pub rows: usize,
    pub rows_with_duration: usize,
    pub unparsed_timestamps: usize,
    pub negative_durations: usize,
    pub unique_identifiers: usize,
    /// Output column names, in order
    pub columns: Vec<String>,
}

impl TableSummary {
    pub fn from_table(table: &DurationTable) -> Self {
        let unparsed_timestamps = table
            .warnings()
            .iter()
            .filter(|w| matches!(w, DataQualityWarning::TimestampParse { .. }))
            .count();
        let negative_durations = table
            .warnings()
            .iter()
            .filter(|w| matches!(w, DataQualityWarning::NegativeDuration { .. }))
            .count();

        Self {
            rows: table.len(),
            rows_with_duration: table.non_null_durations().len(),
            unparsed_timestamps,
            negative_durations,
            unique_identifiers: table.unique_identifiers().len(),
            columns: table
                .columns()
                .output_order()
                .iter()
                .map(|c| c.to_string())
                .collect(),
        }
    }
}

// ============================================================================
// Report Generator
// ============================================================================

/// Writes reports and derived tables under an output directory.
pub struct ReportGenerator {
    output_dir: PathBuf,
    output_name: Option<String>,
}

impl ReportGenerator {
    pub fn new(output_dir: PathBuf, output_name: Option<String>) -> Self {
        Self {
            output_dir,
            output_name,
        }
    }

    pub fn from_config(config: &AnalysisConfig) -> Self {
        Self::new(config.output_dir.clone(), config.output_name.clone())
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Base name for output files: the configured name, else the input stem.
    pub fn base_name(&self, input: &Path) -> String {
        self.output_name.clone().unwrap_or_else(|| {
            input
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("analysis")
                .to_string()
        })
    }

    /// Build a report from the session's current table and parameters.
    ///
    /// With `with_statistics`, an empty range leaves `statistics` unset
    /// instead of failing the whole report.
    pub fn build_report(
        input_file: &str,
        output_file: Option<&str>,
        session: &mut AnalysisSession,
        with_statistics: bool,
    ) -> Result<AnalysisReport> {
        let view = session.view(with_statistics)?;
        let filtered_rows = view.histogram.total();
        let table = session.table()?;

        let statistics_text = view
            .statistics
            .as_ref()
            .map(|s| s.lines().to_vec())
            .unwrap_or_default();

        Ok(AnalysisReport {
            generated_at: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            input_file: input_file.to_string(),
            output_file: output_file.map(String::from),
            load_summary: session.load_summary().cloned(),
            table_summary: TableSummary::from_table(table),
            warnings: table.warnings().to_vec(),
            bounds: session.bounds(),
            range: view.range,
            bin_count: view.bin_count,
            filtered_rows,
            histogram: view.histogram,
            statistics: view.statistics,
            statistics_text,
        })
    }

    /// Write a report to `<base>_report.json` in the output directory.
    pub fn write_report_to_file(
        &self,
        report: &AnalysisReport,
        report_base_name: &str,
    ) -> Result<PathBuf> {
        fs::create_dir_all(&self.output_dir)
            .context(format!("Failed to create {}", self.output_dir.display()))?;

        let report_path = self
            .output_dir
            .join(format!("{}_report.json", report_base_name));
        let mut file = File::create(&report_path)
            .context(format!("Failed to create {}", report_path.display()))?;
        file.write_all(serde_json::to_string_pretty(report)?.as_bytes())?;

        info!("Report saved: {}", report_path.display());

        Ok(report_path)
    }

    /// Write the derived table to `<base>_durations.csv` in the output directory.
    pub fn export_table_csv(&self, table: &DurationTable, base_name: &str) -> Result<PathBuf> {
        let mut df = table.to_dataframe()?;

        fs::create_dir_all(&self.output_dir)
            .context(format!("Failed to create {}", self.output_dir.display()))?;
        let output_path = self.output_dir.join(format!("{}_durations.csv", base_name));
        let mut file = File::create(&output_path)
            .context(format!("Failed to create {}", output_path.display()))?;

        CsvWriter::new(&mut file)
            .include_header(true)
            .with_separator(b',')
            .with_quote_char(b'"')
            .finish(&mut df)
            .context("Writing duration table")?;

        info!("Duration table saved: {}", output_path.display());

        Ok(output_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SCENARIO: &[u8] = b"timestamp,identifier,outcome\n\
        2024-01-01 10:00:00,A,OK\n\
        2024-01-01 10:00:05,B,NG\n\
        2024-01-01 10:00:02,C,OK\n";

    fn loaded_session() -> AnalysisSession {
        let mut session = AnalysisSession::default();
        session.load_csv_bytes(SCENARIO).unwrap();
        session
    }

    #[test]
    fn test_build_report_with_statistics() {
        let mut session = loaded_session();
        let report =
            ReportGenerator::build_report("scenario.csv", None, &mut session, true).unwrap();

        assert_eq!(report.input_file, "scenario.csv");
        assert_eq!(report.table_summary.rows, 3);
        assert_eq!(report.table_summary.rows_with_duration, 2);
        assert_eq!(
            report.table_summary.columns,
            vec!["timestamp", "identifier", "duration", "outcome"]
        );
        assert_eq!(report.bounds, Some(DurationBounds { lower: 2, upper: 3 }));
        assert_eq!(report.filtered_rows, 2);
        assert_eq!(
            report.statistics_text,
            vec!["Mean: 2.50 sec".to_string(), "Median: 2.50 sec".to_string()]
        );
    }

    #[test]
    fn test_empty_range_report_has_no_statistics() {
        let mut session = loaded_session();
        session.set_range(100, 200).unwrap();
        let report =
            ReportGenerator::build_report("scenario.csv", None, &mut session, true).unwrap();

        assert!(report.histogram.is_empty());
        assert_eq!(report.filtered_rows, 0);
        assert!(report.statistics.is_none());
        assert!(report.statistics_text.is_empty());
    }

    #[test]
    fn test_base_name_prefers_configured_name() {
        let named = ReportGenerator::new(PathBuf::from("out"), Some("daily".to_string()));
        assert_eq!(named.base_name(Path::new("logs/line_a.csv")), "daily");

        let unnamed = ReportGenerator::new(PathBuf::from("out"), None);
        assert_eq!(unnamed.base_name(Path::new("logs/line_a.csv")), "line_a");
    }

    #[test]
    fn test_write_report_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let generator = ReportGenerator::new(dir.path().join("reports"), None);
        let mut session = loaded_session();
        let report = ReportGenerator::build_report("scenario.csv", None, &mut session, false)
            .unwrap();

        let path = generator.write_report_to_file(&report, "scenario").unwrap();
        assert_eq!(path, dir.path().join("reports").join("scenario_report.json"));

        let json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(json["bin_count"], 50);
        assert_eq!(json["histogram"]["state"], "binned");
        assert!(json["statistics"].is_null());
    }

    #[test]
    fn test_export_table_csv_keeps_column_order() {
        let dir = tempfile::tempdir().unwrap();
        let generator = ReportGenerator::new(dir.path().to_path_buf(), None);
        let session = loaded_session();

        let path = generator
            .export_table_csv(session.table().unwrap(), "scenario")
            .unwrap();
        let content = fs::read_to_string(&path).unwrap();
        let mut lines = content.lines();
        assert_eq!(lines.next(), Some("timestamp,identifier,duration,outcome"));
        assert_eq!(lines.next(), Some("2024-01-01 10:00:00,A,,OK"));

        let rows: Vec<Vec<&str>> = lines.map(|l| l.split(',').collect()).collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0][0], "2024-01-01 10:00:02");
        assert_eq!(rows[0][2].parse::<f64>().unwrap(), 2.0);
        assert_eq!(rows[1][1], "B");
        assert_eq!(rows[1][2].parse::<f64>().unwrap(), 3.0);
    }
}
