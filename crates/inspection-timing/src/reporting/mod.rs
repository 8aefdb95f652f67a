//! Report generation module.
//!
//! Builds the serializable [`AnalysisReport`] for a session and writes it,
//! together with the derived duration table, under the output directory.
//!
//! # Example
//!
//! ```rust,ignore
//! use inspection_timing::reporting::ReportGenerator;
//!
//! let report = ReportGenerator::build_report("line_a.csv", None, &mut session, true)?;
//!
//! // Print as JSON
//! println!("{}", serde_json::to_string_pretty(&report)?);
//!
//! // Or write to file
//! let generator = ReportGenerator::new(PathBuf::from("outputs"), None);
//! generator.write_report_to_file(&report, "line_a")?;
//! ```

mod generator;

pub use generator::{AnalysisReport, ReportGenerator, TableSummary};
