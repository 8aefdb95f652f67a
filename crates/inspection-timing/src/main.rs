//! CLI entry point for the inspection timing analysis.

use anyhow::{Result, anyhow};
use clap::Parser;
use inspection_timing::{
    AnalysisConfig, AnalysisReport, AnalysisSession, ArtifactIndex, ColumnMapping, DerivedRecord,
    Histogram, ReportGenerator,
};
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

/// Width of the longest bar in the text histogram.
const BAR_WIDTH: usize = 50;

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Inter-event duration analysis for inspection logs",
    long_about = "Reads a timestamped inspection log, derives the seconds elapsed between \
                  consecutive records and summarizes them as a histogram.\n\n\
                  EXAMPLES:\n  \
                  # Histogram with the default range and 50 bins\n  \
                  inspection-timing -i log.csv\n\n  \
                  # Original Japanese headers, 20 bins over 0-30 sec, with mean/median\n  \
                  inspection-timing -i log.csv --ja-headers --bins 20 --lower 0 --upper 30 --stats\n\n  \
                  # Look up the records and image for one file name\n  \
                  inspection-timing -i log.csv --show img_0042.png --images ./captures"
)]
struct Args {
    /// Path to the CSV file to analyze
    #[arg(short, long)]
    input: String,

    /// JSON configuration file
    #[arg(long)]
    config: Option<String>,

    /// Use the inspection-log headers (日時, ファイル名, 判定結果, derived Time)
    #[arg(long)]
    ja_headers: bool,

    /// Output directory for reports and exports
    #[arg(short, long)]
    output: Option<String>,

    /// Custom output file name (without extension)
    ///
    /// If not specified, uses the input file stem
    #[arg(long)]
    output_name: Option<String>,

    /// Number of histogram bins (5-100)
    #[arg(long)]
    bins: Option<usize>,

    /// Lower duration bound in seconds (default: floor of the shortest duration)
    #[arg(long, allow_negative_numbers = true)]
    lower: Option<i64>,

    /// Upper duration bound in seconds (default: ceiling of the longest duration)
    #[arg(long, allow_negative_numbers = true)]
    upper: Option<i64>,

    /// Compute mean and median of the durations in range
    #[arg(long)]
    stats: bool,

    /// Print the records of one identifier (file name)
    #[arg(long)]
    show: Option<String>,

    /// Directory of images used to resolve `--show`
    #[arg(long, requires = "show")]
    images: Option<String>,

    /// Print the unique identifiers in order of first appearance
    #[arg(long)]
    list_identifiers: bool,

    /// Print the derived table
    #[arg(long)]
    table: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Suppress progress output (only show errors and final result)
    #[arg(short, long)]
    quiet: bool,

    /// Output JSON to stdout instead of human-readable summary
    ///
    /// Disables all logs; only outputs the analysis report.
    #[arg(long)]
    json: bool,

    /// Write a detailed JSON report to the output directory
    ///
    /// The report will be saved as <input_name>_report.json
    #[arg(short = 'r', long)]
    emit_report: bool,

    /// Write the derived table to <input_name>_durations.csv
    #[arg(long)]
    export_csv: bool,
}

/// Initialize the tracing subscriber for logging.
///
/// When `json_output` is true, logging is disabled so stdout only carries JSON.
fn init_logging(level: &str, quiet: bool, json_output: bool) {
    if json_output {
        return;
    }

    use tracing_subscriber::EnvFilter;

    let effective_level = if quiet { "warn" } else { level };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(effective_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args.log_level, args.quiet, args.json);

    if !Path::new(&args.input).exists() {
        return Err(anyhow!("Input file not found: {}", args.input));
    }

    let config = build_config(&args)?;
    let generator = ReportGenerator::from_config(&config);
    let base_name = generator.base_name(Path::new(&args.input));

    let mut session = AnalysisSession::new(config)?;
    if let Err(e) = session.load_csv_path(&args.input) {
        error!("Failed to load {}: {}", args.input, e);
        return Err(anyhow!("Failed to load {}: {}", args.input, e));
    }

    apply_parameters(&mut session, &args)?;

    let exported = if args.export_csv {
        Some(generator.export_table_csv(session.table()?, &base_name)?)
    } else {
        None
    };
    let exported_str = exported.as_ref().map(|p| p.display().to_string());

    let report =
        ReportGenerator::build_report(&args.input, exported_str.as_deref(), &mut session, args.stats)?;

    if args.emit_report {
        let report_path = generator.write_report_to_file(&report, &base_name)?;
        info!("Report written to: {}", report_path.display());
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    print_human_readable_summary(&report, &session, &args)?;

    Ok(())
}

/// Assemble the configuration from the optional file and CLI overrides.
fn build_config(args: &Args) -> Result<AnalysisConfig> {
    let mut config = match &args.config {
        Some(path) => AnalysisConfig::from_json_file(path)?,
        None => AnalysisConfig::default(),
    };

    if args.ja_headers {
        config.columns = ColumnMapping::inspection_log_ja();
    }
    if let Some(ref output) = args.output {
        config.output_dir = PathBuf::from(output);
    }
    if let Some(ref name) = args.output_name {
        config.output_name = Some(name.clone());
    }

    config.validate()?;
    Ok(config)
}

/// Apply `--bins`, `--lower` and `--upper` to a loaded session.
///
/// A missing bound falls back to the live data bound.
fn apply_parameters(session: &mut AnalysisSession, args: &Args) -> Result<()> {
    if let Some(bins) = args.bins {
        session.set_bin_count(bins)?;
    }

    if args.lower.is_none() && args.upper.is_none() {
        return Ok(());
    }

    let bounds = session.bounds();
    let lower = args
        .lower
        .or(bounds.map(|b| b.lower))
        .ok_or_else(|| anyhow!("--lower is required when the table has no durations"))?;
    let upper = args
        .upper
        .or(bounds.map(|b| b.upper))
        .ok_or_else(|| anyhow!("--upper is required when the table has no durations"))?;

    session.set_range(lower, upper)?;
    Ok(())
}

/// Print a human-readable summary of the analysis.
///
/// This is the default output when `--json` is not specified.
fn print_human_readable_summary(
    report: &AnalysisReport,
    session: &AnalysisSession,
    args: &Args,
) -> Result<()> {
    let table = session.table()?;
    let summary = &report.table_summary;

    println!();
    println!("{}", "=".repeat(80));
    println!("INSPECTION TIMING ANALYSIS");
    println!("{}", "=".repeat(80));
    println!();

    println!(
        "Input:  {} ({} rows, {} with duration)",
        report.input_file, summary.rows, summary.rows_with_duration
    );
    if let Some(ref output_file) = report.output_file {
        println!("Output: {}", output_file);
    }
    if let Some(ref load) = report.load_summary
        && !load.skipped_lines.is_empty()
    {
        println!("Skipped malformed lines: {:?}", load.skipped_lines);
    }
    if !report.warnings.is_empty() {
        println!("Data quality warnings: {}", report.warnings.len());
        for warning in report.warnings.iter().take(10) {
            println!("  - {}", warning);
        }
        if report.warnings.len() > 10 {
            println!("  ... and {} more", report.warnings.len() - 10);
        }
    }
    println!();

    if args.list_identifiers {
        println!("IDENTIFIERS");
        println!("{}", "-".repeat(40));
        for identifier in table.unique_identifiers() {
            println!("  {}", identifier);
        }
        println!();
    }

    if let Some(ref identifier) = args.show {
        print_identifier(identifier, &table.rows_for(identifier), args.images.as_deref())?;
    }

    if args.table {
        println!("DERIVED TABLE");
        println!("{}", "-".repeat(40));
        println!("{}", table.to_dataframe()?);
        println!();
    }

    println!("HISTOGRAM");
    println!("{}", "-".repeat(40));
    match report.range {
        Some(range) => println!(
            "  Range: {} - {} sec, {} bins, {} values",
            range.lower, range.upper, report.bin_count, report.filtered_rows
        ),
        None => println!("  Range: none, {} bins", report.bin_count),
    }
    print_histogram(&report.histogram);
    println!();

    if args.stats {
        println!("STATISTICS");
        println!("{}", "-".repeat(40));
        if report.statistics_text.is_empty() {
            println!("  No data in range");
        } else {
            for line in &report.statistics_text {
                println!("  {}", line);
            }
        }
        println!();
    }

    println!("{}", "=".repeat(80));
    Ok(())
}

/// Print the records and resolved image for one identifier.
fn print_identifier(identifier: &str, rows: &[&DerivedRecord], images: Option<&str>) -> Result<()> {
    println!("RECORDS FOR {}", identifier);
    println!("{}", "-".repeat(40));

    if rows.is_empty() {
        warn!("No records for identifier '{}'", identifier);
        println!("  No records");
    }
    for row in rows {
        let duration = row
            .duration
            .map(|d| format!("{:.3}", d))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "  {:<26} {:>12} {}",
            row.record.timestamp.to_string(),
            duration,
            row.record.outcome
        );
    }

    if let Some(dir) = images {
        let index = ArtifactIndex::scan_dir(dir)?;
        match index.resolve(identifier) {
            Some(artifact) => println!("  Image: {}", artifact.path.display()),
            None => println!("  Image: not found in {} ({} images)", dir, index.len()),
        }
    }
    println!();
    Ok(())
}

/// Draw one text bar per bin, scaled to the fullest bin.
fn print_histogram(histogram: &Histogram) {
    let bins = match histogram {
        Histogram::Empty { .. } => {
            println!("  No data in range");
            return;
        }
        Histogram::Binned { bins } => bins,
    };

    let max_count = histogram.max_count().max(1);
    for (idx, bin) in bins.iter().enumerate() {
        let close = if idx + 1 == bins.len() { ']' } else { ')' };
        let bar = "#".repeat(bin.count * BAR_WIDTH / max_count);
        println!(
            "  [{:>9.2}, {:>9.2}{} {:>6} {}",
            bin.start, bin.end, close, bin.count, bar
        );
    }
}
