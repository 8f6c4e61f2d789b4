//! CLI entry point for the Titanic cleaning pipeline.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use dotenv::dotenv;
use std::path::{Path, PathBuf};
use titanic_cleaning::io::load_csv_with_fallbacks;
use titanic_cleaning::{
    CleaningConfig, CleaningResult, DatasetSource, EdaReport, ImputationOutcome, NumericFallback,
    Pipeline, ReportGenerator,
};
use tracing::{debug, info};

/// Environment variable overriding the directory named datasets are cached in.
const DATA_HOME_ENV: &str = "TITANIC_DATA_HOME";

/// CLI-compatible numeric fallback enum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliNumericFallback {
    /// Leave numeric gaps in place when iterative imputation fails
    None,
    /// Fill numeric gaps with the column median
    Median,
    /// Fill numeric gaps with the column mean
    Mean,
}

impl From<CliNumericFallback> for NumericFallback {
    fn from(cli: CliNumericFallback) -> Self {
        match cli {
            CliNumericFallback::None => NumericFallback::None,
            CliNumericFallback::Median => NumericFallback::Median,
            CliNumericFallback::Mean => NumericFallback::Mean,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Missing-value cleaning and EDA for the Titanic dataset",
    long_about = "Fills missing values in the Titanic passenger table and summarizes the result.\n\n\
                  ENVIRONMENT VARIABLES:\n  \
                  TITANIC_DATA_HOME    Directory where named datasets are cached (default: data)\n\n\
                  EXAMPLES:\n  \
                  # Clean the named dataset into titanic_cleaned.csv\n  \
                  titanic-cleaning clean\n\n  \
                  # Clean a local file and fall back to median fills on failure\n  \
                  titanic-cleaning clean --input raw.csv --numeric-fallback median\n\n  \
                  # Summarize the cleaned file as JSON\n  \
                  titanic-cleaning report --json"
)]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info", global = true)]
    log_level: String,

    /// Suppress progress output (only show warnings, errors and the final result)
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load the dataset, impute missing values and write the cleaned CSV
    Clean(CleanArgs),
    /// Summarize a cleaned CSV
    Report(ReportArgs),
}

#[derive(Args, Debug)]
struct CleanArgs {
    /// CSV file to clean instead of the named dataset
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Named dataset to load
    #[arg(long, default_value = "titanic")]
    dataset: String,

    /// Directory where named datasets are cached
    ///
    /// Falls back to $TITANIC_DATA_HOME, then "data"
    #[arg(long)]
    data_home: Option<PathBuf>,

    /// Path of the cleaned CSV (overwritten)
    #[arg(short, long, default_value = "titanic_cleaned.csv")]
    output: PathBuf,

    /// Substitution applied when iterative imputation fails
    #[arg(long, value_enum, default_value = "none")]
    numeric_fallback: CliNumericFallback,

    /// Seed for the random forest
    #[arg(long, default_value = "0")]
    seed: u64,

    /// Maximum number of imputation rounds
    #[arg(long, default_value = "10")]
    max_iter: usize,

    /// Number of trees per forest
    #[arg(long, default_value = "100")]
    n_estimators: usize,
}

#[derive(Args, Debug)]
struct ReportArgs {
    /// Cleaned CSV to summarize
    #[arg(short, long, default_value = "titanic_cleaned.csv")]
    input: PathBuf,

    /// Output JSON to stdout instead of human-readable summary
    ///
    /// Disables all logs; only the report is written to stdout.
    #[arg(long)]
    json: bool,

    /// Write the JSON report to the output directory
    ///
    /// The report will be saved as <input_name>_report.json
    #[arg(short = 'r', long)]
    emit_report: bool,

    /// Directory for the emitted report
    #[arg(long, default_value = "./outputs")]
    output_dir: PathBuf,
}

/// Initialize the tracing subscriber for logging.
///
/// When `json_output` is true, logging is completely disabled to ensure
/// only JSON is written to stdout.
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
    let cli = Cli::parse();

    let json_output = matches!(&cli.command, Command::Report(args) if args.json);
    init_logging(&cli.log_level, cli.quiet, json_output);

    // Load environment variables from .env file
    dotenv().ok();

    match &cli.command {
        Command::Clean(args) => run_clean(args),
        Command::Report(args) => run_report(args),
    }
}

/// Data home from the flag, else the environment, else the default.
fn resolve_data_home(flag: Option<&Path>) -> PathBuf {
    if let Some(path) = flag {
        return path.to_path_buf();
    }
    match std::env::var(DATA_HOME_ENV) {
        Ok(value) if !value.trim().is_empty() => {
            debug!("Using {}={}", DATA_HOME_ENV, value);
            PathBuf::from(value)
        }
        _ => CleaningConfig::default().data_home,
    }
}

fn run_clean(args: &CleanArgs) -> Result<()> {
    let config = CleaningConfig::builder()
        .dataset(&args.dataset)
        .data_home(resolve_data_home(args.data_home.as_deref()))
        .output_path(&args.output)
        .numeric_fallback(args.numeric_fallback.into())
        .random_seed(args.seed)
        .max_iter(args.max_iter)
        .n_estimators(args.n_estimators)
        .build()?;

    let mut builder = Pipeline::builder().config(config);
    if let Some(input) = &args.input {
        builder = builder.source(DatasetSource::File(input.clone()));
    }
    let pipeline = builder.build()?;

    info!("{}", "=".repeat(80));
    info!("Starting Titanic cleaning pipeline...");
    info!("{}", "=".repeat(80));

    let result = pipeline.run().context("Cleaning pipeline failed")?;

    print_clean_summary(&result, &pipeline.source(), &args.output);
    Ok(())
}

fn run_report(args: &ReportArgs) -> Result<()> {
    info!("Loading cleaned dataset from: {}", args.input.display());
    let df = load_csv_with_fallbacks(&args.input)
        .with_context(|| format!("Could not read {}", args.input.display()))?;

    let report = ReportGenerator::build_eda_report(&df)?;

    if args.emit_report {
        let stem = extract_file_stem(&args.input);
        let generator = ReportGenerator::new(args.output_dir.clone());
        let report_path = generator.write_report_to_file(&report, &stem)?;
        info!("Report written to: {}", report_path.display());
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    print_report_summary(&report, &args.input);
    Ok(())
}

/// Extract the file stem (name without extension) from a path.
fn extract_file_stem(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("output")
        .to_string()
}

/// Print a human-readable summary of the cleaning run.
fn print_clean_summary(result: &CleaningResult, source: &DatasetSource, output: &Path) {
    let report = &result.report;

    println!();
    println!("{}", "=".repeat(80));
    println!("CLEANING COMPLETE");
    println!("{}", "=".repeat(80));
    println!();

    println!(
        "Input:  {} ({} rows x {} columns)",
        source.display_name(),
        report.shape_before.0,
        report.shape_before.1
    );
    println!(
        "Output: {} ({} rows x {} columns)",
        output.display(),
        report.shape_after.0,
        report.shape_after.1
    );
    println!();

    println!("Processing Summary:");
    println!("  Duration: {}ms", report.duration_ms);
    if report.dropped_columns.is_empty() {
        println!("  Dropped columns: none");
    } else {
        println!("  Dropped columns: {}", report.dropped_columns.join(", "));
    }
    println!("  Numeric columns: {}", report.partition.numeric.join(", "));
    println!(
        "  Categorical columns: {}",
        report.partition.categorical.join(", ")
    );
    println!();

    println!("Numeric Imputation:");
    match &report.numeric_outcome {
        ImputationOutcome::FullyImputed => println!(
            "  Iterative imputation filled {:?} in {} rounds",
            report.numeric_columns_with_missing, report.rounds
        ),
        ImputationOutcome::FallbackImputed { strategy, reason } => {
            println!("  ! Iterative imputation failed: {}", reason);
            println!("  Filled numeric gaps with the {:?} fallback", strategy);
        }
        ImputationOutcome::PartiallyImputed {
            columns_still_missing,
            reason,
        } => {
            println!("  ! Iterative imputation failed: {}", reason);
            println!("  Still missing: {}", columns_still_missing.join(", "));
            println!("  Re-run with --numeric-fallback median|mean to fill them");
        }
    }
    println!();

    if !report.mode_fills.is_empty() {
        println!("Categorical Imputation:");
        for fill in &report.mode_fills {
            println!(
                "  - {}: {} values filled with '{}'",
                fill.column, fill.filled, fill.value
            );
        }
        println!();
    }

    println!("Remaining missing values: {}", report.remaining_missing);
    println!("{}", "=".repeat(80));
}

/// Print a human-readable summary of the EDA report.
fn print_report_summary(report: &EdaReport, input: &Path) {
    println!();
    println!("{}", "=".repeat(80));
    println!("EDA REPORT: {}", input.display());
    println!("{}", "=".repeat(80));
    println!();

    println!("Dataset Shape: {} rows x {} columns", report.shape.0, report.shape.1);
    println!();

    println!("Missing Values:");
    for col in &report.columns {
        println!(
            "  {:<14} {:<6} {:>5} ({:.1}%)",
            col.name, col.dtype, col.missing, col.missing_percent
        );
    }
    println!();

    println!("Numeric Summary:");
    println!(
        "  {:<14} {:>6} {:>10} {:>10} {:>10} {:>10} {:>10}",
        "column", "count", "mean", "std", "min", "50%", "max"
    );
    for s in &report.numeric_summaries {
        println!(
            "  {:<14} {:>6} {:>10} {:>10} {:>10} {:>10} {:>10}",
            s.column,
            s.count,
            fmt_opt(s.mean),
            fmt_opt(s.std),
            fmt_opt(s.min),
            fmt_opt(s.median),
            fmt_opt(s.max)
        );
    }
    println!();

    println!("IQR Outliers:");
    for o in &report.outliers {
        println!("  {}: {} outliers", o.column, o.count);
    }
    println!();

    if !report.survival_by_category.is_empty() {
        println!("Survival Rate by Category:");
        for breakdown in &report.survival_by_category {
            let groups: Vec<String> = breakdown
                .groups
                .iter()
                .map(|g| format!("{}={}", g.group, fmt_rate(g.survival_rate)))
                .collect();
            println!("  {}: {}", breakdown.column, groups.join(", "));
        }
        println!();
    }

    if let Some(age_groups) = &report.age_groups {
        println!("Age Groups:");
        for g in age_groups {
            println!(
                "  {:<12} {:>5} passengers, survival {}",
                g.group,
                g.count,
                fmt_rate(g.survival_rate)
            );
        }
        println!();
    }

    if !report.survival_by_sex_and_class.is_empty() {
        println!("Survival by Sex and Class:");
        for g in &report.survival_by_sex_and_class {
            println!(
                "  {:<20} {:>5} passengers, survival {}",
                g.group,
                g.count,
                fmt_rate(g.survival_rate)
            );
        }
        println!();
    }

    println!("Use --json for machine-readable output");
    println!("Use --emit-report to save detailed JSON report");
    println!("{}", "=".repeat(80));
}

fn fmt_opt(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{:.2}", v))
}

fn fmt_rate(rate: Option<f64>) -> String {
    rate.map_or_else(|| "-".to_string(), |r| format!("{:.1}%", r * 100.0))
}
