//! CLI entry point for exploratory analysis of claims tables.

use anyhow::{Result, anyhow};
use clap::{Parser, ValueEnum};
use claims_processing::{
    DataPreparer, EdaAnalyzer, EdaReport, NumericImputation, PreparerConfig, load_table,
    write_csv,
};
use dotenv::dotenv;
use tracing::info;

/// CLI-compatible numeric imputation strategy enum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliNumericImputation {
    /// Use the median of non-null values
    Median,
    /// Use the mean of non-null values
    Mean,
}

impl From<CliNumericImputation> for NumericImputation {
    fn from(cli: CliNumericImputation) -> Self {
        match cli {
            CliNumericImputation::Median => NumericImputation::Median,
            CliNumericImputation::Mean => NumericImputation::Mean,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Exploratory analysis of insurance claims data",
    long_about = "Loads a claims extract and reports summary statistics, missing values,\n\
                  loss ratios, claims by make, monthly trends and vehicle breakdowns.\n\n\
                  EXAMPLES:\n  \
                  # Pipe-delimited extract\n  \
                  claims-eda -i MachineLearningRating_v3.txt\n\n  \
                  # Loss ratio by province as JSON\n  \
                  claims-eda -i data.csv --group-by Province --json\n\n  \
                  # Also write the model-ready table\n  \
                  claims-eda -i data.csv --prepare-output prepared.csv"
)]
struct Args {
    /// Path to the claims file (.csv, .tsv, .txt or .parquet)
    #[arg(short, long)]
    input: String,

    /// Field delimiter for .txt files
    #[arg(long, default_value = "|")]
    delimiter: char,

    /// Output JSON to stdout instead of human-readable summary
    ///
    /// Disables all progress logs; only outputs the final JSON report.
    #[arg(long)]
    json: bool,

    /// Write the prepared (imputed and encoded) table to this CSV path
    #[arg(long)]
    prepare_output: Option<String>,

    /// Missing column threshold (0.0 - 1.0)
    ///
    /// Columns with a missing fraction above this value are dropped when
    /// preparing the table
    #[arg(long, default_value = "0.3")]
    missing_col_threshold: f64,

    /// Strategy for imputing missing numeric values
    #[arg(long, value_enum, default_value = "median")]
    numeric_imputation: CliNumericImputation,

    /// Column to break the loss ratio down by
    #[arg(long)]
    group_by: Option<String>,

    /// Number of makes to list by average claim amount
    #[arg(long, default_value = "10")]
    top_n: usize,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Suppress progress output (only show errors and final result)
    #[arg(short, long)]
    quiet: bool,
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
    // Load .env before the subscriber reads RUST_LOG
    dotenv().ok();

    let args = Args::parse();
    init_logging(&args.log_level, args.quiet, args.json);

    if !args.delimiter.is_ascii() {
        return Err(anyhow!("Delimiter must be a single ASCII character"));
    }

    info!("Loading dataset from: {}", args.input);
    let data = load_table(&args.input, Some(args.delimiter as u8))?;

    let eda = EdaAnalyzer::new(data.clone());
    let report = eda.report(args.group_by.as_deref(), args.top_n)?;

    if let Some(ref output) = args.prepare_output {
        let config = PreparerConfig::builder()
            .missing_column_threshold(args.missing_col_threshold)
            .numeric_imputation(args.numeric_imputation.into())
            .build()?;
        let mut preparer = DataPreparer::with_config(data, config)?;
        preparer.prepare()?;
        for step in preparer.processing_steps() {
            info!("{}", step);
        }
        let mut prepared = preparer.into_inner();
        write_csv(&mut prepared, output)?;
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&args.input, &report);
    }

    Ok(())
}

/// Print the report for a human reader.
///
/// Uses `println!` intentionally: this is the primary output of the tool and
/// must stay visible regardless of log level.
fn print_report(input: &str, report: &EdaReport) {
    println!("\n{}", "=".repeat(80));
    println!("CLAIMS DATA ANALYSIS");
    println!("{}\n", "=".repeat(80));

    println!("DATASET OVERVIEW");
    println!("{}", "-".repeat(40));
    println!("  File: {}", input);
    println!("  Rows: {}", report.data_info.rows);
    println!("  Columns: {}", report.data_info.columns.len());
    println!();

    println!("{:<24} {:<14} {:<12} {:<10}", "Column", "Type", "Category", "Non-null");
    println!("{}", "-".repeat(62));
    for col in &report.data_info.columns {
        println!(
            "{:<24} {:<14} {:<12} {:<10}",
            truncate_str(&col.name, 23),
            truncate_str(&col.dtype, 13),
            col.category,
            col.non_null_count
        );
    }
    println!();

    println!("SUMMARY STATISTICS");
    println!("{}", "-".repeat(40));
    println!(
        "{:<24} {:>8} {:>12} {:>12} {:>12} {:>12}",
        "Column", "Count", "Mean", "Std", "Median", "Max"
    );
    for stats in &report.summary_statistics {
        println!(
            "{:<24} {:>8} {:>12} {:>12} {:>12} {:>12}",
            truncate_str(&stats.column, 23),
            stats.count,
            fmt_opt(stats.mean),
            fmt_opt(stats.std),
            fmt_opt(stats.median),
            fmt_opt(stats.max)
        );
    }
    println!();

    println!("MISSING VALUES");
    println!("{}", "-".repeat(40));
    let missing: Vec<_> = report
        .missing_values
        .iter()
        .filter(|m| m.missing_count > 0)
        .collect();
    if missing.is_empty() {
        println!("  No missing values");
    } else {
        for m in missing {
            println!(
                "  {:<24} {:>8} ({:.1}%)",
                truncate_str(&m.column, 23),
                m.missing_count,
                m.missing_percentage
            );
        }
    }
    println!();

    println!("LOSS RATIO");
    println!("{}", "-".repeat(40));
    println!("  Overall: {}", fmt_opt(report.loss_ratio));
    if let Some(ref groups) = report.loss_ratio_by_group {
        for g in groups {
            println!("  {:<24} {}", truncate_str(&g.group, 23), fmt_opt(g.loss_ratio));
        }
    }
    println!();

    if let Some(ref makes) = report.claims_by_make {
        println!("CLAIMS BY MAKE");
        println!("{}", "-".repeat(40));
        for m in makes {
            println!(
                "  {:<24} avg {:>12.2}  count {}",
                truncate_str(&m.make, 23),
                m.avg_claim_amount,
                m.count
            );
        }
        println!();
    }

    if let Some(ref trends) = report.temporal_trends {
        println!("MONTHLY TRENDS");
        println!("{}", "-".repeat(40));
        for t in trends {
            println!(
                "  {}  claims {:>14.2}  premium {:>14.2}  policies {:>6}  loss ratio {}",
                t.month,
                t.claims_sum,
                t.premium_sum,
                t.policy_count,
                fmt_opt(t.loss_ratio)
            );
        }
        println!();
    }

    for vc in &report.vehicle_characteristics {
        println!("VEHICLE: {}", vc.column);
        println!("{}", "-".repeat(40));
        for level in vc.levels.iter().take(10) {
            println!(
                "  {:<24} mean claim {:>12}  loss ratio {}",
                truncate_str(&level.level, 23),
                fmt_opt(level.claims_mean),
                fmt_opt(level.loss_ratio)
            );
        }
        println!();
    }
}

fn fmt_opt(value: Option<f64>) -> String {
    value.map_or_else(|| "n/a".to_string(), |v| format!("{:.4}", v))
}

fn truncate_str(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", truncated)
    }
}
