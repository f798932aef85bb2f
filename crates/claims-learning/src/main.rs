//! CLI entry point for claim risk modelling and premium pricing.

use anyhow::{Result, anyhow};
use clap::{Parser, ValueEnum};
use claims_learning::{
    PipelineConfig, PremiumParams, ProbabilityModelKind, RiskPricingPipeline, RiskPricingReport,
    SeverityModelKind,
};
use claims_processing::load_table;
use dotenv::dotenv;
use tracing::info;

/// CLI-compatible severity model enum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliSeverityModel {
    /// Ordinary least squares
    Linear,
    /// Bagged regression trees
    #[value(alias = "rf")]
    RandomForest,
    /// Gradient boosted trees
    #[value(alias = "xgboost")]
    GradientBoosting,
}

impl From<CliSeverityModel> for SeverityModelKind {
    fn from(cli: CliSeverityModel) -> Self {
        match cli {
            CliSeverityModel::Linear => SeverityModelKind::Linear,
            CliSeverityModel::RandomForest => SeverityModelKind::RandomForest,
            CliSeverityModel::GradientBoosting => SeverityModelKind::GradientBoosting,
        }
    }
}

/// CLI-compatible probability model enum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliProbabilityModel {
    /// Bagged classification trees
    #[value(alias = "rf")]
    RandomForest,
    /// Gradient boosted trees with log-loss
    #[value(alias = "xgboost")]
    GradientBoosting,
}

impl From<CliProbabilityModel> for ProbabilityModelKind {
    fn from(cli: CliProbabilityModel) -> Self {
        match cli {
            CliProbabilityModel::RandomForest => ProbabilityModelKind::RandomForest,
            CliProbabilityModel::GradientBoosting => ProbabilityModelKind::GradientBoosting,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Claim probability and severity models with risk-based pricing",
    long_about = "Prepares a claims extract, trains a claim probability classifier and a\n\
                  claim severity regressor, and prices the held-out policies as\n\
                  (P(claim) x severity + expense loading) x (1 + profit margin).\n\n\
                  EXAMPLES:\n  \
                  # Default models (gradient boosting for both)\n  \
                  claims-risk -i MachineLearningRating_v3.txt\n\n  \
                  # Random forest severity, custom loadings, JSON report\n  \
                  claims-risk -i data.csv --severity-model random-forest --expense-loading 300 --json"
)]
struct Args {
    /// Path to the claims file (.csv, .tsv, .txt or .parquet)
    #[arg(short, long)]
    input: String,

    /// Field delimiter for .txt files
    #[arg(long, default_value = "|")]
    delimiter: char,

    /// Column holding the claim amount
    #[arg(long, default_value = "TotalClaims")]
    claim_column: String,

    /// Severity model family
    #[arg(long, value_enum, default_value = "gradient-boosting")]
    severity_model: CliSeverityModel,

    /// Claim probability model family
    #[arg(long, value_enum, default_value = "gradient-boosting")]
    probability_model: CliProbabilityModel,

    /// Fraction of rows held out for evaluation and pricing (0.0 - 1.0)
    #[arg(long, default_value = "0.2")]
    test_size: f64,

    /// Random seed for the split and the tree ensembles
    #[arg(long, default_value = "42")]
    seed: u64,

    /// Flat expense amount added to every premium
    #[arg(long, default_value = "500")]
    expense_loading: f64,

    /// Proportional profit margin
    #[arg(long, default_value = "0.1")]
    profit_margin: f64,

    /// Skip SHAP feature ranking
    #[arg(long)]
    no_shap: bool,

    /// Maximum test rows used for SHAP
    #[arg(long, default_value = "100")]
    shap_samples: u32,

    /// Output JSON to stdout instead of human-readable summary
    ///
    /// Disables all progress logs; only outputs the final JSON report.
    #[arg(long)]
    json: bool,

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
    dotenv().ok();

    let args = Args::parse();
    init_logging(&args.log_level, args.quiet, args.json);

    if !args.delimiter.is_ascii() {
        return Err(anyhow!("Delimiter must be a single ASCII character"));
    }

    info!("Loading dataset from: {}", args.input);
    let data = load_table(&args.input, Some(args.delimiter as u8))?;

    let config = PipelineConfig::builder()
        .claim_column(args.claim_column.as_str())
        .severity_model(args.severity_model.into())
        .probability_model(args.probability_model.into())
        .test_size(args.test_size)
        .random_seed(args.seed)
        .premium(PremiumParams {
            expense_loading: args.expense_loading,
            profit_margin: args.profit_margin,
        })
        .enable_explainability(!args.no_shap)
        .shap_max_samples(args.shap_samples)
        .build()?;

    let mut pipeline = RiskPricingPipeline::builder().config(config).build()?;
    let report = pipeline.run(data)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&args.input, &report);
    }

    Ok(())
}

/// Print the report for a human reader.
fn print_report(input: &str, report: &RiskPricingReport) {
    println!("\n{}", "=".repeat(80));
    println!("CLAIM RISK PRICING");
    println!("{}\n", "=".repeat(80));

    println!("DATA");
    println!("{}", "-".repeat(40));
    println!("  File: {}", input);
    println!("  Rows: {}", report.n_rows);
    println!("  Features: {}", report.feature_names.len());
    println!("  Train / test: {} / {}", report.train_rows, report.test_rows);
    println!("  Train claim rate: {:.2}%", report.train_claim_rate * 100.0);
    println!();

    let pm = &report.probability_metrics;
    println!("CLAIM PROBABILITY ({})", report.probability_model);
    println!("{}", "-".repeat(40));
    println!("  Accuracy:  {:.4}", pm.accuracy);
    println!("  Precision: {:.4}", pm.precision);
    println!("  Recall:    {:.4}", pm.recall);
    println!("  F1:        {:.4}", pm.f1);
    println!("  ROC-AUC (labels): {}", fmt_opt(pm.roc_auc));
    println!("  ROC-AUC (scores): {}", fmt_opt(report.probability_roc_auc));
    println!();

    println!("CLAIM SEVERITY ({})", report.severity_model);
    println!("{}", "-".repeat(40));
    println!("  Trained on {} rows with a claim", report.severity_train_rows);
    match report.severity_metrics {
        Some(m) => {
            println!("  RMSE: {:.2}", m.rmse);
            println!("  MAE:  {:.2}", m.mae);
            println!("  R2:   {:.4}", m.r2);
        }
        None => println!("  Not evaluated: no test rows with a claim"),
    }
    println!();

    let ps = &report.premium_summary;
    println!("PREMIUMS");
    println!("{}", "-".repeat(40));
    println!(
        "  Expense loading {:.2}, profit margin {:.1}%",
        report.premium_params.expense_loading,
        report.premium_params.profit_margin * 100.0
    );
    println!("  Policies priced: {}", ps.count);
    println!("  Total: {:.2}", ps.total);
    println!("  Mean:  {}", fmt_opt(ps.mean));
    println!("  Min:   {}", fmt_opt(ps.min));
    println!("  Max:   {}", fmt_opt(ps.max));
    println!();

    if let Some(ref shap) = report.shap_summary {
        println!("SEVERITY DRIVERS (mean |SHAP|, {} rows)", shap.n_samples);
        println!("{}", "-".repeat(40));
        for fi in shap.top(10) {
            println!("  {:<32} {:>14.4}", truncate_str(&fi.feature, 31), fi.mean_abs_shap);
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
