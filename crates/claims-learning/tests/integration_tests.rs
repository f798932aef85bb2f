//! Integration tests for risk modelling and pricing.
//!
//! These tests run the full pipeline on a pipe-delimited sample extract with
//! 60 policies, 16 of which have a positive claim.

use claims_learning::{
    BoostingParams, ClaimProbabilityModel, ClaimSeverityModel, FeatureMatrix, ForestParams,
    LearningError, ModelConfig, PipelineConfig, PremiumParams, ProbabilityModelKind,
    RiskPricingPipeline, SeverityModelKind, calculate_risk_based_premium,
    numeric_feature_columns, price_portfolio, target_from_frame,
};
use claims_processing::{DataPreparer, load_table};
use polars::prelude::*;
use pretty_assertions::assert_eq;
use std::collections::BTreeSet;
use std::path::PathBuf;

// ============================================================================
// Helper Functions
// ============================================================================

fn load_sample() -> DataFrame {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/claims_sample.txt");
    load_table(path, None).expect("Failed to load fixture")
}

fn small_models() -> ModelConfig {
    ModelConfig {
        forest: ForestParams {
            n_trees: 15,
            max_depth: Some(6),
            ..ForestParams::default()
        },
        boosting: BoostingParams {
            n_rounds: 20,
            max_depth: 4,
            ..BoostingParams::default()
        },
    }
}

fn config(severity: SeverityModelKind, probability: ProbabilityModelKind) -> PipelineConfig {
    PipelineConfig::builder()
        .severity_model(severity)
        .probability_model(probability)
        .models(small_models())
        .shap_max_samples(10)
        .build()
        .expect("valid config")
}

fn run(config: PipelineConfig) -> claims_learning::RiskPricingReport {
    let mut pipeline = RiskPricingPipeline::builder()
        .config(config)
        .build()
        .expect("valid pipeline");
    pipeline.run(load_sample()).expect("pipeline run")
}

/// Prepared sample as a feature matrix plus the claim amounts.
fn prepared_matrix() -> (FeatureMatrix, Vec<f64>) {
    let mut preparer = DataPreparer::new(load_sample());
    preparer.prepare().unwrap();
    let df = preparer.into_inner();

    let exclude: Vec<String> = ["TotalClaims", "PolicyID", "UnderwrittenCoverID"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    let features = numeric_feature_columns(&df, &exclude);
    let x = FeatureMatrix::from_frame(&df, &features).unwrap();
    let y = target_from_frame(&df, "TotalClaims").unwrap();
    (x, y)
}

// ============================================================================
// Premium
// ============================================================================

#[test]
fn test_premium_formula() {
    let premium = calculate_risk_based_premium(0.1, 1000.0, 500.0, 0.1);
    assert!((premium - 605.0).abs() < 1e-9);

    let params = PremiumParams::default();
    let premiums = price_portfolio(&[0.1, 0.0], &[1000.0, 5000.0], &params).unwrap();
    assert!((premiums[0] - 605.0).abs() < 1e-9);
    assert!((premiums[1] - 550.0).abs() < 1e-9);
}

// ============================================================================
// Models on the prepared sample
// ============================================================================

#[test]
fn test_prepared_sample_features() {
    let (x, y) = prepared_matrix();
    assert_eq!(x.n_rows(), 60);
    assert_eq!(y.iter().filter(|&&c| c > 0.0).count(), 16);

    let names = x.feature_names();
    assert!(names.iter().any(|n| n == "VehicleAge"));
    assert!(names.iter().any(|n| n.starts_with("Province_")));
    assert!(!names.iter().any(|n| n == "TotalClaims" || n == "PolicyID"));
}

#[test]
fn test_severity_models_on_claim_rows() {
    let (x, y) = prepared_matrix();
    let rows: Vec<usize> = (0..y.len()).filter(|&i| y[i] > 0.0).collect();
    let x_pos = x.select_rows(&rows);
    let y_pos: Vec<f64> = rows.iter().map(|&i| y[i]).collect();

    for kind in [
        SeverityModelKind::Linear,
        SeverityModelKind::RandomForest,
        SeverityModelKind::GradientBoosting,
    ] {
        let mut model = ClaimSeverityModel::with_config(kind, small_models()).unwrap();
        model.train(&x_pos, &y_pos).unwrap();

        let pred = model.predict(&x_pos).unwrap();
        assert_eq!(pred.len(), 16);
        assert!(pred.iter().all(|p| p.is_finite()));

        let shap = model.shap_summary(&x_pos).unwrap();
        assert!(shap.verify(&pred, 1e-4), "{} SHAP does not add up", kind);
    }
}

#[test]
fn test_probability_models_on_all_rows() {
    let (x, y) = prepared_matrix();
    let labels: Vec<f64> = y.iter().map(|&c| if c > 0.0 { 1.0 } else { 0.0 }).collect();

    for kind in [
        ProbabilityModelKind::RandomForest,
        ProbabilityModelKind::GradientBoosting,
    ] {
        let mut model = ClaimProbabilityModel::with_config(kind, small_models()).unwrap();
        model.train(&x, &labels).unwrap();

        let proba = model.predict_proba(&x).unwrap();
        assert!(proba.iter().all(|p| (0.0..=1.0).contains(p)));

        let metrics = model.evaluate(&labels, &model.predict(&x).unwrap()).unwrap();
        assert_eq!(metrics.n_samples, 60);
        assert!(metrics.accuracy >= 0.0 && metrics.accuracy <= 1.0);
    }
}

// ============================================================================
// Pipeline
// ============================================================================

#[test]
fn test_pipeline_default_models() {
    let report = run(config(
        SeverityModelKind::GradientBoosting,
        ProbabilityModelKind::GradientBoosting,
    ));

    assert_eq!(report.n_rows, 60);
    assert_eq!(report.test_rows, 12);
    assert_eq!(report.train_rows, 48);
    assert_eq!(report.priced_policies.len(), 12);
    assert_eq!(report.premium_summary.count, 12);
    assert!(report.severity_train_rows > 0 && report.severity_train_rows <= 16);
    assert!(!report.processing_steps.is_empty());

    // Priced rows are distinct rows of the input table
    let rows: BTreeSet<usize> = report.priced_policies.iter().map(|p| p.row).collect();
    assert_eq!(rows.len(), 12);
    assert!(rows.iter().all(|&r| r < 60));

    for policy in &report.priced_policies {
        let expected = calculate_risk_based_premium(
            policy.claim_probability,
            policy.expected_severity,
            500.0,
            0.1,
        );
        assert!((policy.premium - expected).abs() < 1e-9);
    }

    let shap = report.shap_summary.as_ref().expect("explainability enabled");
    assert_eq!(shap.n_samples, 10);
    assert_eq!(shap.feature_importance.len(), report.feature_names.len());
    assert!(
        shap.feature_importance
            .windows(2)
            .all(|w| w[0].mean_abs_shap >= w[1].mean_abs_shap)
    );
}

#[test]
fn test_pipeline_forest_and_linear() {
    let report = run(config(SeverityModelKind::Linear, ProbabilityModelKind::RandomForest));
    assert_eq!(report.severity_model, SeverityModelKind::Linear);
    assert_eq!(report.probability_model, ProbabilityModelKind::RandomForest);
    assert!(
        report
            .priced_policies
            .iter()
            .all(|p| (0.0..=1.0).contains(&p.claim_probability))
    );

    let report = run(config(
        SeverityModelKind::RandomForest,
        ProbabilityModelKind::RandomForest,
    ));
    assert_eq!(report.priced_policies.len(), 12);
}

#[test]
fn test_pipeline_is_deterministic() {
    let a = run(config(
        SeverityModelKind::RandomForest,
        ProbabilityModelKind::GradientBoosting,
    ));
    let b = run(config(
        SeverityModelKind::RandomForest,
        ProbabilityModelKind::GradientBoosting,
    ));
    assert_eq!(a, b);
}

#[test]
fn test_pipeline_without_explainability() {
    let config = PipelineConfig::builder()
        .models(small_models())
        .enable_explainability(false)
        .premium(PremiumParams {
            expense_loading: 0.0,
            profit_margin: 0.0,
        })
        .build()
        .unwrap();
    let report = run(config);
    assert!(report.shap_summary.is_none());

    // Without loadings the premium is the expected loss
    for p in &report.priced_policies {
        assert!((p.premium - p.claim_probability * p.expected_severity).abs() < 1e-9);
    }
}

#[test]
fn test_report_serializes() {
    let report = run(config(SeverityModelKind::Linear, ProbabilityModelKind::GradientBoosting));
    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["severity_model"], "linear");
    assert_eq!(json["probability_model"], "gradient_boosting");
    assert_eq!(json["test_rows"], 12);
    assert!(json["premium_summary"]["mean"].is_number());
}

#[test]
fn test_pipeline_rejects_missing_claim_column() {
    let config = PipelineConfig::builder()
        .claim_column("ClaimAmount")
        .build()
        .unwrap();
    let mut pipeline = RiskPricingPipeline::builder().config(config).build().unwrap();
    let err = pipeline.run(load_sample()).unwrap_err();
    assert_eq!(err.error_code(), "MISSING_COLUMNS");
}

#[test]
fn test_invalid_config_rejected() {
    let err = PipelineConfig::builder().test_size(1.5).build().unwrap_err();
    assert!(matches!(err, LearningError::InvalidConfig(_)));

    let err = "svm".parse::<SeverityModelKind>().unwrap_err();
    assert_eq!(err.error_code(), "INVALID_CONFIG");
}
