//! Integration tests for claims table processing.
//!
//! These tests load a pipe-delimited sample extract and run preparation and
//! exploratory analysis end to end.

use claims_processing::{
    DataPreparer, DtypeCategory, EdaAnalyzer, OneHotEncoder, PreparerConfig, ProcessingError,
    load_table,
};
use claims_processing::utils::{columns_of_category, series_to_f64, series_to_strings};
use polars::prelude::*;
use pretty_assertions::assert_eq;
use std::collections::BTreeSet;
use std::path::PathBuf;

// ============================================================================
// Helper Functions
// ============================================================================

fn fixtures_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn load_sample() -> DataFrame {
    load_table(fixtures_path().join("claims_sample.txt"), None).expect("Failed to load fixture")
}

fn column_sum(df: &DataFrame, name: &str) -> f64 {
    series_to_f64(df.column(name).unwrap().as_materialized_series())
        .unwrap()
        .into_iter()
        .flatten()
        .sum()
}

// ============================================================================
// Loading
// ============================================================================

#[test]
fn test_load_pipe_delimited_extract() {
    let df = load_sample();
    assert_eq!(df.shape(), (60, 17));
    assert_eq!(df.column("make").unwrap().null_count(), 2);
    assert_eq!(df.column("VehicleYear").unwrap().null_count(), 3);
}

// ============================================================================
// Preparation
// ============================================================================

#[test]
fn test_prepare_drops_sparse_columns() {
    let mut preparer = DataPreparer::new(load_sample());
    let df = preparer.prepare().unwrap();

    // Gender is 50% missing, CustomValueEstimate 60%
    assert!(df.column("Gender").is_err());
    assert!(df.column("CustomValueEstimate").is_err());
    assert!(df.column("TotalClaims").is_ok());
}

#[test]
fn test_prepare_leaves_no_missing_numeric_values() {
    let mut preparer = DataPreparer::new(load_sample());
    let df = preparer.prepare().unwrap();

    for name in columns_of_category(df, DtypeCategory::Numeric) {
        assert_eq!(
            df.column(&name).unwrap().null_count(),
            0,
            "column {} still has missing values",
            name
        );
    }
}

#[test]
fn test_prepare_preserves_present_values() {
    let original = load_sample();
    let premiums_before = series_to_f64(original.column("TotalPremium").unwrap().as_materialized_series()).unwrap();

    let mut preparer = DataPreparer::new(original);
    let df = preparer.prepare().unwrap();
    let premiums_after = series_to_f64(df.column("TotalPremium").unwrap().as_materialized_series()).unwrap();

    assert_eq!(premiums_before, premiums_after);
}

#[test]
fn test_prepare_derives_vehicle_age() {
    let mut preparer = DataPreparer::new(load_sample());
    let df = preparer.prepare().unwrap();

    let age = df.column("VehicleAge").unwrap();
    assert_eq!(age.dtype(), &DataType::Float64);
    assert_eq!(age.null_count(), 0);
    // First row: transaction 2014-10, vehicle year 2002
    assert_eq!(age.get(0).unwrap().try_extract::<f64>().unwrap(), 12.0);

    let month = df.column("TransactionMonth").unwrap();
    assert_eq!(month.dtype(), &DataType::Date);
    assert_eq!(month.null_count(), 1);
}

#[test]
fn test_prepare_encodes_k_minus_one_indicators() {
    let original = load_sample();
    let mut expected_levels = Vec::new();
    for name in ["Province", "VehicleType", "make", "bodytype"] {
        let levels: BTreeSet<String> =
            series_to_strings(original.column(name).unwrap().as_materialized_series())
                .unwrap()
                .into_iter()
                .map(|v| v.unwrap_or_else(|| "Unknown".to_string()))
                .collect();
        expected_levels.push((name, levels.len()));
    }

    let mut preparer = DataPreparer::new(original);
    let df = preparer.prepare().unwrap();

    assert!(columns_of_category(df, DtypeCategory::String).is_empty());
    for (name, k) in expected_levels {
        let prefix = format!("{}_", name);
        let indicators = df
            .get_column_names()
            .iter()
            .filter(|c| c.starts_with(&prefix))
            .count();
        assert_eq!(indicators, k - 1, "indicator count for {}", name);
    }
}

#[test]
fn test_processing_steps_recorded() {
    let mut preparer = DataPreparer::new(load_sample());
    preparer.prepare().unwrap();

    let steps = preparer.processing_steps();
    assert!(steps.iter().any(|s| s.contains("VehicleAge")));
    assert!(steps.iter().any(|s| s.contains("Gender")));
    assert!(steps.iter().any(|s| s.contains("Encoded 'make'")));
}

#[test]
fn test_encoder_reapplies_to_new_table() {
    let full = load_sample();
    let head = full.head(Some(20));

    let mut preparer = DataPreparer::new(full);
    preparer.handle_missing().unwrap();
    preparer.encode_categoricals().unwrap();
    let encoder: OneHotEncoder = preparer.encoder().unwrap().clone();

    let mut other = DataPreparer::new(head);
    other.handle_missing().unwrap();
    let mut head_prepared = other.into_inner();
    // Same columns must be present before applying the fitted encoder
    for name in ["Gender", "CustomValueEstimate"] {
        if head_prepared.column(name).is_ok() {
            head_prepared = head_prepared.drop(name).unwrap();
        }
    }
    let encoded = encoder.transform(&head_prepared).unwrap();

    assert_eq!(
        encoded.get_column_names(),
        preparer.frame().get_column_names()
    );
}

#[test]
fn test_custom_config_threshold() {
    let config = PreparerConfig::builder()
        .missing_column_threshold(0.55)
        .build()
        .unwrap();
    let mut preparer = DataPreparer::with_config(load_sample(), config).unwrap();
    let df = preparer.handle_missing().unwrap();

    // 50% missing survives a 55% threshold, 60% does not
    assert!(df.column("Gender").is_ok());
    assert!(df.column("CustomValueEstimate").is_err());
}

// ============================================================================
// Exploratory Analysis
// ============================================================================

#[test]
fn test_loss_ratio_matches_column_sums() {
    let df = load_sample();
    let expected = column_sum(&df, "TotalClaims") / column_sum(&df, "TotalPremium");

    let eda = EdaAnalyzer::new(df);
    let lr = eda.loss_ratio().unwrap().unwrap();
    assert!((lr - expected).abs() < 1e-12);
}

#[test]
fn test_loss_ratio_by_province_sorted() {
    let eda = EdaAnalyzer::new(load_sample());
    let rows = eda.loss_ratio_by("Province").unwrap();

    assert_eq!(rows.len(), 3);
    for pair in rows.windows(2) {
        assert!(pair[0].loss_ratio.unwrap() >= pair[1].loss_ratio.unwrap());
    }
}

#[test]
fn test_temporal_trends_skip_malformed_dates() {
    let eda = EdaAnalyzer::new(load_sample());
    let trends = eda.temporal_trends().unwrap();

    assert_eq!(trends.len(), 11);
    assert_eq!(trends[0].month, "2014-10");
    assert_eq!(trends[10].month, "2015-08");
    let counted: usize = trends.iter().map(|t| t.claims_count).sum();
    assert_eq!(counted, 59);
}

#[test]
fn test_claims_by_make_ranked() {
    let eda = EdaAnalyzer::new(load_sample());
    let makes = eda.claims_by_make(3).unwrap();

    assert_eq!(makes.len(), 3);
    assert!(makes[0].avg_claim_amount >= makes[1].avg_claim_amount);
    assert!(makes[1].avg_claim_amount >= makes[2].avg_claim_amount);
}

#[test]
fn test_vehicle_characteristics_cover_present_columns() {
    let eda = EdaAnalyzer::new(load_sample());
    let analysis = eda.vehicle_characteristics().unwrap();

    let columns: Vec<&str> = analysis.iter().map(|a| a.column.as_str()).collect();
    assert_eq!(
        columns,
        vec![
            "VehicleType",
            "make",
            "Model",
            "RegistrationYear",
            "Cylinders",
            "cubiccapacity",
            "kilowatts",
            "bodytype"
        ]
    );
}

#[test]
fn test_report_serializes_to_json() {
    let eda = EdaAnalyzer::new(load_sample());
    let report = eda.report(Some("Province"), 5).unwrap();

    let json = serde_json::to_value(&report).unwrap();
    assert!(json["loss_ratio"].is_number());
    assert_eq!(json["claims_by_make"].as_array().unwrap().len(), 5);
    assert_eq!(json["data_info"]["rows"], 60);
}

#[test]
fn test_missing_schema_error_serializes() {
    let df = df!["TotalClaims" => [1.0, 2.0]].unwrap();
    let err: ProcessingError = EdaAnalyzer::new(df).temporal_trends().unwrap_err();

    let json = serde_json::to_value(&err).unwrap();
    assert_eq!(json["code"], "MISSING_COLUMNS");
    assert!(json["message"].as_str().unwrap().contains("TransactionMonth"));
}
