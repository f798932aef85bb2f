//! Common types returned by the models and the risk pricing pipeline.
//!
//! # Overview
//!
//! - [`RegressionMetrics`]: Evaluation of the severity model
//! - [`ClassificationMetrics`]: Evaluation of the claim probability model
//! - [`PricedPolicy`] / [`PremiumSummary`]: Premiums for held-out policies
//! - [`RiskPricingReport`]: Complete result of
//!   [`RiskPricingPipeline::run()`](crate::RiskPricingPipeline::run)
//!
//! All types serialize to JSON, which is what the `claims-risk` binary prints
//! with `--json`.

use serde::{Deserialize, Serialize};

use crate::config::{ProbabilityModelKind, SeverityModelKind};
use crate::explain::ShapSummary;
use crate::premium::PremiumParams;

/// Regression quality on a set of predictions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub struct RegressionMetrics {
    /// Root mean squared error.
    pub rmse: f64,

    /// Mean absolute error.
    pub mae: f64,

    /// Coefficient of determination.
    ///
    /// When the true values are constant this is 1.0 for a perfect fit and
    /// 0.0 otherwise.
    pub r2: f64,

    pub n_samples: usize,
}

/// Binary classification quality on a set of hard predictions.
///
/// Precision, recall and F1 are 0.0 when their denominator is zero.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub struct ClassificationMetrics {
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,

    /// Area under the ROC curve of the *hard* labels.
    ///
    /// `None` when the true labels contain a single class. Use
    /// [`roc_auc_score`](crate::metrics::roc_auc_score) on probabilities for
    /// the threshold-free figure.
    pub roc_auc: Option<f64>,

    pub n_samples: usize,
}

/// Premium quoted for one held-out policy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricedPolicy {
    /// Row index in the input table.
    pub row: usize,
    pub claim_probability: f64,
    pub expected_severity: f64,
    pub premium: f64,
}

/// Aggregate of the quoted premiums.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PremiumSummary {
    pub count: usize,
    pub total: f64,
    pub mean: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl PremiumSummary {
    pub fn from_premiums(premiums: &[f64]) -> Self {
        let total: f64 = premiums.iter().sum();
        let count = premiums.len();
        Self {
            count,
            total,
            mean: (count > 0).then(|| total / count as f64),
            min: premiums.iter().copied().reduce(f64::min),
            max: premiums.iter().copied().reduce(f64::max),
        }
    }
}

/// Result of a risk pricing run.
///
/// Returned by [`RiskPricingPipeline::run()`](crate::RiskPricingPipeline::run).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub struct RiskPricingReport {
    /// Rows in the prepared table.
    pub n_rows: usize,

    /// Feature columns the models were trained on, in matrix order.
    pub feature_names: Vec<String>,

    pub train_rows: usize,
    pub test_rows: usize,

    /// Fraction of training rows with a positive claim.
    pub train_claim_rate: f64,

    pub severity_model: SeverityModelKind,
    pub probability_model: ProbabilityModelKind,

    /// Probability model on all test rows.
    pub probability_metrics: ClassificationMetrics,

    /// Threshold-free ROC-AUC of the predicted probabilities on test rows.
    pub probability_roc_auc: Option<f64>,

    /// Severity model on test rows with a positive claim.
    ///
    /// `None` when no test row has a claim.
    pub severity_metrics: Option<RegressionMetrics>,

    /// Severity training rows (positive claims only).
    pub severity_train_rows: usize,

    pub premium_params: PremiumParams,
    pub premium_summary: PremiumSummary,
    pub priced_policies: Vec<PricedPolicy>,

    /// Severity model features ranked by mean |SHAP| on test rows.
    ///
    /// `None` when explainability is disabled.
    pub shap_summary: Option<ShapSummary>,

    /// Human-readable log of the table preparation.
    pub processing_steps: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_premium_summary() {
        let summary = PremiumSummary::from_premiums(&[600.0, 700.0, 800.0]);
        assert_eq!(summary.count, 3);
        assert_eq!(summary.total, 2100.0);
        assert_eq!(summary.mean, Some(700.0));
        assert_eq!(summary.min, Some(600.0));
        assert_eq!(summary.max, Some(800.0));
    }

    #[test]
    fn test_empty_premium_summary() {
        let summary = PremiumSummary::from_premiums(&[]);
        assert_eq!(summary.count, 0);
        assert_eq!(summary.mean, None);
        assert_eq!(summary.max, None);
    }

    #[test]
    fn test_metrics_serialize() {
        let metrics = ClassificationMetrics {
            accuracy: 0.9,
            precision: 0.5,
            recall: 1.0,
            f1: 2.0 / 3.0,
            roc_auc: None,
            n_samples: 10,
        };
        let json = serde_json::to_value(metrics).unwrap();
        assert_eq!(json["accuracy"], 0.9);
        assert!(json["roc_auc"].is_null());
    }
}
