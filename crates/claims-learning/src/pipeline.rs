//! End-to-end risk pricing.
//!
//! This module provides [`RiskPricingPipeline`] and its builder. A run takes a
//! raw claims table through these stages:
//!
//! 1. **Validation** - the claim column must exist
//! 2. **Preparation** - [`DataPreparer::prepare`] (vehicle age, imputation, encoding)
//! 3. **Features** - numeric columns minus the claim column and identifiers
//! 4. **Split** - seeded train/test partition
//! 5. **Probability** - classifier on `claim > 0`
//! 6. **Severity** - regressor on the rows with a claim
//! 7. **Pricing** - risk-based premium for every test row
//! 8. **Explainability** - severity features ranked by mean |SHAP| (optional)
//!
//! # Example
//!
//! ```no_run
//! use claims_learning::{PipelineConfig, RiskPricingPipeline};
//! use claims_processing::load_table;
//!
//! let df = load_table("MachineLearningRating_v3.txt", None)?;
//! let config = PipelineConfig::builder().claim_column("TotalClaims").build()?;
//!
//! let mut pipeline = RiskPricingPipeline::builder().config(config).build()?;
//! let report = pipeline.run(df)?;
//! println!("Mean premium: {:?}", report.premium_summary.mean);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use claims_processing::{DataPreparer, OneHotEncoder, SchemaCheck};
use polars::prelude::DataFrame;
use tracing::{debug, info, warn};

use crate::config::PipelineConfig;
use crate::error::{LearningError, Result, ResultExt};
use crate::matrix::{FeatureMatrix, numeric_feature_columns, target_from_frame};
use crate::metrics::roc_auc_score;
use crate::premium::price_portfolio;
use crate::probability::ClaimProbabilityModel;
use crate::severity::ClaimSeverityModel;
use crate::split::train_test_split;
use crate::types::{PremiumSummary, PricedPolicy, RiskPricingReport};

/// Trains the claim probability and severity models on one table and prices
/// the held-out policies.
///
/// Use [`RiskPricingPipeline::builder()`] to construct a pipeline. The fitted
/// models stay available after [`run()`](Self::run).
pub struct RiskPricingPipeline {
    config: PipelineConfig,
    probability: ClaimProbabilityModel,
    severity: ClaimSeverityModel,
    feature_names: Vec<String>,
    encoder: Option<OneHotEncoder>,
}

impl std::fmt::Debug for RiskPricingPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RiskPricingPipeline")
            .field("config", &self.config)
            .field("probability_fitted", &self.probability.is_fitted())
            .field("severity_fitted", &self.severity.is_fitted())
            .field("feature_names", &self.feature_names)
            .field("encoded_columns", &self.encoder.as_ref().map(|e| e.encoded_columns().len()))
            .finish()
    }
}

impl RiskPricingPipeline {
    /// Create a new builder for `RiskPricingPipeline`.
    #[must_use]
    pub fn builder() -> RiskPricingPipelineBuilder {
        RiskPricingPipelineBuilder::default()
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn probability_model(&self) -> &ClaimProbabilityModel {
        &self.probability
    }

    pub fn severity_model(&self) -> &ClaimSeverityModel {
        &self.severity
    }

    /// Feature columns of the last run, in matrix order.
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// Categorical encoding fitted during the last run.
    pub fn encoder(&self) -> Option<&OneHotEncoder> {
        self.encoder.as_ref()
    }

    /// Run all stages on `df`.
    ///
    /// # Errors
    ///
    /// - `MissingColumns` when the claim column is absent
    /// - `InvalidData` when no feature columns remain, the table is too small
    ///   to split, or no training row has a claim
    /// - any preparation or training error
    pub fn run(&mut self, df: DataFrame) -> Result<RiskPricingReport> {
        let claim_column = self.config.claim_column.clone();
        SchemaCheck::require(&df, &[claim_column.as_str()]).context("validating input table")?;

        info!("Preparing {} rows x {} columns", df.height(), df.width());
        let mut preparer = DataPreparer::with_config(df, self.config.preparer.clone())?;
        preparer.prepare().context("preparing table")?;
        let processing_steps = preparer.processing_steps().to_vec();
        self.encoder = preparer.encoder().cloned();
        let prepared = preparer.into_inner();

        let mut excluded = self.config.exclude_columns.clone();
        excluded.push(claim_column.clone());
        let feature_names = numeric_feature_columns(&prepared, &excluded);
        if feature_names.is_empty() {
            return Err(LearningError::InvalidData(
                "no numeric feature columns left after preparation".to_string(),
            ));
        }
        debug!("Features: {:?}", feature_names);

        let x = FeatureMatrix::from_frame(&prepared, &feature_names)?;
        let claims = target_from_frame(&prepared, &claim_column)?;
        let has_claim: Vec<f64> = claims
            .iter()
            .map(|&c| if c > 0.0 { 1.0 } else { 0.0 })
            .collect();

        let split = train_test_split(x.n_rows(), self.config.test_size, self.config.random_seed)?;
        let x_train = x.select_rows(&split.train);
        let x_test = x.select_rows(&split.test);
        let label_train = pick(&has_claim, &split.train);
        let label_test = pick(&has_claim, &split.test);
        info!(
            "Split {} rows into {} train / {} test",
            x.n_rows(),
            split.train.len(),
            split.test.len()
        );

        // Claim probability on every row
        let mut probability = ClaimProbabilityModel::with_config(
            self.config.probability_model,
            self.config.models.clone(),
        )?;
        probability
            .train(&x_train, &label_train)
            .context("training probability model")?;
        let proba_test = probability.predict_proba(&x_test)?;
        let labels_test = probability.predict(&x_test)?;
        let probability_metrics = probability.evaluate(&label_test, &labels_test)?;
        let probability_roc_auc = roc_auc_score(&label_test, &proba_test)?;

        // Claim severity on rows with a claim
        let severity_train_idx: Vec<usize> = split
            .train
            .iter()
            .copied()
            .filter(|&i| claims[i] > 0.0)
            .collect();
        if severity_train_idx.is_empty() {
            return Err(LearningError::InvalidData(format!(
                "no training rows with {} > 0 to fit the severity model",
                claim_column
            )));
        }
        let mut severity = ClaimSeverityModel::with_config(
            self.config.severity_model,
            self.config.models.clone(),
        )?;
        severity
            .train(&x.select_rows(&severity_train_idx), &pick(&claims, &severity_train_idx))
            .context("training severity model")?;

        let severity_test_idx: Vec<usize> = split
            .test
            .iter()
            .copied()
            .filter(|&i| claims[i] > 0.0)
            .collect();
        let severity_metrics = if severity_test_idx.is_empty() {
            warn!("No test rows with a claim; severity model is not evaluated");
            None
        } else {
            let predictions = severity.predict(&x.select_rows(&severity_test_idx))?;
            Some(severity.evaluate(&pick(&claims, &severity_test_idx), &predictions)?)
        };

        // Premiums for every held-out policy
        let severity_test = severity.predict(&x_test)?;
        let premiums = price_portfolio(&proba_test, &severity_test, &self.config.premium)?;
        let priced_policies: Vec<PricedPolicy> = split
            .test
            .iter()
            .zip(proba_test.iter().zip(&severity_test).zip(&premiums))
            .map(|(&row, ((&p, &s), &premium))| PricedPolicy {
                row,
                claim_probability: p,
                expected_severity: s,
                premium,
            })
            .collect();
        let premium_summary = PremiumSummary::from_premiums(&premiums);

        let shap_summary = if self.config.enable_explainability {
            let n = (self.config.shap_max_samples as usize).min(split.test.len());
            let sample = x_test.select_rows(&(0..n).collect::<Vec<_>>());
            let summary = severity.shap_summary(&sample)?.summary();
            if let Some(top) = summary.feature_importance.first() {
                info!(
                    "Top severity driver: {} (mean |SHAP| {:.4})",
                    top.feature, top.mean_abs_shap
                );
            }
            Some(summary)
        } else {
            None
        };

        let train_claim_rate =
            label_train.iter().sum::<f64>() / label_train.len().max(1) as f64;
        info!(
            "Priced {} policies, mean premium {:?}",
            premium_summary.count, premium_summary.mean
        );

        let report = RiskPricingReport {
            n_rows: x.n_rows(),
            feature_names: feature_names.clone(),
            train_rows: split.train.len(),
            test_rows: split.test.len(),
            train_claim_rate,
            severity_model: self.config.severity_model,
            probability_model: self.config.probability_model,
            probability_metrics,
            probability_roc_auc,
            severity_metrics,
            severity_train_rows: severity_train_idx.len(),
            premium_params: self.config.premium,
            premium_summary,
            priced_policies,
            shap_summary,
            processing_steps,
        };

        self.probability = probability;
        self.severity = severity;
        self.feature_names = feature_names;
        Ok(report)
    }
}

fn pick(values: &[f64], indices: &[usize]) -> Vec<f64> {
    indices.iter().map(|&i| values[i]).collect()
}

/// Builder for [`RiskPricingPipeline`].
#[derive(Debug, Default)]
pub struct RiskPricingPipelineBuilder {
    config: Option<PipelineConfig>,
}

impl RiskPricingPipelineBuilder {
    /// Set the pipeline configuration.
    #[must_use]
    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Build the pipeline.
    ///
    /// # Errors
    ///
    /// Returns [`LearningError::InvalidConfig`] if no configuration was
    /// provided or the configuration is invalid.
    pub fn build(self) -> Result<RiskPricingPipeline> {
        let config = self.config.ok_or_else(|| {
            LearningError::InvalidConfig("Pipeline config is required".to_string())
        })?;
        config.validate()?;

        Ok(RiskPricingPipeline {
            probability: ClaimProbabilityModel::new(config.probability_model),
            severity: ClaimSeverityModel::new(config.severity_model),
            config,
            feature_names: Vec::new(),
            encoder: None,
        })
    }
}
