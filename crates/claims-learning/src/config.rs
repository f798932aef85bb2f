//! Configuration types for model training and risk pricing.
//!
//! This module provides the model-family enums ([`SeverityModelKind`],
//! [`ProbabilityModelKind`]), the hyper-parameter structs for the tree
//! ensembles, and [`PipelineConfig`] with its builder.
//!
//! # Example
//!
//! ```
//! use claims_learning::{PipelineConfig, SeverityModelKind};
//!
//! let config = PipelineConfig::builder()
//!     .claim_column("TotalClaims")
//!     .severity_model(SeverityModelKind::RandomForest)
//!     .test_size(0.25)
//!     .build()
//!     .expect("valid config");
//! ```

use std::fmt;
use std::str::FromStr;

use claims_processing::PreparerConfig;
use serde::{Deserialize, Serialize};

use crate::error::LearningError;
use crate::premium::PremiumParams;

/// Model family used to predict claim severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeverityModelKind {
    /// Ordinary least squares with an intercept.
    Linear,
    /// Bagged, fully grown regression trees.
    RandomForest,
    /// Gradient-boosted trees on squared error.
    #[default]
    GradientBoosting,
}

impl SeverityModelKind {
    /// Short tag for the model family.
    ///
    /// ```
    /// use claims_learning::SeverityModelKind;
    ///
    /// assert_eq!(SeverityModelKind::GradientBoosting.as_str(), "xgboost");
    /// assert_eq!("rf".parse::<SeverityModelKind>().unwrap(), SeverityModelKind::RandomForest);
    /// ```
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            SeverityModelKind::Linear => "linear",
            SeverityModelKind::RandomForest => "rf",
            SeverityModelKind::GradientBoosting => "xgboost",
        }
    }
}

impl fmt::Display for SeverityModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SeverityModelKind {
    type Err = LearningError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "linear" => Ok(Self::Linear),
            "rf" | "random_forest" | "random-forest" => Ok(Self::RandomForest),
            "xgboost" | "gradient_boosting" | "gradient-boosting" => Ok(Self::GradientBoosting),
            other => Err(LearningError::InvalidConfig(format!(
                "unknown severity model '{}': expected one of linear, rf, xgboost",
                other
            ))),
        }
    }
}

/// Model family used to predict whether a claim occurs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbabilityModelKind {
    /// Bagged classification trees; probability is the mean leaf positive rate.
    RandomForest,
    /// Gradient-boosted trees on log-loss.
    #[default]
    GradientBoosting,
}

impl ProbabilityModelKind {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ProbabilityModelKind::RandomForest => "rf",
            ProbabilityModelKind::GradientBoosting => "xgboost",
        }
    }
}

impl fmt::Display for ProbabilityModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProbabilityModelKind {
    type Err = LearningError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rf" | "random_forest" | "random-forest" => Ok(Self::RandomForest),
            "xgboost" | "gradient_boosting" | "gradient-boosting" => Ok(Self::GradientBoosting),
            other => Err(LearningError::InvalidConfig(format!(
                "unknown probability model '{}': expected one of rf, xgboost",
                other
            ))),
        }
    }
}

/// Number of features tried at each split of a forest tree.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaxFeatures {
    All,
    Sqrt,
    Count(usize),
    /// Fraction of the features, in (0, 1].
    Fraction(f64),
}

impl MaxFeatures {
    /// Resolve to a feature count in `1..=n_features`.
    pub fn resolve(&self, n_features: usize) -> usize {
        let n = match *self {
            MaxFeatures::All => n_features,
            MaxFeatures::Sqrt => (n_features as f64).sqrt().floor() as usize,
            MaxFeatures::Count(k) => k,
            MaxFeatures::Fraction(f) => (f * n_features as f64).floor() as usize,
        };
        n.clamp(1, n_features.max(1))
    }

    fn validate(&self) -> Result<(), LearningError> {
        match *self {
            MaxFeatures::Count(0) => Err(LearningError::InvalidConfig(
                "max_features count must be at least 1".to_string(),
            )),
            MaxFeatures::Fraction(f) if !(f > 0.0 && f <= 1.0) => {
                Err(LearningError::InvalidConfig(format!(
                    "max_features fraction must be in (0.0, 1.0], got {}",
                    f
                )))
            }
            _ => Ok(()),
        }
    }
}

/// Random forest hyper-parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForestParams {
    /// Number of trees (default: 100).
    pub n_trees: usize,
    /// Depth limit; `None` grows until leaves are pure (default).
    pub max_depth: Option<usize>,
    /// Minimum rows needed to split a node (default: 2).
    pub min_samples_split: usize,
    /// Minimum rows in each child (default: 1).
    pub min_samples_leaf: usize,
    /// Features tried per split. `None` means all features for regression
    /// and `Sqrt` for classification.
    pub max_features: Option<MaxFeatures>,
    /// Draw a bootstrap sample of rows for every tree (default: true).
    pub bootstrap: bool,
    pub seed: u64,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_trees: 100,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
            bootstrap: true,
            seed: 42,
        }
    }
}

impl ForestParams {
    pub fn validate(&self) -> Result<(), LearningError> {
        if self.n_trees == 0 {
            return Err(LearningError::InvalidConfig(
                "n_trees must be at least 1".to_string(),
            ));
        }
        if self.max_depth == Some(0) {
            return Err(LearningError::InvalidConfig(
                "forest max_depth must be at least 1".to_string(),
            ));
        }
        if self.min_samples_split < 2 {
            return Err(LearningError::InvalidConfig(
                "min_samples_split must be at least 2".to_string(),
            ));
        }
        if self.min_samples_leaf == 0 {
            return Err(LearningError::InvalidConfig(
                "min_samples_leaf must be at least 1".to_string(),
            ));
        }
        if let Some(max_features) = &self.max_features {
            max_features.validate()?;
        }
        Ok(())
    }
}

/// Gradient boosting hyper-parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoostingParams {
    /// Boosting rounds (default: 100).
    pub n_rounds: usize,
    /// Shrinkage applied to every tree (default: 0.3).
    pub learning_rate: f64,
    /// Depth limit per tree (default: 6).
    pub max_depth: usize,
    /// L2 penalty on leaf weights (default: 1.0).
    pub reg_lambda: f64,
    /// Minimum loss reduction to split (default: 0.0).
    pub gamma: f64,
    /// Minimum hessian sum per child (default: 1.0).
    pub min_child_weight: f64,
    /// Row fraction sampled per round (default: 1.0).
    pub subsample: f64,
    pub seed: u64,
}

impl Default for BoostingParams {
    fn default() -> Self {
        Self {
            n_rounds: 100,
            learning_rate: 0.3,
            max_depth: 6,
            reg_lambda: 1.0,
            gamma: 0.0,
            min_child_weight: 1.0,
            subsample: 1.0,
            seed: 42,
        }
    }
}

impl BoostingParams {
    pub fn validate(&self) -> Result<(), LearningError> {
        if self.n_rounds == 0 {
            return Err(LearningError::InvalidConfig(
                "n_rounds must be at least 1".to_string(),
            ));
        }
        if !(self.learning_rate > 0.0 && self.learning_rate <= 1.0) {
            return Err(LearningError::InvalidConfig(format!(
                "learning_rate must be in (0.0, 1.0], got {}",
                self.learning_rate
            )));
        }
        if self.max_depth == 0 {
            return Err(LearningError::InvalidConfig(
                "boosting max_depth must be at least 1".to_string(),
            ));
        }
        for (name, value) in [
            ("reg_lambda", self.reg_lambda),
            ("gamma", self.gamma),
            ("min_child_weight", self.min_child_weight),
        ] {
            if !(value >= 0.0 && value.is_finite()) {
                return Err(LearningError::InvalidConfig(format!(
                    "{} must be a non-negative number, got {}",
                    name, value
                )));
            }
        }
        if !(self.subsample > 0.0 && self.subsample <= 1.0) {
            return Err(LearningError::InvalidConfig(format!(
                "subsample must be in (0.0, 1.0], got {}",
                self.subsample
            )));
        }
        Ok(())
    }
}

/// Hyper-parameters for both tree ensembles.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub forest: ForestParams,
    pub boosting: BoostingParams,
}

impl ModelConfig {
    pub fn validate(&self) -> Result<(), LearningError> {
        self.forest.validate()?;
        self.boosting.validate()
    }
}

/// Configuration for the risk pricing pipeline.
///
/// Use [`PipelineConfig::builder()`] to construct a configuration with the
/// builder pattern.
///
/// # Validation
///
/// The builder validates the following constraints on
/// [`build()`](PipelineConfigBuilder::build):
/// - `claim_column` must not be empty
/// - `test_size` must be in range `(0.0, 1.0)` (exclusive)
/// - `shap_max_samples` must be at least 1
/// - model, premium and preparation settings must be valid
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Claim amount column (default: `TotalClaims`).
    ///
    /// `claim > 0` is the probability target; the amount on those rows is the
    /// severity target.
    pub claim_column: String,

    /// Columns never used as features (default: `PolicyID`,
    /// `UnderwrittenCoverID`).
    pub exclude_columns: Vec<String>,

    pub severity_model: SeverityModelKind,
    pub probability_model: ProbabilityModelKind,

    /// Ensemble hyper-parameters.
    pub models: ModelConfig,

    /// Fraction of rows held out for evaluation and pricing (default: 0.2).
    pub test_size: f64,

    /// Seed for the split and the ensembles (default: 42).
    pub random_seed: u64,

    /// Rank features by mean |SHAP| of the severity model (default: true).
    pub enable_explainability: bool,

    /// Maximum test rows used for SHAP computation (default: 100).
    pub shap_max_samples: u32,

    pub premium: PremiumParams,

    /// Table preparation settings.
    pub preparer: PreparerConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            claim_column: "TotalClaims".to_string(),
            exclude_columns: vec!["PolicyID".to_string(), "UnderwrittenCoverID".to_string()],
            severity_model: SeverityModelKind::default(),
            probability_model: ProbabilityModelKind::default(),
            models: ModelConfig::default(),
            test_size: 0.2,
            random_seed: 42,
            enable_explainability: true,
            shap_max_samples: 100,
            premium: PremiumParams::default(),
            preparer: PreparerConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Create a new builder for `PipelineConfig`.
    #[must_use]
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder::default()
    }

    /// Validate an existing configuration, e.g. one read from JSON.
    pub fn validate(&self) -> Result<(), LearningError> {
        if self.claim_column.trim().is_empty() {
            return Err(LearningError::InvalidConfig(
                "claim_column must not be empty".to_string(),
            ));
        }

        if self.test_size <= 0.0 || self.test_size >= 1.0 {
            return Err(LearningError::InvalidConfig(
                "test_size must be between 0.0 and 1.0 (exclusive)".to_string(),
            ));
        }

        if self.shap_max_samples == 0 {
            return Err(LearningError::InvalidConfig(
                "shap_max_samples must be at least 1".to_string(),
            ));
        }

        self.models.validate()?;
        self.premium.validate()?;
        self.preparer
            .validate()
            .map_err(|e| LearningError::InvalidConfig(e.to_string()))?;

        Ok(())
    }
}

/// Builder for [`PipelineConfig`].
///
/// Created via [`PipelineConfig::builder()`]. All setters return `self` to
/// allow method chaining.
#[derive(Debug, Clone, Default)]
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl PipelineConfigBuilder {
    /// Set the claim amount column.
    #[must_use]
    pub fn claim_column(mut self, column: impl Into<String>) -> Self {
        self.config.claim_column = column.into();
        self
    }

    /// Replace the excluded (identifier) columns.
    #[must_use]
    pub fn exclude_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.exclude_columns = columns.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn severity_model(mut self, kind: SeverityModelKind) -> Self {
        self.config.severity_model = kind;
        self
    }

    #[must_use]
    pub fn probability_model(mut self, kind: ProbabilityModelKind) -> Self {
        self.config.probability_model = kind;
        self
    }

    /// Set the ensemble hyper-parameters, including their seeds.
    #[must_use]
    pub fn models(mut self, models: ModelConfig) -> Self {
        self.config.models = models;
        self
    }

    /// Set the test size fraction (default: 0.2).
    ///
    /// [`build()`](Self::build) returns an error if `size <= 0.0` or
    /// `size >= 1.0`.
    #[must_use]
    pub fn test_size(mut self, size: f64) -> Self {
        self.config.test_size = size;
        self
    }

    /// Set the seed of the split and of both ensembles (default: 42).
    #[must_use]
    pub fn random_seed(mut self, seed: u64) -> Self {
        self.config.random_seed = seed;
        self.config.models.forest.seed = seed;
        self.config.models.boosting.seed = seed;
        self
    }

    /// Enable or disable SHAP ranking of the severity model (default: true).
    #[must_use]
    pub fn enable_explainability(mut self, enable: bool) -> Self {
        self.config.enable_explainability = enable;
        self
    }

    /// Set the maximum samples for SHAP computation (default: 100).
    #[must_use]
    pub fn shap_max_samples(mut self, samples: u32) -> Self {
        self.config.shap_max_samples = samples;
        self
    }

    #[must_use]
    pub fn premium(mut self, params: PremiumParams) -> Self {
        self.config.premium = params;
        self
    }

    #[must_use]
    pub fn preparer(mut self, config: PreparerConfig) -> Self {
        self.config.preparer = config;
        self
    }

    /// Build the configuration, validating all settings.
    ///
    /// # Errors
    ///
    /// Returns [`LearningError::InvalidConfig`] when any setting is out of
    /// range. See [`PipelineConfig`] for the checked constraints.
    pub fn build(self) -> Result<PipelineConfig, LearningError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
