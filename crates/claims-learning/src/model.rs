//! Model families behind a common interface, and the fitted-state machine.
//!
//! Every family ([`LinearRegression`], [`RandomForest`], [`GradientBoosting`])
//! implements [`Predictor`]. A fitted model is stored as a [`FittedModel`]
//! variant, so the severity and probability wrappers dispatch without
//! knowing which family was chosen.
//!
//! # Lifecycle
//!
//! ```text
//! Unfitted ──train()──► Fitted ──train()──► Fitted (previous state replaced)
//! ```
//!
//! [`ModelState::fitted`] is the single gate that turns use-before-train into
//! [`LearningError::NotFitted`].

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::ensemble::{GradientBoosting, RandomForest};
use crate::error::{LearningError, Result};
use crate::explain::ShapValues;
use crate::linear::LinearRegression;
use crate::matrix::FeatureMatrix;

/// Operations shared by every fitted model family.
pub trait Predictor {
    /// One output per row: amounts for regression, probabilities for the
    /// classifiers.
    fn predict(&self, x: &FeatureMatrix) -> Vec<f64>;

    /// SHAP attributions whose base value is [`expected_value`](Self::expected_value).
    fn explain(&self, x: &FeatureMatrix) -> ShapValues;

    /// Expected output in the space [`explain`](Self::explain) attributes.
    fn expected_value(&self) -> f64;
}

impl Predictor for LinearRegression {
    fn predict(&self, x: &FeatureMatrix) -> Vec<f64> {
        LinearRegression::predict(self, x)
    }

    fn explain(&self, x: &FeatureMatrix) -> ShapValues {
        LinearRegression::explain(self, x)
    }

    fn expected_value(&self) -> f64 {
        LinearRegression::expected_value(self)
    }
}

impl Predictor for RandomForest {
    fn predict(&self, x: &FeatureMatrix) -> Vec<f64> {
        RandomForest::predict(self, x)
    }

    fn explain(&self, x: &FeatureMatrix) -> ShapValues {
        RandomForest::explain(self, x)
    }

    fn expected_value(&self) -> f64 {
        RandomForest::expected_value(self)
    }
}

/// Boosted models attribute the raw margin (log-odds for the logistic
/// objective) while `predict` returns the transformed output.
impl Predictor for GradientBoosting {
    fn predict(&self, x: &FeatureMatrix) -> Vec<f64> {
        GradientBoosting::predict(self, x)
    }

    fn explain(&self, x: &FeatureMatrix) -> ShapValues {
        GradientBoosting::explain(self, x)
    }

    fn expected_value(&self) -> f64 {
        GradientBoosting::expected_value(self)
    }
}

/// A fitted model of one of the supported families.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "family", rename_all = "snake_case")]
pub enum FittedModel {
    Linear(LinearRegression),
    RandomForest(RandomForest),
    GradientBoosting(GradientBoosting),
}

impl FittedModel {
    fn as_predictor(&self) -> &dyn Predictor {
        match self {
            FittedModel::Linear(m) => m,
            FittedModel::RandomForest(m) => m,
            FittedModel::GradientBoosting(m) => m,
        }
    }
}

impl Predictor for FittedModel {
    fn predict(&self, x: &FeatureMatrix) -> Vec<f64> {
        self.as_predictor().predict(x)
    }

    fn explain(&self, x: &FeatureMatrix) -> ShapValues {
        self.as_predictor().explain(x)
    }

    fn expected_value(&self) -> f64 {
        self.as_predictor().expected_value()
    }
}

/// Fitted parameters plus the feature columns they were fitted on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedArtifact {
    pub feature_names: Vec<String>,
    pub model: FittedModel,
}

impl FittedArtifact {
    /// Reject matrices whose columns differ from the training columns.
    pub fn check(&self, x: &FeatureMatrix) -> Result<()> {
        x.check_features(&self.feature_names)
    }
}

/// `{Unfitted, Fitted}` lifecycle of a model wrapper.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub enum ModelState {
    #[default]
    Unfitted,
    Fitted(FittedArtifact),
}

impl ModelState {
    pub fn is_fitted(&self) -> bool {
        matches!(self, ModelState::Fitted(_))
    }

    /// The fitted artifact, or `NotFitted` naming `operation`.
    pub fn fitted(&self, operation: &str) -> Result<&FittedArtifact> {
        match self {
            ModelState::Fitted(artifact) => Ok(artifact),
            ModelState::Unfitted => Err(LearningError::NotFitted(operation.to_string())),
        }
    }

    /// Move to `Fitted`, discarding any previous fit.
    pub(crate) fn replace(&mut self, artifact: FittedArtifact, model_name: &str) {
        if self.is_fitted() {
            warn!(
                "Re-training {} model: previously fitted state is discarded",
                model_name
            );
        }
        *self = ModelState::Fitted(artifact);
    }
}
