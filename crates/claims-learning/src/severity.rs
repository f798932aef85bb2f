//! Claim severity: how large a claim is, given that it occurs.

use tracing::info;

use crate::config::{MaxFeatures, ModelConfig, SeverityModelKind};
use crate::ensemble::{GradientBoosting, Objective, RandomForest};
use crate::error::Result;
use crate::explain::ShapValues;
use crate::linear::LinearRegression;
use crate::matrix::FeatureMatrix;
use crate::metrics::regression_metrics;
use crate::model::{FittedArtifact, FittedModel, ModelState, Predictor};
use crate::types::RegressionMetrics;

/// Regressor for claim amounts.
///
/// # Example
///
/// ```
/// use claims_learning::{ClaimSeverityModel, FeatureMatrix, SeverityModelKind};
///
/// let x = FeatureMatrix::from_rows(
///     vec!["VehicleAge".to_string()],
///     &[vec![1.0], vec![5.0], vec![10.0], vec![15.0]],
/// )?;
/// let y = [1000.0, 1400.0, 1900.0, 2400.0];
///
/// let mut model = ClaimSeverityModel::new(SeverityModelKind::Linear);
/// model.train(&x, &y)?;
/// let predictions = model.predict(&x)?;
/// assert_eq!(predictions.len(), 4);
///
/// let metrics = model.evaluate(&y, &predictions)?;
/// assert!(metrics.r2 > 0.99);
/// # Ok::<(), claims_learning::LearningError>(())
/// ```
#[derive(Debug, Clone)]
pub struct ClaimSeverityModel {
    kind: SeverityModelKind,
    params: ModelConfig,
    state: ModelState,
}

impl Default for ClaimSeverityModel {
    fn default() -> Self {
        Self::new(SeverityModelKind::default())
    }
}

impl ClaimSeverityModel {
    /// Unfitted model with default hyper-parameters.
    pub fn new(kind: SeverityModelKind) -> Self {
        Self {
            kind,
            params: ModelConfig::default(),
            state: ModelState::Unfitted,
        }
    }

    /// Unfitted model with explicit hyper-parameters.
    pub fn with_config(kind: SeverityModelKind, params: ModelConfig) -> Result<Self> {
        params.validate()?;
        Ok(Self {
            kind,
            params,
            state: ModelState::Unfitted,
        })
    }

    pub fn kind(&self) -> SeverityModelKind {
        self.kind
    }

    pub fn is_fitted(&self) -> bool {
        self.state.is_fitted()
    }

    pub fn state(&self) -> &ModelState {
        &self.state
    }

    /// Training feature names, once fitted.
    pub fn feature_names(&self) -> Option<&[String]> {
        match &self.state {
            ModelState::Fitted(artifact) => Some(&artifact.feature_names),
            ModelState::Unfitted => None,
        }
    }

    /// Fit the selected regressor. A previous fit is replaced.
    pub fn train(&mut self, x: &FeatureMatrix, y: &[f64]) -> Result<()> {
        x.check_targets(y)?;

        let model = match self.kind {
            SeverityModelKind::Linear => FittedModel::Linear(LinearRegression::fit(x, y)?),
            SeverityModelKind::RandomForest => FittedModel::RandomForest(RandomForest::fit(
                x,
                y,
                &self.params.forest,
                MaxFeatures::All,
            )?),
            SeverityModelKind::GradientBoosting => {
                FittedModel::GradientBoosting(GradientBoosting::fit(
                    x,
                    y,
                    &self.params.boosting,
                    Objective::SquaredError,
                )?)
            }
        };

        info!(
            "Trained {} severity model on {} rows x {} features",
            self.kind,
            x.n_rows(),
            x.n_cols()
        );

        self.state.replace(
            FittedArtifact {
                feature_names: x.feature_names().to_vec(),
                model,
            },
            "severity",
        );
        Ok(())
    }

    /// Predicted claim amount per row.
    pub fn predict(&self, x: &FeatureMatrix) -> Result<Vec<f64>> {
        let artifact = self.state.fitted("predict()")?;
        artifact.check(x)?;
        Ok(artifact.model.predict(x))
    }

    /// RMSE, MAE and R² of `y_pred` against `y_true`.
    pub fn evaluate(&self, y_true: &[f64], y_pred: &[f64]) -> Result<RegressionMetrics> {
        self.state.fitted("evaluate()")?;
        regression_metrics(y_true, y_pred)
    }

    /// Per-row, per-feature attributions of the predicted amount.
    pub fn shap_summary(&self, x: &FeatureMatrix) -> Result<ShapValues> {
        let artifact = self.state.fitted("shap_summary()")?;
        artifact.check(x)?;
        Ok(artifact.model.explain(x))
    }
}
