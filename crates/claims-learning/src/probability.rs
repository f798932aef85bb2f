//! Claim probability: whether a policy produces a claim at all.

use tracing::info;

use crate::config::{MaxFeatures, ModelConfig, ProbabilityModelKind};
use crate::ensemble::{GradientBoosting, Objective, RandomForest};
use crate::error::{LearningError, Result};
use crate::explain::ShapValues;
use crate::matrix::FeatureMatrix;
use crate::metrics::classification_metrics;
use crate::model::{FittedArtifact, FittedModel, ModelState, Predictor};
use crate::types::ClassificationMetrics;

/// Probability at or above which a row is labelled as a claim.
pub const DECISION_THRESHOLD: f64 = 0.5;

/// Binary classifier for claim occurrence.
///
/// The boosted variant optimizes log-loss; the forest variant averages leaf
/// positive rates.
#[derive(Debug, Clone)]
pub struct ClaimProbabilityModel {
    kind: ProbabilityModelKind,
    params: ModelConfig,
    state: ModelState,
}

impl Default for ClaimProbabilityModel {
    fn default() -> Self {
        Self::new(ProbabilityModelKind::default())
    }
}

impl ClaimProbabilityModel {
    pub fn new(kind: ProbabilityModelKind) -> Self {
        Self {
            kind,
            params: ModelConfig::default(),
            state: ModelState::Unfitted,
        }
    }

    pub fn with_config(kind: ProbabilityModelKind, params: ModelConfig) -> Result<Self> {
        params.validate()?;
        Ok(Self {
            kind,
            params,
            state: ModelState::Unfitted,
        })
    }

    pub fn kind(&self) -> ProbabilityModelKind {
        self.kind
    }

    pub fn is_fitted(&self) -> bool {
        self.state.is_fitted()
    }

    pub fn state(&self) -> &ModelState {
        &self.state
    }

    pub fn feature_names(&self) -> Option<&[String]> {
        match &self.state {
            ModelState::Fitted(artifact) => Some(&artifact.feature_names),
            ModelState::Unfitted => None,
        }
    }

    /// Fit on 0/1 labels. Any other label value is `InvalidData`.
    pub fn train(&mut self, x: &FeatureMatrix, y: &[f64]) -> Result<()> {
        x.check_targets(y)?;
        if let Some(i) = y.iter().position(|&v| v != 0.0 && v != 1.0) {
            return Err(LearningError::InvalidData(format!(
                "claim labels must be 0 or 1, found {} at row {}",
                y[i], i
            )));
        }

        let model = match self.kind {
            ProbabilityModelKind::RandomForest => FittedModel::RandomForest(RandomForest::fit(
                x,
                y,
                &self.params.forest,
                MaxFeatures::Sqrt,
            )?),
            ProbabilityModelKind::GradientBoosting => {
                FittedModel::GradientBoosting(GradientBoosting::fit(
                    x,
                    y,
                    &self.params.boosting,
                    Objective::Logistic,
                )?)
            }
        };

        let positives = y.iter().filter(|&&v| v == 1.0).count();
        info!(
            "Trained {} probability model on {} rows ({} with claims)",
            self.kind,
            x.n_rows(),
            positives
        );

        self.state.replace(
            FittedArtifact {
                feature_names: x.feature_names().to_vec(),
                model,
            },
            "probability",
        );
        Ok(())
    }

    /// Probability of a claim per row, in [0, 1].
    pub fn predict_proba(&self, x: &FeatureMatrix) -> Result<Vec<f64>> {
        let artifact = self.state.fitted("predict_proba()")?;
        artifact.check(x)?;
        Ok(artifact
            .model
            .predict(x)
            .into_iter()
            .map(|p| p.clamp(0.0, 1.0))
            .collect())
    }

    /// Hard 0/1 labels: 1 when the probability is at least 0.5.
    pub fn predict(&self, x: &FeatureMatrix) -> Result<Vec<f64>> {
        let artifact = self.state.fitted("predict()")?;
        artifact.check(x)?;
        Ok(artifact
            .model
            .predict(x)
            .into_iter()
            .map(|p| if p >= DECISION_THRESHOLD { 1.0 } else { 0.0 })
            .collect())
    }

    /// Accuracy, precision, recall, F1 and ROC-AUC of hard labels.
    pub fn evaluate(&self, y_true: &[f64], y_pred: &[f64]) -> Result<ClassificationMetrics> {
        self.state.fitted("evaluate()")?;
        classification_metrics(y_true, y_pred)
    }

    /// Attributions in log-odds (boosting) or probability (forest) space.
    pub fn shap_summary(&self, x: &FeatureMatrix) -> Result<ShapValues> {
        let artifact = self.state.fitted("shap_summary()")?;
        artifact.check(x)?;
        Ok(artifact.model.explain(x))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BoostingParams, ForestParams};
    use crate::ensemble::sigmoid;

    fn data() -> (FeatureMatrix, Vec<f64>) {
        let rows: Vec<Vec<f64>> = (0..48)
            .map(|i| vec![(i % 8) as f64, ((i * 3) % 5) as f64])
            .collect();
        let y = rows.iter().map(|r| if r[0] >= 5.0 { 1.0 } else { 0.0 }).collect();
        (
            FeatureMatrix::from_rows(vec!["age".into(), "kw".into()], &rows).unwrap(),
            y,
        )
    }

    fn small_config() -> ModelConfig {
        ModelConfig {
            forest: ForestParams {
                n_trees: 25,
                ..ForestParams::default()
            },
            boosting: BoostingParams {
                n_rounds: 25,
                ..BoostingParams::default()
            },
        }
    }

    #[test]
    fn test_probabilities_in_unit_interval() {
        let (x, y) = data();
        for kind in [
            ProbabilityModelKind::RandomForest,
            ProbabilityModelKind::GradientBoosting,
        ] {
            let mut model = ClaimProbabilityModel::with_config(kind, small_config()).unwrap();
            model.train(&x, &y).unwrap();
            let proba = model.predict_proba(&x).unwrap();
            assert_eq!(proba.len(), x.n_rows());
            assert!(proba.iter().all(|p| (0.0..=1.0).contains(p)));
        }
    }

    #[test]
    fn test_labels_follow_threshold() {
        let (x, y) = data();
        let mut model =
            ClaimProbabilityModel::with_config(ProbabilityModelKind::GradientBoosting, small_config())
                .unwrap();
        model.train(&x, &y).unwrap();

        let proba = model.predict_proba(&x).unwrap();
        let labels = model.predict(&x).unwrap();
        for (p, l) in proba.iter().zip(&labels) {
            assert_eq!(*l, if *p >= 0.5 { 1.0 } else { 0.0 });
        }

        let metrics = model.evaluate(&y, &labels).unwrap();
        assert_eq!(metrics.accuracy, 1.0);
        assert_eq!(metrics.roc_auc, Some(1.0));
    }

    #[test]
    fn test_non_binary_labels_rejected() {
        let (x, mut y) = data();
        y[3] = 2.0;
        let mut model = ClaimProbabilityModel::default();
        let err = model.train(&x, &y).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_DATA");
        assert!(!model.is_fitted());
    }

    #[test]
    fn test_unfitted_model_rejects_use() {
        let (x, y) = data();
        let model = ClaimProbabilityModel::default();
        assert_eq!(model.predict(&x).unwrap_err().error_code(), "NOT_FITTED");
        assert_eq!(model.predict_proba(&x).unwrap_err().error_code(), "NOT_FITTED");
        assert_eq!(model.evaluate(&y, &y).unwrap_err().error_code(), "NOT_FITTED");
        assert_eq!(model.shap_summary(&x).unwrap_err().error_code(), "NOT_FITTED");
    }

    #[test]
    fn test_boosting_shap_is_in_log_odds() {
        let (x, y) = data();
        let mut model =
            ClaimProbabilityModel::with_config(ProbabilityModelKind::GradientBoosting, small_config())
                .unwrap();
        model.train(&x, &y).unwrap();

        let shap = model.shap_summary(&x).unwrap();
        let proba = model.predict_proba(&x).unwrap();
        for (i, p) in proba.iter().enumerate() {
            let margin = shap.base_value() + shap.sample(i).iter().sum::<f64>();
            assert!((sigmoid(margin) - p).abs() < 1e-9);
        }
    }

    #[test]
    fn test_forest_shap_is_in_probability_space() {
        let (x, y) = data();
        let mut model =
            ClaimProbabilityModel::with_config(ProbabilityModelKind::RandomForest, small_config())
                .unwrap();
        model.train(&x, &y).unwrap();

        let shap = model.shap_summary(&x).unwrap();
        assert!(shap.verify(&model.predict_proba(&x).unwrap(), 1e-9));
    }
}
