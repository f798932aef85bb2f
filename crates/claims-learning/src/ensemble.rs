//! Tree ensembles: random forests and gradient-boosted trees.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::{BoostingParams, ForestParams, MaxFeatures};
use crate::error::Result;
use crate::explain::ShapValues;
use crate::matrix::FeatureMatrix;
use crate::tree::{GainParams, GrowerParams, Tree, TreeGrower, add_tree_contributions};

/// Probabilities are clamped away from 0 and 1 before taking log-odds.
const PROB_EPS: f64 = 1e-7;

/// Loss optimized by gradient boosting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Objective {
    /// `½ (y − ŷ)²`; the margin is the prediction.
    SquaredError,
    /// Binary log-loss; the margin is log-odds.
    Logistic,
}

impl Objective {
    /// Constant margin that minimizes the loss over `y`.
    pub fn base_score(&self, y: &[f64]) -> f64 {
        let mean = y.iter().sum::<f64>() / y.len().max(1) as f64;
        match self {
            Objective::SquaredError => mean,
            Objective::Logistic => {
                let p = mean.clamp(PROB_EPS, 1.0 - PROB_EPS);
                (p / (1.0 - p)).ln()
            }
        }
    }

    /// First and second derivatives of the loss at the current margins.
    pub fn gradients(&self, y: &[f64], margin: &[f64], grad: &mut [f64], hess: &mut [f64]) {
        match self {
            Objective::SquaredError => {
                for i in 0..y.len() {
                    grad[i] = margin[i] - y[i];
                    hess[i] = 1.0;
                }
            }
            Objective::Logistic => {
                for i in 0..y.len() {
                    let p = sigmoid(margin[i]);
                    grad[i] = p - y[i];
                    hess[i] = (p * (1.0 - p)).max(1e-16);
                }
            }
        }
    }

    /// Map a raw margin to the output scale.
    #[inline]
    pub fn transform(&self, margin: f64) -> f64 {
        match self {
            Objective::SquaredError => margin,
            Objective::Logistic => sigmoid(margin),
        }
    }
}

#[inline]
pub fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

fn normalized_importance(trees: &[Tree], n_features: usize) -> Vec<f64> {
    let mut importance = vec![0.0; n_features];
    for tree in trees {
        tree.add_gain_importance(&mut importance);
    }
    let total: f64 = importance.iter().sum();
    if total > 0.0 {
        importance.iter_mut().for_each(|v| *v /= total);
    }
    importance
}

// =============================================================================
// Random forest
// =============================================================================

/// Averaged ensemble of bootstrapped CART trees.
///
/// Trees are grown on squared error, so on 0/1 targets each leaf holds the
/// positive rate of its rows and the forest output is a probability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    trees: Vec<Tree>,
    n_features: usize,
}

impl RandomForest {
    /// Fit a forest. `default_max_features` applies when the params leave
    /// `max_features` unset.
    pub fn fit(
        x: &FeatureMatrix,
        y: &[f64],
        params: &ForestParams,
        default_max_features: MaxFeatures,
    ) -> Result<Self> {
        x.check_targets(y)?;
        params.validate()?;

        let n = x.n_rows();
        let max_features = params
            .max_features
            .unwrap_or(default_max_features)
            .resolve(x.n_cols());
        let grower = TreeGrower::new(GrowerParams {
            gain: GainParams {
                reg_lambda: 0.0,
                min_gain: 0.0,
                min_child_weight: params.min_samples_leaf as f64,
            },
            max_depth: params.max_depth,
            min_samples_split: params.min_samples_split,
            max_features: Some(max_features),
        });

        let grad: Vec<f64> = y.iter().map(|v| -v).collect();
        let hess = vec![1.0; n];
        let mut rng = StdRng::seed_from_u64(params.seed);

        let trees: Vec<Tree> = (0..params.n_trees)
            .map(|_| {
                let rows: Vec<usize> = if params.bootstrap {
                    (0..n).map(|_| rng.gen_range(0..n)).collect()
                } else {
                    (0..n).collect()
                };
                grower.grow(x, &grad, &hess, rows, &mut rng)
            })
            .collect();

        debug!(
            "Grew {} forest trees on {} rows ({} of {} features per split)",
            trees.len(),
            n,
            max_features,
            x.n_cols()
        );

        Ok(Self {
            trees,
            n_features: x.n_cols(),
        })
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn trees(&self) -> &[Tree] {
        &self.trees
    }

    pub fn predict_row(&self, row: &[f64]) -> f64 {
        self.trees.iter().map(|t| t.predict_row(row)).sum::<f64>() / self.trees.len() as f64
    }

    pub fn predict(&self, x: &FeatureMatrix) -> Vec<f64> {
        x.rows().map(|row| self.predict_row(row)).collect()
    }

    pub fn expected_value(&self) -> f64 {
        self.trees.iter().map(Tree::expected_value).sum::<f64>() / self.trees.len() as f64
    }

    /// TreeSHAP averaged over the trees.
    pub fn explain(&self, x: &FeatureMatrix) -> ShapValues {
        let scale = 1.0 / self.trees.len() as f64;
        let mut shap = ShapValues::new(x.feature_names().to_vec(), x.n_rows(), self.expected_value());
        for (i, row) in x.rows().enumerate() {
            let phi = shap.sample_mut(i);
            for tree in &self.trees {
                add_tree_contributions(tree, row, scale, phi);
            }
        }
        shap
    }

    /// Total split gain per feature, normalized to sum to 1.
    pub fn feature_importances(&self) -> Vec<f64> {
        normalized_importance(&self.trees, self.n_features)
    }
}

// =============================================================================
// Gradient boosting
// =============================================================================

/// Additive ensemble of shrunken trees fit to loss gradients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradientBoosting {
    objective: Objective,
    base_score: f64,
    trees: Vec<Tree>,
    n_features: usize,
}

impl GradientBoosting {
    pub fn fit(
        x: &FeatureMatrix,
        y: &[f64],
        params: &BoostingParams,
        objective: Objective,
    ) -> Result<Self> {
        x.check_targets(y)?;
        params.validate()?;

        let n = x.n_rows();
        let grower = TreeGrower::new(GrowerParams {
            gain: GainParams {
                reg_lambda: params.reg_lambda,
                min_gain: params.gamma,
                min_child_weight: params.min_child_weight,
            },
            max_depth: Some(params.max_depth),
            min_samples_split: 2,
            max_features: None,
        });

        let base_score = objective.base_score(y);
        let mut margin = vec![base_score; n];
        let mut grad = vec![0.0; n];
        let mut hess = vec![0.0; n];
        let mut rng = StdRng::seed_from_u64(params.seed);
        let sample_size = ((n as f64 * params.subsample).round() as usize).clamp(1, n);

        let mut trees = Vec::with_capacity(params.n_rounds);
        for _ in 0..params.n_rounds {
            objective.gradients(y, &margin, &mut grad, &mut hess);
            let rows = if sample_size < n {
                let mut rows = rand::seq::index::sample(&mut rng, n, sample_size).into_vec();
                rows.sort_unstable();
                rows
            } else {
                (0..n).collect()
            };

            let mut tree = grower.grow(x, &grad, &hess, rows, &mut rng);
            tree.scale(params.learning_rate);
            for (i, m) in margin.iter_mut().enumerate() {
                *m += tree.predict_row(x.row(i));
            }
            trees.push(tree);
        }

        debug!(
            "Boosted {} rounds on {} rows ({:?}, base score {:.6})",
            trees.len(),
            n,
            objective,
            base_score
        );

        Ok(Self {
            objective,
            base_score,
            trees,
            n_features: x.n_cols(),
        })
    }

    pub fn objective(&self) -> Objective {
        self.objective
    }

    pub fn base_score(&self) -> f64 {
        self.base_score
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn trees(&self) -> &[Tree] {
        &self.trees
    }

    /// Raw additive score before the objective's link function.
    pub fn predict_margin_row(&self, row: &[f64]) -> f64 {
        self.base_score + self.trees.iter().map(|t| t.predict_row(row)).sum::<f64>()
    }

    pub fn predict_margin(&self, x: &FeatureMatrix) -> Vec<f64> {
        x.rows().map(|row| self.predict_margin_row(row)).collect()
    }

    /// Predictions on the output scale (amounts or probabilities).
    pub fn predict(&self, x: &FeatureMatrix) -> Vec<f64> {
        x.rows()
            .map(|row| self.objective.transform(self.predict_margin_row(row)))
            .collect()
    }

    /// Expected margin over the training distribution.
    pub fn expected_value(&self) -> f64 {
        self.base_score + self.trees.iter().map(Tree::expected_value).sum::<f64>()
    }

    /// TreeSHAP in margin space, summed over the trees.
    pub fn explain(&self, x: &FeatureMatrix) -> ShapValues {
        let mut shap = ShapValues::new(x.feature_names().to_vec(), x.n_rows(), self.expected_value());
        for (i, row) in x.rows().enumerate() {
            let phi = shap.sample_mut(i);
            for tree in &self.trees {
                add_tree_contributions(tree, row, 1.0, phi);
            }
        }
        shap
    }

    /// Total split gain per feature, normalized to sum to 1.
    pub fn feature_importances(&self) -> Vec<f64> {
        normalized_importance(&self.trees, self.n_features)
    }
}
