//! SHAP value container and feature ranking.
//!
//! [`ShapValues`] stores one attribution per sample and feature together with
//! the model's expected output, so that for every row
//! `base_value + Σ shap = model output`.

use serde::{Deserialize, Serialize};

/// Per-sample, per-feature SHAP contributions.
///
/// Layout is row-major `[samples × features]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShapValues {
    feature_names: Vec<String>,
    values: Vec<f64>,
    n_samples: usize,
    base_value: f64,
}

impl ShapValues {
    /// Create a container initialized to zeros.
    pub fn new(feature_names: Vec<String>, n_samples: usize, base_value: f64) -> Self {
        let values = vec![0.0; n_samples * feature_names.len()];
        Self {
            feature_names,
            values,
            n_samples,
            base_value,
        }
    }

    #[inline]
    pub fn n_samples(&self) -> usize {
        self.n_samples
    }

    #[inline]
    pub fn n_features(&self) -> usize {
        self.feature_names.len()
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// Expected model output, shared by all samples.
    #[inline]
    pub fn base_value(&self) -> f64 {
        self.base_value
    }

    #[inline]
    fn index(&self, sample: usize, feature: usize) -> usize {
        sample * self.n_features() + feature
    }

    #[inline]
    pub fn get(&self, sample: usize, feature: usize) -> f64 {
        self.values[self.index(sample, feature)]
    }

    #[inline]
    pub fn add(&mut self, sample: usize, feature: usize, delta: f64) {
        let idx = self.index(sample, feature);
        self.values[idx] += delta;
    }

    /// All contributions of one sample.
    pub fn sample(&self, sample: usize) -> &[f64] {
        let width = self.n_features();
        &self.values[sample * width..(sample + 1) * width]
    }

    pub(crate) fn sample_mut(&mut self, sample: usize) -> &mut [f64] {
        let width = self.n_features();
        &mut self.values[sample * width..(sample + 1) * width]
    }

    /// Check `base_value + Σ shap ≈ prediction` for every sample.
    pub fn verify(&self, predictions: &[f64], tolerance: f64) -> bool {
        if predictions.len() != self.n_samples {
            return false;
        }
        predictions.iter().enumerate().all(|(i, pred)| {
            let total = self.base_value + self.sample(i).iter().sum::<f64>();
            (total - pred).abs() <= tolerance
        })
    }

    /// Mean absolute contribution of every feature, in column order.
    pub fn mean_abs(&self) -> Vec<f64> {
        let mut means = vec![0.0; self.n_features()];
        if self.n_samples == 0 {
            return means;
        }
        for i in 0..self.n_samples {
            for (m, v) in means.iter_mut().zip(self.sample(i)) {
                *m += v.abs();
            }
        }
        means.iter_mut().for_each(|m| *m /= self.n_samples as f64);
        means
    }

    /// Features ranked by mean |SHAP|, most important first.
    pub fn summary(&self) -> ShapSummary {
        let mut feature_importance: Vec<FeatureImportance> = self
            .feature_names
            .iter()
            .zip(self.mean_abs())
            .map(|(feature, mean_abs_shap)| FeatureImportance {
                feature: feature.clone(),
                mean_abs_shap,
            })
            .collect();
        feature_importance.sort_by(|a, b| b.mean_abs_shap.total_cmp(&a.mean_abs_shap));

        ShapSummary {
            base_value: self.base_value,
            n_samples: self.n_samples,
            feature_importance,
        }
    }
}

/// One entry of a SHAP feature ranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureImportance {
    pub feature: String,
    pub mean_abs_shap: f64,
}

/// Global view of a set of SHAP values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShapSummary {
    pub base_value: f64,
    pub n_samples: usize,
    /// Sorted by `mean_abs_shap` descending.
    pub feature_importance: Vec<FeatureImportance>,
}

impl ShapSummary {
    /// The `n` most important features.
    pub fn top(&self, n: usize) -> &[FeatureImportance] {
        &self.feature_importance[..n.min(self.feature_importance.len())]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_values() -> ShapValues {
        let mut shap = ShapValues::new(vec!["a".into(), "b".into()], 2, 10.0);
        shap.add(0, 0, 1.0);
        shap.add(0, 1, -4.0);
        shap.add(1, 0, -1.0);
        shap.add(1, 1, 2.0);
        shap
    }

    #[test]
    fn test_layout() {
        let shap = sample_values();
        assert_eq!(shap.n_samples(), 2);
        assert_eq!(shap.n_features(), 2);
        assert_eq!(shap.sample(1), &[-1.0, 2.0]);
        assert_eq!(shap.get(0, 1), -4.0);
    }

    #[test]
    fn test_verify() {
        let shap = sample_values();
        assert!(shap.verify(&[7.0, 11.0], 1e-9));
        assert!(!shap.verify(&[7.0, 12.0], 1e-9));
        assert!(!shap.verify(&[7.0], 1e-9));
    }

    #[test]
    fn test_summary_ranks_by_mean_abs() {
        let summary = sample_values().summary();
        assert_eq!(summary.feature_importance[0].feature, "b");
        assert_eq!(summary.feature_importance[0].mean_abs_shap, 3.0);
        assert_eq!(summary.feature_importance[1].mean_abs_shap, 1.0);
        assert_eq!(summary.top(1).len(), 1);
        assert_eq!(summary.top(5).len(), 2);
    }
}
