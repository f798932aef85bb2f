//! Ordinary least squares regression.

use serde::{Deserialize, Serialize};

use crate::error::{LearningError, Result};
use crate::explain::ShapValues;
use crate::matrix::FeatureMatrix;

/// Relative ridge added to the normal equations so that constant or
/// collinear columns still give a solvable system.
const RIDGE: f64 = 1e-9;

/// Fitted linear model `y = intercept + Σ β_j x_j`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearRegression {
    intercept: f64,
    coefficients: Vec<f64>,
    feature_means: Vec<f64>,
}

impl LinearRegression {
    /// Fit by solving the normal equations on mean-centred features.
    pub fn fit(x: &FeatureMatrix, y: &[f64]) -> Result<Self> {
        x.check_targets(y)?;

        let p = x.n_cols();
        let n = x.n_rows() as f64;
        let feature_means = x.column_means();
        let y_mean = y.iter().sum::<f64>() / n;

        // Augmented [XᵀX | Xᵀy] on centred data
        let mut system = vec![vec![0.0; p + 1]; p];
        for (row, &target) in x.rows().zip(y) {
            let centred: Vec<f64> = row.iter().zip(&feature_means).map(|(v, m)| v - m).collect();
            let t = target - y_mean;
            for i in 0..p {
                for j in i..p {
                    system[i][j] += centred[i] * centred[j];
                }
                system[i][p] += centred[i] * t;
            }
        }
        for i in 0..p {
            for j in 0..i {
                system[i][j] = system[j][i];
            }
        }

        let trace: f64 = (0..p).map(|i| system[i][i]).sum();
        let ridge = RIDGE * (trace / p.max(1) as f64).max(1.0);
        for (i, row) in system.iter_mut().enumerate() {
            row[i] += ridge;
        }

        let coefficients = solve(system)?;
        let intercept = y_mean
            - coefficients
                .iter()
                .zip(&feature_means)
                .map(|(b, m)| b * m)
                .sum::<f64>();

        Ok(Self {
            intercept,
            coefficients,
            feature_means,
        })
    }

    pub fn intercept(&self) -> f64 {
        self.intercept
    }

    pub fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }

    #[inline]
    pub fn predict_row(&self, row: &[f64]) -> f64 {
        self.intercept
            + self
                .coefficients
                .iter()
                .zip(row)
                .map(|(b, v)| b * v)
                .sum::<f64>()
    }

    pub fn predict(&self, x: &FeatureMatrix) -> Vec<f64> {
        x.rows().map(|row| self.predict_row(row)).collect()
    }

    /// Prediction at the training feature means.
    pub fn expected_value(&self) -> f64 {
        self.predict_row(&self.feature_means)
    }

    /// Exact SHAP values under feature independence: `β_j (x_j − mean_j)`.
    pub fn explain(&self, x: &FeatureMatrix) -> ShapValues {
        let mut shap = ShapValues::new(
            x.feature_names().to_vec(),
            x.n_rows(),
            self.expected_value(),
        );
        for (i, row) in x.rows().enumerate() {
            for (j, phi) in shap.sample_mut(i).iter_mut().enumerate() {
                *phi = self.coefficients[j] * (row[j] - self.feature_means[j]);
            }
        }
        shap
    }
}

/// Solve an augmented `p × (p + 1)` system by Gaussian elimination with
/// partial pivoting.
fn solve(mut a: Vec<Vec<f64>>) -> Result<Vec<f64>> {
    let p = a.len();
    for col in 0..p {
        let pivot = (col..p)
            .max_by(|&r1, &r2| a[r1][col].abs().total_cmp(&a[r2][col].abs()))
            .unwrap_or(col);
        if a[pivot][col].abs() < f64::MIN_POSITIVE {
            return Err(LearningError::TrainingFailed(
                "normal equations are singular".to_string(),
            ));
        }
        a.swap(col, pivot);

        for r in col + 1..p {
            let factor = a[r][col] / a[col][col];
            if factor == 0.0 {
                continue;
            }
            for c in col..=p {
                a[r][c] -= factor * a[col][c];
            }
        }
    }

    let mut solution = vec![0.0; p];
    for i in (0..p).rev() {
        let tail: f64 = (i + 1..p).map(|j| a[i][j] * solution[j]).sum();
        solution[i] = (a[i][p] - tail) / a[i][i];
    }
    if solution.iter().any(|v| !v.is_finite()) {
        return Err(LearningError::TrainingFailed(
            "linear solve produced non-finite coefficients".to_string(),
        ));
    }
    Ok(solution)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matrix(names: &[&str], rows: &[Vec<f64>]) -> FeatureMatrix {
        FeatureMatrix::from_rows(names.iter().map(|s| s.to_string()).collect(), rows).unwrap()
    }

    #[test]
    fn test_recovers_exact_plane() {
        let rows: Vec<Vec<f64>> = (0..10)
            .map(|i| vec![i as f64, ((i * 3) % 7) as f64])
            .collect();
        let y: Vec<f64> = rows.iter().map(|r| 3.0 + 2.0 * r[0] - r[1]).collect();
        let model = LinearRegression::fit(&matrix(&["a", "b"], &rows), &y).unwrap();

        assert!((model.intercept() - 3.0).abs() < 1e-6);
        assert!((model.coefficients()[0] - 2.0).abs() < 1e-6);
        assert!((model.coefficients()[1] + 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_collinear_columns_still_predict() {
        let rows: Vec<Vec<f64>> = (0..6).map(|i| vec![i as f64, 2.0 * i as f64, 5.0]).collect();
        let y: Vec<f64> = (0..6).map(|i| 1.0 + i as f64).collect();
        let x = matrix(&["a", "a2", "const"], &rows);
        let model = LinearRegression::fit(&x, &y).unwrap();

        for (pred, target) in model.predict(&x).iter().zip(&y) {
            assert!((pred - target).abs() < 1e-6);
        }
        assert!(model.coefficients()[2].abs() < 1e-6);
    }

    #[test]
    fn test_shap_sums_to_prediction() {
        let rows = vec![vec![1.0, 4.0], vec![2.0, 1.0], vec![3.0, 3.0], vec![6.0, 0.0]];
        let y = vec![2.0, 3.0, 7.0, 8.0];
        let x = matrix(&["a", "b"], &rows);
        let model = LinearRegression::fit(&x, &y).unwrap();

        let shap = model.explain(&x);
        assert!(shap.verify(&model.predict(&x), 1e-9));

        let means = x.column_means();
        let expected = model.coefficients()[0] * (rows[0][0] - means[0]);
        assert!((shap.get(0, 0) - expected).abs() < 1e-12);
    }

    #[test]
    fn test_shape_mismatch() {
        let x = matrix(&["a"], &[vec![1.0], vec![2.0]]);
        let err = LinearRegression::fit(&x, &[1.0]).unwrap_err();
        assert_eq!(err.error_code(), "SHAPE_MISMATCH");
    }
}
