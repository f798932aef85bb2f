//! Dense numeric feature matrices.
//!
//! A [`FeatureMatrix`] is the fixed-width, row-major `f64` view of a prepared
//! claims table that every model trains and predicts on. Column names travel
//! with the data so a fitted model can reject a matrix whose columns differ
//! from the ones it was trained on.

use crate::error::{LearningError, Result};
use claims_processing::utils::{is_numeric_dtype, series_to_f64};
use polars::prelude::*;
use serde::{Deserialize, Serialize};

/// Row-major numeric matrix with named columns. Never contains NaN.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureMatrix {
    names: Vec<String>,
    data: Vec<f64>,
    n_rows: usize,
}

impl FeatureMatrix {
    /// Build a matrix from rows.
    ///
    /// Fails with `ShapeMismatch` when a row has the wrong width and with
    /// `InvalidData` when any value is NaN or infinite.
    pub fn from_rows(names: Vec<String>, rows: &[Vec<f64>]) -> Result<Self> {
        let width = names.len();
        let mut data = Vec::with_capacity(rows.len() * width);
        for (i, row) in rows.iter().enumerate() {
            if row.len() != width {
                return Err(LearningError::shape(
                    format!("{} values in row {}", width, i),
                    row.len(),
                ));
            }
            data.extend_from_slice(row);
        }
        Self::from_row_major(names, rows.len(), data)
    }

    /// Build a matrix from a flat row-major buffer.
    pub fn from_row_major(names: Vec<String>, n_rows: usize, data: Vec<f64>) -> Result<Self> {
        if data.len() != n_rows * names.len() {
            return Err(LearningError::shape(
                format!("{} x {} = {} values", n_rows, names.len(), n_rows * names.len()),
                data.len(),
            ));
        }
        if let Some(pos) = data.iter().position(|v| !v.is_finite()) {
            let col = &names[pos % names.len()];
            return Err(LearningError::InvalidData(format!(
                "non-finite value in column '{}' at row {}",
                col,
                pos / names.len()
            )));
        }
        Ok(Self {
            names,
            data,
            n_rows,
        })
    }

    /// Extract `columns` from a table.
    ///
    /// Every column must be numeric and free of missing values; prepare the
    /// table first.
    pub fn from_frame(df: &DataFrame, columns: &[String]) -> Result<Self> {
        let n_rows = df.height();
        let mut data = vec![0.0; n_rows * columns.len()];

        for (j, name) in columns.iter().enumerate() {
            let column = df
                .column(name)
                .map_err(|_| LearningError::FeatureMismatch(format!("column '{}' not found", name)))?;
            if !is_numeric_dtype(column.dtype()) {
                return Err(LearningError::InvalidData(format!(
                    "column '{}' has non-numeric type {}",
                    name,
                    column.dtype()
                )));
            }
            let values = series_to_f64(column.as_materialized_series())?;
            for (i, value) in values.into_iter().enumerate() {
                data[i * columns.len() + j] = value.ok_or_else(|| {
                    LearningError::InvalidData(format!(
                        "column '{}' has a missing value at row {}",
                        name, i
                    ))
                })?;
            }
        }

        Self::from_row_major(columns.to_vec(), n_rows, data)
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn n_cols(&self) -> usize {
        self.names.len()
    }

    pub fn feature_names(&self) -> &[String] {
        &self.names
    }

    pub fn is_empty(&self) -> bool {
        self.n_rows == 0
    }

    /// Row `i` as a slice.
    pub fn row(&self, i: usize) -> &[f64] {
        let width = self.n_cols();
        &self.data[i * width..(i + 1) * width]
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.data[row * self.n_cols() + col]
    }

    /// Iterate over rows.
    pub fn rows(&self) -> impl Iterator<Item = &[f64]> {
        (0..self.n_rows).map(move |i| self.row(i))
    }

    /// Mean of every column.
    pub fn column_means(&self) -> Vec<f64> {
        let mut means = vec![0.0; self.n_cols()];
        if self.n_rows == 0 {
            return means;
        }
        for row in self.rows() {
            for (m, v) in means.iter_mut().zip(row) {
                *m += v;
            }
        }
        means.iter_mut().for_each(|m| *m /= self.n_rows as f64);
        means
    }

    /// New matrix containing the given rows, in the given order.
    pub fn select_rows(&self, indices: &[usize]) -> Self {
        let mut data = Vec::with_capacity(indices.len() * self.n_cols());
        for &i in indices {
            data.extend_from_slice(self.row(i));
        }
        Self {
            names: self.names.clone(),
            data,
            n_rows: indices.len(),
        }
    }

    /// Check that `y` is a usable training target for this matrix.
    pub fn check_targets(&self, y: &[f64]) -> Result<()> {
        if y.len() != self.n_rows {
            return Err(LearningError::shape(
                format!("{} targets", self.n_rows),
                y.len(),
            ));
        }
        if self.n_rows == 0 {
            return Err(LearningError::InvalidData(
                "cannot train on zero rows".to_string(),
            ));
        }
        if let Some(i) = y.iter().position(|v| !v.is_finite()) {
            return Err(LearningError::InvalidData(format!(
                "non-finite target at row {}",
                i
            )));
        }
        Ok(())
    }

    /// Fail with `FeatureMismatch` unless the columns are exactly `expected`.
    pub fn check_features(&self, expected: &[String]) -> Result<()> {
        if self.names.as_slice() != expected {
            return Err(LearningError::FeatureMismatch(format!(
                "model was trained on {} features {:?}, got {} features {:?}",
                expected.len(),
                expected,
                self.names.len(),
                self.names
            )));
        }
        Ok(())
    }
}

/// Numeric columns of `df` usable as features, in table order.
///
/// Dates and strings are never features; names in `exclude` are skipped.
pub fn numeric_feature_columns(df: &DataFrame, exclude: &[String]) -> Vec<String> {
    df.get_columns()
        .iter()
        .filter(|col| is_numeric_dtype(col.dtype()))
        .map(|col| col.name().to_string())
        .filter(|name| !exclude.contains(name))
        .collect()
}

/// Read a target column as `f64` values; missing values are an error.
pub fn target_from_frame(df: &DataFrame, column: &str) -> Result<Vec<f64>> {
    let col = df.column(column).map_err(|_| {
        LearningError::Processing(claims_processing::ProcessingError::MissingColumns(vec![
            column.to_string(),
        ]))
    })?;
    series_to_f64(col.as_materialized_series())?
        .into_iter()
        .enumerate()
        .map(|(i, v)| {
            v.ok_or_else(|| {
                LearningError::InvalidData(format!("target '{}' is missing at row {}", column, i))
            })
        })
        .collect()
}
