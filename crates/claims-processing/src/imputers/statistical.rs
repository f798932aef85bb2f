//! Statistical imputation methods.
//!
//! Provides median and mean fills for numeric columns and constant fills for
//! categorical columns.

use crate::utils::{fill_numeric_nulls, fill_string_nulls, numeric_series};
use anyhow::Result;
use polars::prelude::*;

/// Statistical imputation methods for filling missing values.
pub struct StatisticalImputer;

impl StatisticalImputer {
    /// Apply median imputation for numeric columns.
    ///
    /// NaN counts as missing. Columns with no present values are left
    /// untouched.
    pub fn apply_numeric_median(
        df: &mut DataFrame,
        col_name: &str,
        processing_steps: &mut Vec<String>,
    ) -> Result<()> {
        if let Ok(col) = df.column(col_name) {
            let values = numeric_series(col.as_materialized_series())?;
            if let Some(median_val) = values.median() {
                Self::fill_with_value(df, &values, median_val, processing_steps, "median")?;
            }
        }
        Ok(())
    }

    /// Apply mean imputation for numeric columns.
    pub fn apply_numeric_mean(
        df: &mut DataFrame,
        col_name: &str,
        processing_steps: &mut Vec<String>,
    ) -> Result<()> {
        if let Ok(col) = df.column(col_name) {
            let values = numeric_series(col.as_materialized_series())?;
            if let Some(mean_val) = values.mean() {
                Self::fill_with_value(df, &values, mean_val, processing_steps, "mean")?;
            }
        }
        Ok(())
    }

    /// Apply constant imputation for categorical columns.
    ///
    /// Non-string columns (booleans) are cast to text before filling.
    pub fn apply_constant_imputation(
        df: &mut DataFrame,
        col_name: &str,
        fill: &str,
        processing_steps: &mut Vec<String>,
    ) -> Result<()> {
        if let Ok(column) = df.column(col_name) {
            let series = column.as_materialized_series();
            if series.null_count() == 0 {
                return Ok(());
            }
            let missing = series.null_count();
            let filled = fill_string_nulls(series, fill)?;
            df.replace(col_name, filled)?;

            processing_steps.push(format!(
                "Filled {} missing values in '{}' with constant value: '{}'",
                missing, col_name, fill
            ));
        }

        Ok(())
    }

    /// Fill a numeric column with a specific value.
    ///
    /// `series` is the NaN-cleaned column. Skips columns that have nothing to
    /// fill so integer columns keep their dtype when complete.
    fn fill_with_value(
        df: &mut DataFrame,
        series: &Series,
        fill_value: f64,
        processing_steps: &mut Vec<String>,
        method: &str,
    ) -> Result<()> {
        let missing = series.null_count();
        if missing == 0 {
            return Ok(());
        }

        let col_name = series.name().to_string();
        let result = fill_numeric_nulls(series, fill_value)?;
        df.replace(&col_name, result)?;

        processing_steps.push(format!(
            "Filled {} missing values in '{}' with {}: {:.2}",
            missing, col_name, method, fill_value
        ));

        Ok(())
    }
}
