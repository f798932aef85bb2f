//! Shared utilities for claims table processing.
//!
//! This module contains common helper functions used across multiple modules
//! to reduce code duplication and ensure consistency.

use polars::prelude::*;

// =============================================================================
// Data Type Utilities
// =============================================================================

/// Category of a data type for processing purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DtypeCategory {
    /// Integer or floating point numbers
    Numeric,
    /// Date or datetime types
    Datetime,
    /// Boolean type
    Boolean,
    /// String/categorical text type
    String,
    /// Other/unknown types
    Other,
}

/// Check if a DataType is numeric (integer or float).
#[inline]
pub fn is_numeric_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}

/// Check if a DataType is a datetime type.
#[inline]
pub fn is_datetime_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Datetime(_, _) | DataType::Date | DataType::Time
    )
}

/// Get the category of a DataType.
pub fn get_dtype_category(dtype: &DataType) -> DtypeCategory {
    if is_numeric_dtype(dtype) {
        DtypeCategory::Numeric
    } else if is_datetime_dtype(dtype) {
        DtypeCategory::Datetime
    } else if matches!(dtype, DataType::Boolean) {
        DtypeCategory::Boolean
    } else if matches!(dtype, DataType::String | DataType::Categorical(_, _)) {
        DtypeCategory::String
    } else {
        DtypeCategory::Other
    }
}

/// Get the dtype category as a short label for reports.
pub fn dtype_category_str(dtype: &DataType) -> &'static str {
    match get_dtype_category(dtype) {
        DtypeCategory::Numeric => "numeric",
        DtypeCategory::Datetime => "datetime",
        DtypeCategory::Boolean => "binary",
        DtypeCategory::String => "categorical",
        DtypeCategory::Other => "other",
    }
}

/// Names of all columns whose dtype falls into `category`, in table order.
pub fn columns_of_category(df: &DataFrame, category: DtypeCategory) -> Vec<String> {
    df.get_columns()
        .iter()
        .filter(|col| get_dtype_category(col.dtype()) == category)
        .map(|col| col.name().to_string())
        .collect()
}

// =============================================================================
// Series Extraction Utilities
// =============================================================================

/// Cast a column to `Float64` with NaN turned into null.
///
/// Polars aggregations skip nulls but not NaN, so every statistic over a
/// claims column goes through this first.
pub fn numeric_series(series: &Series) -> PolarsResult<Series> {
    let casted = series.cast(&DataType::Float64)?;
    let cleaned: Float64Chunked = casted
        .f64()?
        .into_iter()
        .map(|v| v.filter(|x| !x.is_nan()))
        .collect();
    Ok(cleaned.with_name(series.name().clone()).into_series())
}

/// Read a column as `f64` values, keeping nulls as `None`.
///
/// NaN values are reported as `None` so they count as missing.
pub fn series_to_f64(series: &Series) -> PolarsResult<Vec<Option<f64>>> {
    Ok(numeric_series(series)?.f64()?.into_iter().collect())
}

/// Read a column as owned strings, keeping nulls as `None`.
pub fn series_to_strings(series: &Series) -> PolarsResult<Vec<Option<String>>> {
    let casted = series.cast(&DataType::String)?;
    Ok(casted
        .str()?
        .into_iter()
        .map(|v| v.map(str::to_string))
        .collect())
}

/// Fraction of missing values in a series (nulls, plus NaN for floats).
pub fn missing_fraction(series: &Series) -> f64 {
    if series.is_empty() {
        return 0.0;
    }
    let mut missing = series.null_count();
    if matches!(series.dtype(), DataType::Float32 | DataType::Float64)
        && let Ok(values) = numeric_series(series)
    {
        missing = values.null_count();
    }
    missing as f64 / series.len() as f64
}

// =============================================================================
// Series Transformation Utilities
// =============================================================================

/// Fill missing values in a numeric Series with a specific value.
///
/// The result is always Float64; present values are carried over unchanged
/// and NaN is filled like null.
pub fn fill_numeric_nulls(series: &Series, fill_value: f64) -> PolarsResult<Series> {
    let values = numeric_series(series)?;
    Ok(values.f64()?.fill_null_with_values(fill_value)?.into_series())
}

/// Fill null values in a string Series with a specific value.
pub fn fill_string_nulls(series: &Series, fill_value: &str) -> PolarsResult<Series> {
    let filled: Vec<String> = series_to_strings(series)?
        .into_iter()
        .map(|v| v.unwrap_or_else(|| fill_value.to_string()))
        .collect();
    Ok(Series::new(series.name().clone(), filled))
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_numeric_dtype() {
        assert!(is_numeric_dtype(&DataType::Int64));
        assert!(is_numeric_dtype(&DataType::Float64));
        assert!(!is_numeric_dtype(&DataType::String));
        assert!(!is_numeric_dtype(&DataType::Boolean));
    }

    #[test]
    fn test_dtype_category() {
        assert_eq!(get_dtype_category(&DataType::Int64), DtypeCategory::Numeric);
        assert_eq!(get_dtype_category(&DataType::Date), DtypeCategory::Datetime);
        assert_eq!(
            get_dtype_category(&DataType::Boolean),
            DtypeCategory::Boolean
        );
        assert_eq!(get_dtype_category(&DataType::String), DtypeCategory::String);
        assert_eq!(dtype_category_str(&DataType::String), "categorical");
    }

    #[test]
    fn test_columns_of_category() {
        let df = df![
            "make" => ["Toyota", "Ford"],
            "TotalClaims" => [0.0, 10.0],
            "VehicleType" => ["Passenger", "Bus"],
        ]
        .unwrap();
        assert_eq!(
            columns_of_category(&df, DtypeCategory::String),
            vec!["make".to_string(), "VehicleType".to_string()]
        );
    }

    #[test]
    fn test_numeric_series_nan_becomes_null() {
        let series = Series::new("x".into(), &[Some(1i64), None, Some(3)]);
        let values = numeric_series(&series).unwrap();
        assert_eq!(values.dtype(), &DataType::Float64);
        assert_eq!(values.name().as_str(), "x");
        assert_eq!(values.null_count(), 1);

        let series = Series::new("y".into(), &[Some(2.0), Some(f64::NAN), None]);
        let values = numeric_series(&series).unwrap();
        assert_eq!(values.null_count(), 2);
        assert_eq!(values.mean(), Some(2.0));
    }

    #[test]
    fn test_missing_fraction_counts_nan() {
        let series = Series::new("x".into(), &[Some(1.0), None, Some(f64::NAN), Some(4.0)]);
        assert_eq!(missing_fraction(&series), 0.5);
    }

    #[test]
    fn test_fill_numeric_nulls() {
        let series = Series::new("test".into(), &[Some(1i64), None, Some(3)]);
        let filled = fill_numeric_nulls(&series, 0.0).unwrap();

        assert_eq!(filled.dtype(), &DataType::Float64);
        assert_eq!(filled.get(0).unwrap().try_extract::<f64>().unwrap(), 1.0);
        assert_eq!(filled.get(1).unwrap().try_extract::<f64>().unwrap(), 0.0);
        assert_eq!(filled.get(2).unwrap().try_extract::<f64>().unwrap(), 3.0);

        let series = Series::new("test".into(), &[f64::NAN, 2.0]);
        let filled = fill_numeric_nulls(&series, 5.0).unwrap();
        assert_eq!(filled.get(0).unwrap().try_extract::<f64>().unwrap(), 5.0);
    }

    #[test]
    fn test_fill_string_nulls_keeps_values_unquoted() {
        let series = Series::new("make".into(), &[Some("Toyota"), None]);
        let filled = fill_string_nulls(&series, "Unknown").unwrap();
        let values: Vec<Option<&str>> = filled.str().unwrap().into_iter().collect();
        assert_eq!(values, vec![Some("Toyota"), Some("Unknown")]);
    }
}
