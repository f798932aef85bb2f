//! Configuration types for claims table preparation.
//!
//! This module provides configuration options using the builder pattern
//! for flexible and ergonomic preparer setup.

use serde::{Deserialize, Serialize};

/// Default fraction of missing values above which a column is dropped.
pub const DEFAULT_MISSING_COLUMN_THRESHOLD: f64 = 0.3;

/// Placeholder written into missing categorical cells.
pub const DEFAULT_CATEGORICAL_FILL: &str = "Unknown";

/// Strategy for imputing missing numeric values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum NumericImputation {
    /// Use the median of non-null values
    #[default]
    Median,
    /// Use the mean of non-null values
    Mean,
}

/// Configuration for [`DataPreparer`](crate::DataPreparer).
///
/// Use [`PreparerConfig::builder()`] to create a new configuration
/// with fluent API.
///
/// # Example
///
/// ```rust,ignore
/// use claims_processing::config::PreparerConfig;
///
/// let config = PreparerConfig::builder()
///     .missing_column_threshold(0.5)
///     .categorical_fill("Missing")
///     .build()?;
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreparerConfig {
    /// Columns whose missing fraction is strictly above this value are dropped.
    /// Default: 0.3 (30%)
    pub missing_column_threshold: f64,

    /// Strategy for filling the remaining numeric gaps.
    /// Default: Median
    pub numeric_imputation: NumericImputation,

    /// Literal used to fill missing categorical cells.
    /// Default: "Unknown"
    pub categorical_fill: String,

    /// Name of the vehicle model-year column.
    /// Default: "VehicleYear"
    pub vehicle_year_column: String,

    /// Name of the transaction month (date) column.
    /// Default: "TransactionMonth"
    pub transaction_month_column: String,

    /// Name of the derived vehicle age column.
    /// Default: "VehicleAge"
    pub vehicle_age_column: String,

    /// Whether one-hot encoding drops the first (reference) level.
    /// Default: true
    pub drop_first: bool,
}

impl Default for PreparerConfig {
    fn default() -> Self {
        Self {
            missing_column_threshold: DEFAULT_MISSING_COLUMN_THRESHOLD,
            numeric_imputation: NumericImputation::default(),
            categorical_fill: DEFAULT_CATEGORICAL_FILL.to_string(),
            vehicle_year_column: "VehicleYear".to_string(),
            transaction_month_column: "TransactionMonth".to_string(),
            vehicle_age_column: "VehicleAge".to_string(),
            drop_first: true,
        }
    }
}

impl PreparerConfig {
    /// Create a new configuration builder.
    pub fn builder() -> PreparerConfigBuilder {
        PreparerConfigBuilder::default()
    }

    /// Validate the configuration and return errors if invalid.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if !(0.0..=1.0).contains(&self.missing_column_threshold) {
            return Err(ConfigValidationError::InvalidThreshold {
                field: "missing_column_threshold".to_string(),
                value: self.missing_column_threshold,
            });
        }

        for (field, value) in [
            ("vehicle_year_column", &self.vehicle_year_column),
            ("transaction_month_column", &self.transaction_month_column),
            ("vehicle_age_column", &self.vehicle_age_column),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigValidationError::EmptyColumnName(field.to_string()));
            }
        }

        Ok(())
    }
}

/// Errors that can occur during configuration validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Invalid threshold for '{field}': {value} (must be between 0.0 and 1.0)")]
    InvalidThreshold { field: String, value: f64 },

    #[error("Column name for '{0}' must not be empty")]
    EmptyColumnName(String),
}

impl From<ConfigValidationError> for crate::error::ProcessingError {
    fn from(err: ConfigValidationError) -> Self {
        crate::error::ProcessingError::InvalidConfig(err.to_string())
    }
}

/// Builder for [`PreparerConfig`] with fluent API.
#[derive(Debug, Default)]
pub struct PreparerConfigBuilder {
    missing_column_threshold: Option<f64>,
    numeric_imputation: Option<NumericImputation>,
    categorical_fill: Option<String>,
    vehicle_year_column: Option<String>,
    transaction_month_column: Option<String>,
    vehicle_age_column: Option<String>,
    drop_first: Option<bool>,
}

impl PreparerConfigBuilder {
    /// Set the threshold for dropping columns with missing values.
    ///
    /// # Arguments
    /// * `threshold` - Value between 0.0 and 1.0 (e.g., 0.3 = 30%)
    pub fn missing_column_threshold(mut self, threshold: f64) -> Self {
        self.missing_column_threshold = Some(threshold);
        self
    }

    /// Set the numeric imputation strategy.
    pub fn numeric_imputation(mut self, strategy: NumericImputation) -> Self {
        self.numeric_imputation = Some(strategy);
        self
    }

    /// Set the placeholder used for missing categorical values.
    pub fn categorical_fill(mut self, fill: impl Into<String>) -> Self {
        self.categorical_fill = Some(fill.into());
        self
    }

    /// Set the vehicle model-year column name.
    pub fn vehicle_year_column(mut self, column: impl Into<String>) -> Self {
        self.vehicle_year_column = Some(column.into());
        self
    }

    /// Set the transaction month column name.
    pub fn transaction_month_column(mut self, column: impl Into<String>) -> Self {
        self.transaction_month_column = Some(column.into());
        self
    }

    /// Set the derived vehicle age column name.
    pub fn vehicle_age_column(mut self, column: impl Into<String>) -> Self {
        self.vehicle_age_column = Some(column.into());
        self
    }

    /// Keep or drop the reference level when one-hot encoding.
    pub fn drop_first(mut self, drop_first: bool) -> Self {
        self.drop_first = Some(drop_first);
        self
    }

    /// Build the configuration.
    ///
    /// Returns a validated `PreparerConfig` or an error if validation fails.
    pub fn build(self) -> Result<PreparerConfig, ConfigValidationError> {
        let defaults = PreparerConfig::default();
        let config = PreparerConfig {
            missing_column_threshold: self
                .missing_column_threshold
                .unwrap_or(defaults.missing_column_threshold),
            numeric_imputation: self.numeric_imputation.unwrap_or_default(),
            categorical_fill: self.categorical_fill.unwrap_or(defaults.categorical_fill),
            vehicle_year_column: self
                .vehicle_year_column
                .unwrap_or(defaults.vehicle_year_column),
            transaction_month_column: self
                .transaction_month_column
                .unwrap_or(defaults.transaction_month_column),
            vehicle_age_column: self
                .vehicle_age_column
                .unwrap_or(defaults.vehicle_age_column),
            drop_first: self.drop_first.unwrap_or(defaults.drop_first),
        };

        config.validate()?;
        Ok(config)
    }
}
