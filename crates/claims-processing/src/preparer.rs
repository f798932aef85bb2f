//! Table preparation for modeling.
//!
//! [`DataPreparer`] owns a copy of a claims table and applies the three
//! preparation steps in place:
//! - missing-value handling (drop sparse columns, impute the rest)
//! - feature engineering (parsed transaction date, vehicle age)
//! - categorical encoding (one-hot with a dropped reference level)
//!
//! Every step records a human-readable entry in
//! [`processing_steps`](DataPreparer::processing_steps).

use crate::config::{NumericImputation, PreparerConfig};
use crate::dates::{coerce_to_date, years};
use crate::encoding::OneHotEncoder;
use crate::error::{ProcessingError, Result};
use crate::imputers::StatisticalImputer;
use crate::schema::has_column;
use crate::utils::{DtypeCategory, get_dtype_category, missing_fraction, series_to_f64};
use polars::prelude::*;
use tracing::{debug, info};

/// Prepares a claims table for modeling.
///
/// # Example
///
/// ```rust,ignore
/// use claims_processing::DataPreparer;
///
/// let mut preparer = DataPreparer::new(df);
/// let encoded = preparer.prepare()?.clone();
/// for step in preparer.processing_steps() {
///     println!("{step}");
/// }
/// ```
#[derive(Debug, Clone)]
pub struct DataPreparer {
    df: DataFrame,
    config: PreparerConfig,
    encoder: Option<OneHotEncoder>,
    processing_steps: Vec<String>,
}

impl DataPreparer {
    /// Create a preparer over `df` with the default configuration.
    pub fn new(df: DataFrame) -> Self {
        Self {
            df,
            config: PreparerConfig::default(),
            encoder: None,
            processing_steps: Vec::new(),
        }
    }

    /// Create a preparer with a custom configuration.
    pub fn with_config(df: DataFrame, config: PreparerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            df,
            config,
            encoder: None,
            processing_steps: Vec::new(),
        })
    }

    /// Drop sparse columns and impute the remaining gaps.
    ///
    /// Columns whose missing fraction is strictly greater than the configured
    /// threshold are removed. Numeric columns are filled with the median (or
    /// mean) and string columns with the placeholder literal. Boolean columns
    /// with gaps become text (`true`/`false`/placeholder) so the encoder
    /// treats them as categories. Date columns are left as they are.
    pub fn handle_missing(&mut self) -> Result<&DataFrame> {
        let threshold = self.config.missing_column_threshold;
        info!("Handling missing values (column threshold {:.2})", threshold);

        let sparse: Vec<String> = self
            .df
            .get_columns()
            .iter()
            .filter(|col| missing_fraction(col.as_materialized_series()) > threshold)
            .map(|col| col.name().to_string())
            .collect();

        if !sparse.is_empty() {
            let names: Vec<PlSmallStr> = sparse.iter().map(|s| s.as_str().into()).collect();
            self.df = self.df.drop_many(names);
            debug!("Dropped {} sparse columns: {:?}", sparse.len(), sparse);
            self.processing_steps.push(format!(
                "Dropped {} columns with more than {:.0}% missing values: {:?}",
                sparse.len(),
                threshold * 100.0,
                sparse
            ));
        }

        let candidates: Vec<(String, DtypeCategory)> = self
            .df
            .get_columns()
            .iter()
            .filter(|col| col.null_count() > 0 || col.dtype().is_float())
            .map(|col| (col.name().to_string(), get_dtype_category(col.dtype())))
            .collect();

        for (name, category) in candidates {
            let outcome = match category {
                DtypeCategory::Numeric => match self.config.numeric_imputation {
                    NumericImputation::Median => StatisticalImputer::apply_numeric_median(
                        &mut self.df,
                        &name,
                        &mut self.processing_steps,
                    ),
                    NumericImputation::Mean => StatisticalImputer::apply_numeric_mean(
                        &mut self.df,
                        &name,
                        &mut self.processing_steps,
                    ),
                },
                DtypeCategory::String | DtypeCategory::Boolean => {
                    StatisticalImputer::apply_constant_imputation(
                        &mut self.df,
                        &name,
                        &self.config.categorical_fill,
                        &mut self.processing_steps,
                    )
                }
                DtypeCategory::Datetime | DtypeCategory::Other => Ok(()),
            };
            outcome.map_err(|e| ProcessingError::ImputationFailed {
                column: name.clone(),
                reason: e.to_string(),
            })?;
        }

        Ok(&self.df)
    }

    /// Parse the transaction date and derive vehicle age.
    ///
    /// Requires both the vehicle-year and transaction-month columns; otherwise
    /// the table is left untouched. Unparseable dates become missing, and a
    /// missing date or year yields a missing age.
    pub fn feature_engineering(&mut self) -> Result<&DataFrame> {
        let year_col = self.config.vehicle_year_column.clone();
        let month_col = self.config.transaction_month_column.clone();
        let age_col = self.config.vehicle_age_column.clone();

        if !(has_column(&self.df, &year_col) && has_column(&self.df, &month_col)) {
            debug!(
                "Skipping feature engineering: '{}' or '{}' not present",
                year_col, month_col
            );
            self.processing_steps.push(format!(
                "Skipped vehicle age: '{}' and '{}' are both required",
                year_col, month_col
            ));
            return Ok(&self.df);
        }

        let raw_month = self.df.column(&month_col)?.as_materialized_series().clone();
        let parsed = coerce_to_date(&raw_month)?;
        let unparsed = parsed.null_count().saturating_sub(raw_month.null_count());
        let transaction_years = years(&parsed)?;
        self.df.replace(&month_col, parsed)?;

        let vehicle_years = series_to_f64(self.df.column(&year_col)?.as_materialized_series())?;
        let ages: Vec<Option<f64>> = transaction_years
            .iter()
            .zip(vehicle_years.iter())
            .map(|(ty, vy)| match (ty, vy) {
                (Some(ty), Some(vy)) => Some(*ty as f64 - vy),
                _ => None,
            })
            .collect();
        let missing_ages = ages.iter().filter(|a| a.is_none()).count();
        self.df
            .with_column(Series::new(age_col.as_str().into(), ages))?;

        if unparsed > 0 {
            debug!("{} values in '{}' could not be parsed as dates", unparsed, month_col);
        }
        self.processing_steps.push(format!(
            "Parsed '{}' as dates ({} unparseable values set to missing)",
            month_col, unparsed
        ));
        self.processing_steps.push(format!(
            "Derived '{}' = year('{}') - '{}' ({} missing)",
            age_col, month_col, year_col, missing_ages
        ));
        info!("Derived '{}' from '{}' and '{}'", age_col, month_col, year_col);

        Ok(&self.df)
    }

    /// One-hot encode every string column.
    ///
    /// The fitted encoder is kept (see [`encoder`](Self::encoder)) so the
    /// same column set can be produced for another table.
    pub fn encode_categoricals(&mut self) -> Result<&DataFrame> {
        let mut encoder = OneHotEncoder::new(self.config.drop_first);
        let encoded = encoder.fit_transform(&self.df)?;

        for column in encoder.encoded_columns() {
            self.processing_steps.push(format!(
                "Encoded '{}' ({} levels) into {} indicator columns",
                column.name,
                column.levels.len(),
                column.indicator_levels().len()
            ));
        }
        info!(
            "Encoded {} categorical columns ({} -> {} columns)",
            encoder.encoded_columns().len(),
            self.df.width(),
            encoded.width()
        );

        self.df = encoded;
        self.encoder = Some(encoder);
        Ok(&self.df)
    }

    /// Run feature engineering, missing-value handling and encoding in order.
    pub fn prepare(&mut self) -> Result<&DataFrame> {
        info!(
            "Preparing table with {} rows and {} columns",
            self.df.height(),
            self.df.width()
        );
        self.feature_engineering()?;
        self.handle_missing()?;
        self.encode_categoricals()?;
        Ok(&self.df)
    }

    /// The table in its current state.
    pub fn frame(&self) -> &DataFrame {
        &self.df
    }

    /// Consume the preparer and return the table.
    pub fn into_inner(self) -> DataFrame {
        self.df
    }

    /// Steps applied so far, in order.
    pub fn processing_steps(&self) -> &[String] {
        &self.processing_steps
    }

    /// Encoder fitted by the last call to [`encode_categoricals`](Self::encode_categoricals).
    pub fn encoder(&self) -> Option<&OneHotEncoder> {
        self.encoder.as_ref()
    }

    pub fn config(&self) -> &PreparerConfig {
        &self.config
    }
}
