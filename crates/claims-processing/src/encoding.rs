//! One-hot (indicator) encoding of categorical columns.
//!
//! The encoder remembers the levels it saw while fitting, so a model trained
//! on one table can be fed a second table encoded into exactly the same
//! column set. Levels are sorted lexicographically and, by default, the first
//! level of every column is the dropped reference category.

use crate::error::{ProcessingError, Result};
use crate::schema::SchemaCheck;
use crate::utils::{DtypeCategory, get_dtype_category, series_to_strings};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Levels learned for one categorical column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodedColumn {
    /// Source column name.
    pub name: String,
    /// All distinct non-null levels, sorted.
    pub levels: Vec<String>,
    /// Level used as the reference (no indicator column), if any was dropped.
    pub reference: Option<String>,
}

impl EncodedColumn {
    /// Levels that get their own indicator column.
    pub fn indicator_levels(&self) -> &[String] {
        match self.reference {
            Some(_) => &self.levels[1..],
            None => &self.levels,
        }
    }

    /// Indicator column names, `{column}_{level}`.
    pub fn indicator_names(&self) -> Vec<String> {
        self.indicator_levels()
            .iter()
            .map(|level| indicator_name(&self.name, level))
            .collect()
    }
}

/// Name of the indicator column for `level` of `column`.
pub fn indicator_name(column: &str, level: &str) -> String {
    format!("{}_{}", column, level)
}

/// Fitted one-hot encoder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OneHotEncoder {
    drop_first: bool,
    columns: Vec<EncodedColumn>,
}

impl Default for OneHotEncoder {
    fn default() -> Self {
        Self::new(true)
    }
}

impl OneHotEncoder {
    /// Create an unfitted encoder.
    pub fn new(drop_first: bool) -> Self {
        Self {
            drop_first,
            columns: Vec::new(),
        }
    }

    /// Learn the levels of every categorical (string) column in `df`.
    ///
    /// Refitting replaces previously learned levels.
    pub fn fit(&mut self, df: &DataFrame) -> Result<&mut Self> {
        let mut columns = Vec::new();

        for column in df.get_columns() {
            if get_dtype_category(column.dtype()) != DtypeCategory::String {
                continue;
            }
            let series = column.as_materialized_series();
            let levels: BTreeSet<String> = series_to_strings(series)?
                .into_iter()
                .flatten()
                .collect();
            let levels: Vec<String> = levels.into_iter().collect();
            let reference = if self.drop_first {
                levels.first().cloned()
            } else {
                None
            };

            debug!(
                "Column '{}' has {} levels (reference: {:?})",
                column.name(),
                levels.len(),
                reference
            );

            columns.push(EncodedColumn {
                name: column.name().to_string(),
                levels,
                reference,
            });
        }

        self.columns = columns;
        Ok(self)
    }

    /// Replace every fitted categorical column with its indicator columns.
    ///
    /// Indicators are `UInt8` 0/1 values placed where the source column was.
    /// Nulls and levels unseen during fitting encode as all zeros. Fails if an
    /// indicator name is already taken by a kept column or another indicator.
    pub fn transform(&self, df: &DataFrame) -> Result<DataFrame> {
        let fitted: Vec<&str> = self.columns.iter().map(|c| c.name.as_str()).collect();
        SchemaCheck::require(df, &fitted)?;
        self.check_indicator_names(df)?;

        let mut output: Vec<Column> = Vec::with_capacity(df.width());
        for column in df.get_columns() {
            let name = column.name().as_str();
            match self.columns.iter().find(|c| c.name == name) {
                Some(encoded) => {
                    let values = series_to_strings(column.as_materialized_series())?;
                    for level in encoded.indicator_levels() {
                        let indicator: Vec<u8> = values
                            .iter()
                            .map(|v| u8::from(v.as_deref() == Some(level.as_str())))
                            .collect();
                        output.push(
                            Series::new(indicator_name(name, level).into(), indicator)
                                .into_column(),
                        );
                    }
                }
                None if get_dtype_category(column.dtype()) == DtypeCategory::String => {
                    return Err(ProcessingError::EncodingFailed {
                        column: name.to_string(),
                        reason: "column was not present when the encoder was fitted".to_string(),
                    });
                }
                None => output.push(column.clone()),
            }
        }

        Ok(DataFrame::new(output)?)
    }

    fn check_indicator_names(&self, df: &DataFrame) -> Result<()> {
        let mut taken: BTreeMap<String, String> = df
            .get_column_names()
            .into_iter()
            .filter(|name| !self.columns.iter().any(|c| c.name == name.as_str()))
            .map(|name| (name.to_string(), format!("column '{}'", name)))
            .collect();

        for encoded in &self.columns {
            for name in encoded.indicator_names() {
                let owner = format!("indicator of '{}'", encoded.name);
                if let Some(existing) = taken.insert(name.clone(), owner) {
                    return Err(ProcessingError::EncodingFailed {
                        column: encoded.name.clone(),
                        reason: format!("indicator '{}' collides with {}", name, existing),
                    });
                }
            }
        }
        Ok(())
    }

    /// Fit on `df` and encode it in one step.
    pub fn fit_transform(&mut self, df: &DataFrame) -> Result<DataFrame> {
        self.fit(df)?;
        self.transform(df)
    }

    /// Columns learned during fitting, in table order.
    pub fn encoded_columns(&self) -> &[EncodedColumn] {
        &self.columns
    }

    /// All indicator column names the encoder produces.
    pub fn indicator_names(&self) -> Vec<String> {
        self.columns
            .iter()
            .flat_map(EncodedColumn::indicator_names)
            .collect()
    }

    /// Whether `fit` has found any categorical column.
    pub fn is_fitted(&self) -> bool {
        !self.columns.is_empty()
    }
}
