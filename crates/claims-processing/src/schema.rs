//! Explicit schema checks for claims tables.
//!
//! Claims extracts carry no fixed schema; columns are discovered at runtime.
//! Every operation that relies on conventionally named fields checks for them
//! up front through [`SchemaCheck`] instead of failing halfway through.

use crate::error::{ProcessingError, Result};
use polars::prelude::*;
use serde::Serialize;

/// Claim amount column.
pub const TOTAL_CLAIMS: &str = "TotalClaims";
/// Premium column.
pub const TOTAL_PREMIUM: &str = "TotalPremium";
/// Transaction date column.
pub const TRANSACTION_MONTH: &str = "TransactionMonth";
/// Vehicle model-year column.
pub const VEHICLE_YEAR: &str = "VehicleYear";
/// Vehicle manufacturer column.
pub const MAKE: &str = "make";
/// Policy identifier column.
pub const POLICY_ID: &str = "PolicyID";

/// Outcome of checking a table against a list of required columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "missing", rename_all = "snake_case")]
pub enum SchemaCheck {
    /// Every required column is present.
    Valid,
    /// These required columns are absent, in the order they were requested.
    Missing(Vec<String>),
}

impl SchemaCheck {
    /// Check `df` for the `required` columns.
    pub fn of(df: &DataFrame, required: &[&str]) -> Self {
        let missing: Vec<String> = required
            .iter()
            .filter(|name| df.column(name).is_err())
            .map(|name| name.to_string())
            .collect();

        if missing.is_empty() {
            Self::Valid
        } else {
            Self::Missing(missing)
        }
    }

    /// Check `df` and turn missing columns into [`ProcessingError::MissingColumns`].
    pub fn require(df: &DataFrame, required: &[&str]) -> Result<()> {
        Self::of(df, required).into_result()
    }

    /// Whether all required columns were found.
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }

    /// The missing columns (empty when valid).
    pub fn missing(&self) -> &[String] {
        match self {
            Self::Valid => &[],
            Self::Missing(cols) => cols,
        }
    }

    /// Convert into a `Result`, failing when columns are missing.
    pub fn into_result(self) -> Result<()> {
        match self {
            Self::Valid => Ok(()),
            Self::Missing(cols) => Err(ProcessingError::MissingColumns(cols)),
        }
    }
}

/// Whether `df` has a column called `name`.
pub fn has_column(df: &DataFrame, name: &str) -> bool {
    df.column(name).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims_frame() -> DataFrame {
        df![
            TOTAL_CLAIMS => [0.0, 120.5],
            TOTAL_PREMIUM => [50.0, 60.0],
        ]
        .unwrap()
    }

    #[test]
    fn test_valid_schema() {
        let df = claims_frame();
        let check = SchemaCheck::of(&df, &[TOTAL_CLAIMS, TOTAL_PREMIUM]);
        assert!(check.is_valid());
        assert!(check.missing().is_empty());
        assert!(SchemaCheck::require(&df, &[TOTAL_CLAIMS]).is_ok());
    }

    #[test]
    fn test_missing_columns_reported_in_order() {
        let df = claims_frame();
        let check = SchemaCheck::of(&df, &[MAKE, TOTAL_CLAIMS, TRANSACTION_MONTH]);
        assert_eq!(
            check,
            SchemaCheck::Missing(vec![MAKE.to_string(), TRANSACTION_MONTH.to_string()])
        );
    }

    #[test]
    fn test_require_returns_typed_error() {
        let df = claims_frame();
        let err = SchemaCheck::require(&df, &[MAKE]).unwrap_err();
        assert_eq!(err.missing_columns(), Some(&[MAKE.to_string()][..]));
    }

    #[test]
    fn test_schema_check_serializes() {
        let check = SchemaCheck::Missing(vec![MAKE.to_string()]);
        let json = serde_json::to_string(&check).unwrap();
        assert!(json.contains("\"status\":\"missing\""));
        assert!(json.contains("make"));
    }
}
