//! Claims Data Processing Library
//!
//! Loading, validation, preparation and exploratory analysis of insurance
//! claims tables, built on Polars.
//!
//! # Overview
//!
//! - **Loading**: comma, tab and pipe delimited extracts and Parquet files
//! - **Schema checks**: explicit validation of the conventionally named
//!   columns (TotalClaims, TotalPremium, TransactionMonth, ...)
//! - **Preparation**: missing-value handling, vehicle age derivation and
//!   one-hot encoding through [`DataPreparer`]
//! - **Exploratory analysis**: summary statistics, loss ratios, claims by
//!   make, monthly trends and vehicle breakdowns through [`EdaAnalyzer`]
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use claims_processing::{DataPreparer, EdaAnalyzer, load_table};
//!
//! let df = load_table("MachineLearningRating_v3.txt", None)?;
//!
//! let eda = EdaAnalyzer::new(df.clone());
//! println!("Loss ratio: {:?}", eda.loss_ratio()?);
//! for row in eda.loss_ratio_by("Province")? {
//!     println!("{}: {:?}", row.group, row.loss_ratio);
//! }
//!
//! let mut preparer = DataPreparer::new(df);
//! let prepared = preparer.prepare()?.clone();
//! println!("Prepared {} columns", prepared.width());
//! ```
//!
//! # Configuration
//!
//! ```rust,ignore
//! use claims_processing::config::*;
//!
//! let config = PreparerConfig::builder()
//!     .missing_column_threshold(0.3)   // Drop columns with >30% missing
//!     .numeric_imputation(NumericImputation::Median)
//!     .categorical_fill("Unknown")
//!     .drop_first(true)
//!     .build()?;
//! ```

pub mod config;
pub mod dates;
pub mod eda;
pub mod encoding;
pub mod error;
pub mod imputers;
pub mod loader;
pub mod preparer;
pub mod schema;
pub mod utils;

// Re-exports for convenient access
pub use config::{
    ConfigValidationError, NumericImputation, PreparerConfig, PreparerConfigBuilder,
};
pub use eda::{
    BoxPlotStats, ColumnInfo, ColumnStatistics, DEFAULT_HISTOGRAM_BINS, DEFAULT_TOP_MAKES,
    DataInfo, EdaAnalyzer, EdaReport, GroupLossRatio, Histogram, HistogramBin, LevelStatistics,
    MakeClaims, MissingValueSummary, MonthlyTrend, VehicleCharacteristic,
};
pub use encoding::{EncodedColumn, OneHotEncoder};
pub use error::{ProcessingError, Result as ProcessingResult, ResultExt};
pub use imputers::StatisticalImputer;
pub use loader::{DEFAULT_TXT_DELIMITER, load_table, write_csv};
pub use preparer::DataPreparer;
pub use schema::SchemaCheck;
pub use utils::{
    DtypeCategory, dtype_category_str, fill_numeric_nulls, fill_string_nulls, get_dtype_category,
    is_numeric_dtype,
};
