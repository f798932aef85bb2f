//! Imputation module for handling missing values.
//!
//! Statistical imputation (median, mean, constant) used by the
//! [`DataPreparer`](crate::DataPreparer).

mod statistical;

pub use statistical::StatisticalImputer;
