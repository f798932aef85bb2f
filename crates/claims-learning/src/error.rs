//! Error types for the claims-learning crate.
//!
//! This module defines [`LearningError`], the main error type used throughout
//! the crate. All public API functions return `Result<T, LearningError>`.
//!
//! # Example
//!
//! ```
//! use claims_learning::{LearningError, PipelineConfig};
//!
//! fn configure() -> Result<PipelineConfig, LearningError> {
//!     // Errors are automatically propagated with ?
//!     let config = PipelineConfig::builder()
//!         .claim_column("TotalClaims")
//!         .build()?;
//!     Ok(config)
//! }
//! # configure().unwrap();
//! ```

use claims_processing::ProcessingError;
use serde::Serialize;
use serde::ser::SerializeStruct;
use thiserror::Error;

/// The main error type for claims-learning operations.
///
/// This enum covers all error conditions that can occur during:
/// - Configuration and validation
/// - Feature matrix construction
/// - Model training, prediction and evaluation
/// - Explainability analysis
///
/// This enum is marked `#[non_exhaustive]` to allow adding new variants
/// in future versions without breaking downstream code.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum LearningError {
    /// Invalid configuration, including unknown model tags.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Invalid data provided for training or inference.
    ///
    /// Common causes:
    /// - Feature matrix contains NaN values (prepare the table first)
    /// - Classification labels are not 0/1
    /// - Too few rows to train on
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// A model was used before `train` was called.
    #[error("Model not fitted: call train() before {0}")]
    NotFitted(String),

    /// Row or column counts do not line up.
    #[error("Shape mismatch: expected {expected}, got {actual}")]
    ShapeMismatch { expected: String, actual: String },

    /// Prediction features differ from the features the model was trained on.
    #[error("Feature mismatch: {0}")]
    FeatureMismatch(String),

    /// Training could not produce a usable model.
    #[error("Training failed: {0}")]
    TrainingFailed(String),

    /// Error raised while loading or preparing the table.
    #[error(transparent)]
    Processing(#[from] ProcessingError),

    /// Polars error wrapper.
    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// Generic error with context.
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<LearningError>,
    },
}

impl LearningError {
    /// Add context to an error.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        LearningError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Get a stable error code for front-end handling.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidConfig(_) => "INVALID_CONFIG",
            Self::InvalidData(_) => "INVALID_DATA",
            Self::NotFitted(_) => "NOT_FITTED",
            Self::ShapeMismatch { .. } => "SHAPE_MISMATCH",
            Self::FeatureMismatch(_) => "FEATURE_MISMATCH",
            Self::TrainingFailed(_) => "TRAINING_FAILED",
            Self::Processing(e) => e.error_code(),
            Self::Polars(_) => "POLARS_ERROR",
            Self::WithContext { source, .. } => source.error_code(),
        }
    }

    pub(crate) fn shape(expected: impl ToString, actual: impl ToString) -> Self {
        Self::ShapeMismatch {
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }
}

/// Errors are serialized as a struct with `code` and `message` fields.
impl Serialize for LearningError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("LearningError", 2)?;
        state.serialize_field("code", &self.error_code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

/// Result type alias for learning operations.
pub type Result<T> = std::result::Result<T, LearningError>;

/// Extension trait for adding context to Results.
pub trait ResultExt<T> {
    /// Add context to an error result.
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, ProcessingError> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| LearningError::Processing(e).with_context(context))
    }
}
