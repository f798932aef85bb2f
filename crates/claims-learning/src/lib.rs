//! claims-learning: claim probability and severity models with risk-based
//! premium pricing.
//!
//! This crate trains two models on a prepared insurance claims table:
//!
//! - a **claim probability** classifier (does a policy claim at all?)
//! - a **claim severity** regressor (how large is the claim, given one occurs?)
//!
//! and combines them into a premium:
//!
//! ```text
//! premium = (P(claim) × E[severity] + expense_loading) × (1 + profit_margin)
//! ```
//!
//! Every model family is implemented natively. Tree ensembles come with exact
//! TreeSHAP attributions, so the drivers of a prediction can be ranked
//! without a separate explainability runtime.
//!
//! # Quick Start
//!
//! ```
//! use claims_learning::calculate_risk_based_premium;
//!
//! let premium = calculate_risk_based_premium(0.1, 1000.0, 500.0, 0.1);
//! assert!((premium - 605.0).abs() < 1e-9);
//! ```
//!
//! A full run from a raw table:
//!
//! ```no_run
//! use claims_learning::{PipelineConfig, RiskPricingPipeline, SeverityModelKind};
//! use claims_processing::load_table;
//!
//! let df = load_table("MachineLearningRating_v3.txt", None)?;
//! let config = PipelineConfig::builder()
//!     .severity_model(SeverityModelKind::RandomForest)
//!     .test_size(0.2)
//!     .build()?;
//!
//! let mut pipeline = RiskPricingPipeline::builder().config(config).build()?;
//! let report = pipeline.run(df)?;
//! println!("{}", serde_json::to_string_pretty(&report)?);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                       claims-processing                          │
//! │   load_table ──► DataPreparer (vehicle age, impute, one-hot)     │
//! └───────────────────────────┬──────────────────────────────────────┘
//!                             │ DataFrame
//!                             ▼
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                        claims-learning                           │
//! │                                                                  │
//! │  FeatureMatrix ──► ClaimProbabilityModel ─┐                      │
//! │               └──► ClaimSeverityModel ────┴─► premium ─► report  │
//! │                            │                                     │
//! │                            └──► TreeSHAP ─► feature ranking      │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Error Handling
//!
//! All fallible operations return [`Result<T, LearningError>`]:
//!
//! - [`LearningError::InvalidConfig`] - rejected configuration
//! - [`LearningError::InvalidData`] - unusable input (empty, non-finite, bad labels)
//! - [`LearningError::NotFitted`] - a model was used before `train()`
//! - [`LearningError::ShapeMismatch`] / [`LearningError::FeatureMismatch`] - inputs disagree
//! - [`LearningError::Processing`] - table preparation failed
//!
//! # Thread Safety
//!
//! Models and the pipeline are plain data and are `Send + Sync`. Training is
//! single-threaded and deterministic for a given seed.

pub mod config;
pub mod ensemble;
mod error;
pub mod explain;
pub mod linear;
mod matrix;
pub mod metrics;
pub mod model;
mod pipeline;
mod premium;
mod probability;
mod severity;
pub mod split;
pub mod tree;
mod types;

// Configuration types
pub use config::{
    BoostingParams, ForestParams, MaxFeatures, ModelConfig, PipelineConfig,
    PipelineConfigBuilder, ProbabilityModelKind, SeverityModelKind,
};
// Error types
pub use error::{LearningError, Result, ResultExt};
// Feature extraction
pub use matrix::{FeatureMatrix, numeric_feature_columns, target_from_frame};
// Models
pub use model::{FittedModel, ModelState, Predictor};
pub use probability::{ClaimProbabilityModel, DECISION_THRESHOLD};
pub use severity::ClaimSeverityModel;
// Explainability
pub use explain::{FeatureImportance, ShapSummary, ShapValues};
// Pricing
pub use premium::{PremiumParams, calculate_risk_based_premium, price_portfolio};
// Pipeline types
pub use pipeline::{RiskPricingPipeline, RiskPricingPipelineBuilder};
// Result and metrics types
pub use types::{
    ClassificationMetrics, PremiumSummary, PricedPolicy, RegressionMetrics, RiskPricingReport,
};

static_assertions::assert_impl_all!(ClaimSeverityModel: Send, Sync, Clone);
static_assertions::assert_impl_all!(ClaimProbabilityModel: Send, Sync, Clone);
static_assertions::assert_impl_all!(RiskPricingPipeline: Send, Sync);
static_assertions::assert_impl_all!(LearningError: Send, Sync);
