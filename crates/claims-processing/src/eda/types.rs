//! Report types produced by the [`EdaAnalyzer`](super::EdaAnalyzer).
//!
//! All types serialize to JSON so the `claims-eda` binary can emit them
//! directly.

use serde::{Deserialize, Serialize};

/// Name, type and fill level of one column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub name: String,
    pub dtype: String,
    /// Coarse category: numeric, categorical, datetime, binary or other.
    pub category: String,
    pub non_null_count: usize,
}

/// Table overview.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataInfo {
    pub rows: usize,
    pub columns: Vec<ColumnInfo>,
}

/// Descriptive statistics of one numeric column.
///
/// Quartiles use linear interpolation. `std` is the sample standard
/// deviation and is absent with fewer than two values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnStatistics {
    pub column: String,
    pub count: usize,
    pub mean: Option<f64>,
    pub std: Option<f64>,
    pub min: Option<f64>,
    #[serde(rename = "25%")]
    pub q25: Option<f64>,
    #[serde(rename = "50%")]
    pub median: Option<f64>,
    #[serde(rename = "75%")]
    pub q75: Option<f64>,
    pub max: Option<f64>,
}

/// Missing-value count of one column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissingValueSummary {
    pub column: String,
    pub missing_count: usize,
    pub missing_percentage: f64,
}

/// Loss ratio of one group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupLossRatio {
    pub group: String,
    pub total_claims: f64,
    pub total_premium: f64,
    /// `None` when the group's premium sum is zero.
    pub loss_ratio: Option<f64>,
}

/// Average claim amount of one vehicle make.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MakeClaims {
    pub make: String,
    pub avg_claim_amount: f64,
    pub count: usize,
}

/// Aggregates for one calendar month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyTrend {
    /// `YYYY-MM`
    pub month: String,
    pub claims_sum: f64,
    pub claims_mean: Option<f64>,
    pub claims_count: usize,
    pub premium_sum: f64,
    pub premium_mean: Option<f64>,
    pub policy_count: usize,
    pub loss_ratio: Option<f64>,
}

/// Claim and premium aggregates for one level of a vehicle attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelStatistics {
    pub level: String,
    pub claims_mean: Option<f64>,
    pub claims_sum: f64,
    pub claims_count: usize,
    pub premium_mean: Option<f64>,
    pub premium_sum: f64,
    pub loss_ratio: Option<f64>,
}

/// Per-level breakdown of one vehicle attribute, highest mean claim first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleCharacteristic {
    pub column: String,
    pub levels: Vec<LevelStatistics>,
}

/// One histogram bin, `[lower, upper)` except the last which is closed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistogramBin {
    pub lower: f64,
    pub upper: f64,
    pub count: usize,
}

/// Histogram of a numeric column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Histogram {
    pub column: String,
    pub bins: Vec<HistogramBin>,
}

/// Five-number summary with Tukey whiskers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoxPlotStats {
    pub column: String,
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub max: f64,
    /// Smallest value at or above `q1 - 1.5 * IQR`.
    pub lower_whisker: f64,
    /// Largest value at or below `q3 + 1.5 * IQR`.
    pub upper_whisker: f64,
    pub outlier_count: usize,
}

/// Everything the analyzer can compute for a table.
///
/// Sections that need conventionally named columns are `None` when those
/// columns are absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdaReport {
    pub data_info: DataInfo,
    pub summary_statistics: Vec<ColumnStatistics>,
    pub missing_values: Vec<MissingValueSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loss_ratio: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loss_ratio_by_group: Option<Vec<GroupLossRatio>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub claims_by_make: Option<Vec<MakeClaims>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temporal_trends: Option<Vec<MonthlyTrend>>,
    pub vehicle_characteristics: Vec<VehicleCharacteristic>,
}
