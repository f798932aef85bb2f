//! Exploratory analysis of claims tables.
//!
//! [`EdaAnalyzer`] computes the descriptive statistics, loss-ratio
//! breakdowns and time series an analyst looks at before modeling, and the
//! aggregated series (histograms, box plots) that plots are drawn from.

mod statistics;
mod types;

pub use statistics::DEFAULT_HISTOGRAM_BINS;
pub use types::{
    BoxPlotStats, ColumnInfo, ColumnStatistics, DataInfo, EdaReport, GroupLossRatio, Histogram,
    HistogramBin, LevelStatistics, MakeClaims, MissingValueSummary, MonthlyTrend,
    VehicleCharacteristic,
};

use crate::dates::{coerce_to_date, month_periods};
use crate::error::{ProcessingError, Result};
use crate::schema::{
    MAKE, POLICY_ID, SchemaCheck, TOTAL_CLAIMS, TOTAL_PREMIUM, TRANSACTION_MONTH, has_column,
};
use crate::utils::{
    DtypeCategory, dtype_category_str, get_dtype_category, is_numeric_dtype, missing_fraction,
    numeric_series, series_to_f64, series_to_strings,
};
use polars::prelude::*;
use tracing::{debug, info, warn};

/// Vehicle attributes broken down by [`EdaAnalyzer::vehicle_characteristics`].
pub const VEHICLE_COLUMNS: [&str; 8] = [
    "VehicleType",
    "make",
    "Model",
    "RegistrationYear",
    "Cylinders",
    "cubiccapacity",
    "kilowatts",
    "bodytype",
];

/// Default number of makes returned by [`EdaAnalyzer::claims_by_make`].
pub const DEFAULT_TOP_MAKES: usize = 10;

// Column names of the grouped frames built by the analyzer.
const LEVEL: &str = "level";
const CLAIMS: &str = "claims";
const PREMIUM: &str = "premium";
const CLAIMS_SUM: &str = "claims_sum";
const CLAIMS_MEAN: &str = "claims_mean";
const CLAIMS_COUNT: &str = "claims_count";
const PREMIUM_SUM: &str = "premium_sum";
const PREMIUM_MEAN: &str = "premium_mean";
const POLICY_COUNT: &str = "policy_count";
const LOSS_RATIO: &str = "loss_ratio";

/// A money column as `Float64` with NaN treated as missing.
fn amount(name: &str, alias: &str) -> Expr {
    col(name)
        .cast(DataType::Float64)
        .fill_nan(lit(NULL))
        .alias(alias)
}

/// Group key as text; rows with a missing key are dropped later.
fn level_key(name: &str) -> Expr {
    col(name).cast(DataType::String).alias(LEVEL)
}

/// Claim and premium aggregates shared by every grouped view.
fn financial_aggregates() -> Vec<Expr> {
    vec![
        col(CLAIMS).sum().alias(CLAIMS_SUM),
        col(CLAIMS).mean().alias(CLAIMS_MEAN),
        col(CLAIMS).count().alias(CLAIMS_COUNT),
        col(PREMIUM).sum().alias(PREMIUM_SUM),
        col(PREMIUM).mean().alias(PREMIUM_MEAN),
    ]
}

/// Claims over premium per group, null when the premium sum is zero.
fn loss_ratio_expr() -> Expr {
    when(col(PREMIUM_SUM).neq(lit(0.0)))
        .then(col(CLAIMS_SUM) / col(PREMIUM_SUM))
        .otherwise(lit(NULL))
        .alias(LOSS_RATIO)
}

/// Sort on `metric` descending with nulls last, ties broken by level.
fn by_metric_desc(lf: LazyFrame, metric: &str) -> LazyFrame {
    lf.sort(
        [metric, LEVEL],
        SortMultipleOptions::default()
            .with_order_descending_multi([true, false])
            .with_nulls_last(true),
    )
}

fn float_values(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
    Ok(series_to_f64(df.column(name)?.as_materialized_series())?)
}

fn count_values(df: &DataFrame, name: &str) -> Result<Vec<usize>> {
    Ok(float_values(df, name)?
        .into_iter()
        .map(|v| v.unwrap_or(0.0) as usize)
        .collect())
}

fn level_values(df: &DataFrame) -> Result<Vec<String>> {
    Ok(series_to_strings(df.column(LEVEL)?.as_materialized_series())?
        .into_iter()
        .map(Option::unwrap_or_default)
        .collect())
}

/// Exploratory analyzer over a claims table.
///
/// The transaction month column, when present, is parsed leniently on
/// construction; unparseable values become missing.
#[derive(Debug, Clone)]
pub struct EdaAnalyzer {
    df: DataFrame,
}

impl EdaAnalyzer {
    pub fn new(mut df: DataFrame) -> Self {
        if let Ok(column) = df.column(TRANSACTION_MONTH)
            && !matches!(column.dtype(), DataType::Date)
        {
            let raw = column.as_materialized_series().clone();
            match coerce_to_date(&raw) {
                Ok(parsed) => {
                    if let Err(e) = df.replace(TRANSACTION_MONTH, parsed) {
                        warn!("Could not replace '{}': {}", TRANSACTION_MONTH, e);
                    }
                }
                Err(e) => warn!("Could not parse '{}' as dates: {}", TRANSACTION_MONTH, e),
            }
        }
        Self { df }
    }

    /// The analyzed table.
    pub fn frame(&self) -> &DataFrame {
        &self.df
    }

    /// Column names, dtypes and non-null counts.
    pub fn data_info(&self) -> DataInfo {
        DataInfo {
            rows: self.df.height(),
            columns: self
                .df
                .get_columns()
                .iter()
                .map(|col| ColumnInfo {
                    name: col.name().to_string(),
                    dtype: col.dtype().to_string(),
                    category: dtype_category_str(col.dtype()).to_string(),
                    non_null_count: col.len() - col.null_count(),
                })
                .collect(),
        }
    }

    /// Descriptive statistics for every numeric column.
    pub fn summary_statistics(&self) -> Result<Vec<ColumnStatistics>> {
        self.df
            .get_columns()
            .iter()
            .filter(|col| is_numeric_dtype(col.dtype()))
            .map(|col| -> Result<ColumnStatistics> {
                let values = numeric_series(col.as_materialized_series())?;
                Ok(statistics::describe(&values)?)
            })
            .collect()
    }

    /// Missing counts and percentages, most incomplete column first.
    pub fn missing_values(&self) -> Vec<MissingValueSummary> {
        let mut summary: Vec<MissingValueSummary> = self
            .df
            .get_columns()
            .iter()
            .map(|col| {
                let series = col.as_materialized_series();
                let fraction = missing_fraction(series);
                MissingValueSummary {
                    column: col.name().to_string(),
                    missing_count: (fraction * series.len() as f64).round() as usize,
                    missing_percentage: fraction * 100.0,
                }
            })
            .collect();
        summary.sort_by(|a, b| b.missing_count.cmp(&a.missing_count));
        summary
    }

    /// Overall loss ratio, `None` when total premium is zero.
    pub fn loss_ratio(&self) -> Result<Option<f64>> {
        SchemaCheck::require(&self.df, &[TOTAL_CLAIMS, TOTAL_PREMIUM])?;
        let claims_sum = self.numeric(TOTAL_CLAIMS)?.sum::<f64>()?;
        let premium_sum = self.numeric(TOTAL_PREMIUM)?.sum::<f64>()?;
        let lr = (premium_sum != 0.0).then(|| claims_sum / premium_sum);
        info!("Overall loss ratio: {:?}", lr);
        Ok(lr)
    }

    /// Loss ratio per value of `group`, highest first.
    ///
    /// Groups with zero premium sort last. Rows whose group value is missing
    /// are skipped.
    pub fn loss_ratio_by(&self, group: &str) -> Result<Vec<GroupLossRatio>> {
        SchemaCheck::require(&self.df, &[group, TOTAL_CLAIMS, TOTAL_PREMIUM])?;

        let grouped = by_metric_desc(self.level_aggregates(group), LOSS_RATIO).collect()?;

        let claims_sum = float_values(&grouped, CLAIMS_SUM)?;
        let premium_sum = float_values(&grouped, PREMIUM_SUM)?;
        let loss_ratio = float_values(&grouped, LOSS_RATIO)?;
        Ok(level_values(&grouped)?
            .into_iter()
            .enumerate()
            .map(|(i, group)| GroupLossRatio {
                group,
                total_claims: claims_sum[i].unwrap_or(0.0),
                total_premium: premium_sum[i].unwrap_or(0.0),
                loss_ratio: loss_ratio[i],
            })
            .collect())
    }

    /// Mean claim amount and count per make, highest mean first.
    pub fn claims_by_make(&self, top_n: usize) -> Result<Vec<MakeClaims>> {
        SchemaCheck::require(&self.df, &[MAKE, TOTAL_CLAIMS])?;

        let grouped = self
            .df
            .clone()
            .lazy()
            .select([level_key(MAKE), amount(TOTAL_CLAIMS, CLAIMS)])
            .filter(col(LEVEL).is_not_null())
            .group_by([col(LEVEL)])
            .agg([
                col(CLAIMS).mean().alias(CLAIMS_MEAN),
                col(CLAIMS).count().alias(CLAIMS_COUNT),
            ])
            .filter(col(CLAIMS_COUNT).gt(lit(0)));
        let grouped = by_metric_desc(grouped, CLAIMS_MEAN)
            .collect()?
            .head(Some(top_n));

        let means = float_values(&grouped, CLAIMS_MEAN)?;
        let counts = count_values(&grouped, CLAIMS_COUNT)?;
        Ok(level_values(&grouped)?
            .into_iter()
            .enumerate()
            .map(|(i, make)| MakeClaims {
                make,
                avg_claim_amount: means[i].unwrap_or(0.0),
                count: counts[i],
            })
            .collect())
    }

    /// Monthly claim, premium and policy aggregates in chronological order.
    ///
    /// Policies are the non-null `PolicyID` values of the month, or its row
    /// count when the table has no policy column.
    pub fn temporal_trends(&self) -> Result<Vec<MonthlyTrend>> {
        SchemaCheck::require(&self.df, &[TRANSACTION_MONTH, TOTAL_CLAIMS, TOTAL_PREMIUM])?;

        let months = month_periods(self.df.column(TRANSACTION_MONTH)?.as_materialized_series())?;
        let has_policies = has_column(&self.df, POLICY_ID);
        let mut selected = vec![TOTAL_CLAIMS, TOTAL_PREMIUM];
        if has_policies {
            selected.push(POLICY_ID);
        }
        let mut frame = self.df.select(selected)?;
        frame.with_column(Series::new(LEVEL.into(), months))?;

        let policies = if has_policies {
            col(POLICY_ID).count()
        } else {
            len()
        };
        let mut aggregates = financial_aggregates();
        aggregates.push(policies.alias(POLICY_COUNT));

        let mut columns = vec![
            col(LEVEL),
            amount(TOTAL_CLAIMS, CLAIMS),
            amount(TOTAL_PREMIUM, PREMIUM),
        ];
        if has_policies {
            columns.push(col(POLICY_ID));
        }

        let grouped = frame
            .lazy()
            .select(columns)
            .filter(col(LEVEL).is_not_null())
            .group_by([col(LEVEL)])
            .agg(aggregates)
            .with_column(loss_ratio_expr())
            .sort([LEVEL], SortMultipleOptions::default())
            .collect()?;
        debug!("Computed trends for {} months", grouped.height());

        let claims_sum = float_values(&grouped, CLAIMS_SUM)?;
        let claims_mean = float_values(&grouped, CLAIMS_MEAN)?;
        let claims_count = count_values(&grouped, CLAIMS_COUNT)?;
        let premium_sum = float_values(&grouped, PREMIUM_SUM)?;
        let premium_mean = float_values(&grouped, PREMIUM_MEAN)?;
        let policy_count = count_values(&grouped, POLICY_COUNT)?;
        let loss_ratio = float_values(&grouped, LOSS_RATIO)?;
        Ok(level_values(&grouped)?
            .into_iter()
            .enumerate()
            .map(|(i, month)| MonthlyTrend {
                month,
                claims_sum: claims_sum[i].unwrap_or(0.0),
                claims_mean: claims_mean[i],
                claims_count: claims_count[i],
                premium_sum: premium_sum[i].unwrap_or(0.0),
                premium_mean: premium_mean[i],
                policy_count: policy_count[i],
                loss_ratio: loss_ratio[i],
            })
            .collect())
    }

    /// Claim and premium aggregates per level of each vehicle attribute
    /// present in the table.
    pub fn vehicle_characteristics(&self) -> Result<Vec<VehicleCharacteristic>> {
        SchemaCheck::require(&self.df, &[TOTAL_CLAIMS, TOTAL_PREMIUM])?;

        VEHICLE_COLUMNS
            .iter()
            .filter(|col| has_column(&self.df, col))
            .map(|column| -> Result<VehicleCharacteristic> {
                let grouped =
                    by_metric_desc(self.level_aggregates(column), CLAIMS_MEAN).collect()?;

                let claims_mean = float_values(&grouped, CLAIMS_MEAN)?;
                let claims_sum = float_values(&grouped, CLAIMS_SUM)?;
                let claims_count = count_values(&grouped, CLAIMS_COUNT)?;
                let premium_mean = float_values(&grouped, PREMIUM_MEAN)?;
                let premium_sum = float_values(&grouped, PREMIUM_SUM)?;
                let loss_ratio = float_values(&grouped, LOSS_RATIO)?;
                let levels = level_values(&grouped)?
                    .into_iter()
                    .enumerate()
                    .map(|(i, level)| LevelStatistics {
                        level,
                        claims_mean: claims_mean[i],
                        claims_sum: claims_sum[i].unwrap_or(0.0),
                        claims_count: claims_count[i],
                        premium_mean: premium_mean[i],
                        premium_sum: premium_sum[i].unwrap_or(0.0),
                        loss_ratio: loss_ratio[i],
                    })
                    .collect();
                Ok(VehicleCharacteristic {
                    column: column.to_string(),
                    levels,
                })
            })
            .collect()
    }

    /// Histogram of a numeric column with `bins` equal-width bins.
    pub fn distribution(&self, column: &str, bins: usize) -> Result<Histogram> {
        let values = self.numeric_column(column)?;
        Ok(statistics::histogram(&values, bins)?)
    }

    /// Box-plot statistics of a numeric column.
    pub fn boxplot_stats(&self, column: &str) -> Result<BoxPlotStats> {
        let values = self.numeric_column(column)?;
        statistics::box_plot(&values)?.ok_or_else(|| {
            ProcessingError::InvalidConfig(format!("column '{}' has no values", column))
        })
    }

    /// Compute every section that the table's columns allow.
    pub fn report(&self, group_by: Option<&str>, top_n: usize) -> Result<EdaReport> {
        info!(
            "Building EDA report for {} rows x {} columns",
            self.df.height(),
            self.df.width()
        );
        let has_financials = SchemaCheck::of(&self.df, &[TOTAL_CLAIMS, TOTAL_PREMIUM]).is_valid();

        let loss_ratio_by_group = match group_by {
            Some(group) if has_financials => Some(self.loss_ratio_by(group)?),
            _ => None,
        };
        let claims_by_make = if SchemaCheck::of(&self.df, &[MAKE, TOTAL_CLAIMS]).is_valid() {
            Some(self.claims_by_make(top_n)?)
        } else {
            None
        };
        let temporal_trends = if has_financials && has_column(&self.df, TRANSACTION_MONTH) {
            Some(self.temporal_trends()?)
        } else {
            None
        };

        Ok(EdaReport {
            data_info: self.data_info(),
            summary_statistics: self.summary_statistics()?,
            missing_values: self.missing_values(),
            loss_ratio: if has_financials { self.loss_ratio()? } else { None },
            loss_ratio_by_group,
            claims_by_make,
            temporal_trends,
            vehicle_characteristics: if has_financials {
                self.vehicle_characteristics()?
            } else {
                Vec::new()
            },
        })
    }

    fn numeric(&self, name: &str) -> Result<Series> {
        Ok(numeric_series(self.df.column(name)?.as_materialized_series())?)
    }

    /// Like `numeric` but checks presence and type first.
    fn numeric_column(&self, column: &str) -> Result<Series> {
        let col = self
            .df
            .column(column)
            .map_err(|_| ProcessingError::ColumnNotFound(column.to_string()))?;
        if get_dtype_category(col.dtype()) != DtypeCategory::Numeric {
            return Err(ProcessingError::UnexpectedType {
                column: column.to_string(),
                dtype: col.dtype().to_string(),
                expected: "numeric".to_string(),
            });
        }
        self.numeric(column)
    }

    /// Claim/premium aggregates and loss ratio per non-missing value of
    /// `group`, unsorted.
    fn level_aggregates(&self, group: &str) -> LazyFrame {
        self.df
            .clone()
            .lazy()
            .select([
                level_key(group),
                amount(TOTAL_CLAIMS, CLAIMS),
                amount(TOTAL_PREMIUM, PREMIUM),
            ])
            .filter(col(LEVEL).is_not_null())
            .group_by([col(LEVEL)])
            .agg(financial_aggregates())
            .with_column(loss_ratio_expr())
    }
}
