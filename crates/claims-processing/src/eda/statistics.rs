//! Numeric summaries behind the EDA report and plots.
//!
//! Every function takes a `Float64` series with NaN already turned into null
//! (see [`crate::utils::numeric_series`]).

use super::types::{BoxPlotStats, ColumnStatistics, Histogram, HistogramBin};
use polars::prelude::*;

/// Number of histogram bins used for distribution plots.
pub const DEFAULT_HISTOGRAM_BINS: usize = 30;

/// Tukey fence multiplier.
const WHISKER_IQR: f64 = 1.5;

/// Linearly interpolated quantile, `None` for an empty or all-null series.
fn quantile(values: &Series, q: f64) -> PolarsResult<Option<f64>> {
    let scalar = values.quantile_reduce(q, QuantileMethod::Linear)?;
    Ok(scalar.value().extract::<f64>())
}

/// Describe a column: count, mean, std, min, quartiles, max.
pub(crate) fn describe(values: &Series) -> PolarsResult<ColumnStatistics> {
    Ok(ColumnStatistics {
        column: values.name().to_string(),
        count: values.len() - values.null_count(),
        mean: values.mean(),
        std: values.std(1),
        min: values.min::<f64>()?,
        q25: quantile(values, 0.25)?,
        median: quantile(values, 0.5)?,
        q75: quantile(values, 0.75)?,
        max: values.max::<f64>()?,
    })
}

/// Equal-width histogram over the observed range.
///
/// A constant column gets a unit-wide range centred on its value. Returns no
/// bins when there are no values.
pub(crate) fn histogram(values: &Series, bins: usize) -> PolarsResult<Histogram> {
    let column = values.name().to_string();
    let bins = bins.max(1);

    let (Some(first), Some(last)) = (values.min::<f64>()?, values.max::<f64>()?) else {
        return Ok(Histogram {
            column,
            bins: Vec::new(),
        });
    };
    let (low, high) = if first == last {
        (first - 0.5, last + 0.5)
    } else {
        (first, last)
    };
    let width = (high - low) / bins as f64;

    let mut counts = vec![0usize; bins];
    for value in values.f64()?.into_iter().flatten() {
        let idx = (((value - low) / width).floor() as usize).min(bins - 1);
        counts[idx] += 1;
    }

    Ok(Histogram {
        column,
        bins: counts
            .into_iter()
            .enumerate()
            .map(|(i, count)| HistogramBin {
                lower: low + width * i as f64,
                upper: low + width * (i + 1) as f64,
                count,
            })
            .collect(),
    })
}

/// Box-plot statistics, `None` when the column has no values.
pub(crate) fn box_plot(values: &Series) -> PolarsResult<Option<BoxPlotStats>> {
    let (Some(q1), Some(median), Some(q3)) = (
        quantile(values, 0.25)?,
        quantile(values, 0.5)?,
        quantile(values, 0.75)?,
    ) else {
        return Ok(None);
    };
    let (Some(min), Some(max)) = (values.min::<f64>()?, values.max::<f64>()?) else {
        return Ok(None);
    };

    let iqr = q3 - q1;
    let present = values.f64()?;
    let mask = present.gt_eq(q1 - WHISKER_IQR * iqr) & present.lt_eq(q3 + WHISKER_IQR * iqr);
    let inside = present.filter(&mask)?;

    Ok(Some(BoxPlotStats {
        column: values.name().to_string(),
        min,
        q1,
        median,
        q3,
        max,
        lower_whisker: inside.min().unwrap_or(q1),
        upper_whisker: inside.max().unwrap_or(q3),
        outlier_count: values.len() - values.null_count() - inside.len(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(values: &[Option<f64>]) -> Series {
        Series::new("x".into(), values)
    }

    fn present(values: &[f64]) -> Series {
        Series::new("x".into(), values)
    }

    // ==================== describe tests ====================

    #[test]
    fn test_describe_matches_interpolated_quartiles() {
        let stats = describe(&present(&[1.0, 2.0, 3.0, 4.0])).unwrap();
        assert_eq!(stats.column, "x");
        assert_eq!(stats.count, 4);
        assert_eq!(stats.mean, Some(2.5));
        assert_eq!(stats.q25, Some(1.75));
        assert_eq!(stats.median, Some(2.5));
        assert_eq!(stats.q75, Some(3.25));
        assert_eq!(stats.min, Some(1.0));
        assert_eq!(stats.max, Some(4.0));
        assert!((stats.std.unwrap() - 1.290_994).abs() < 1e-6);
    }

    #[test]
    fn test_describe_skips_missing() {
        let stats = describe(&series(&[Some(5.0), None])).unwrap();
        assert_eq!(stats.count, 1);
        assert_eq!(stats.std, None);
        assert_eq!(stats.median, Some(5.0));
    }

    #[test]
    fn test_describe_empty() {
        let stats = describe(&series(&[None, None])).unwrap();
        assert_eq!(stats.count, 0);
        assert_eq!(stats.mean, None);
        assert_eq!(stats.median, None);
        assert_eq!(stats.max, None);
    }

    // ==================== histogram tests ====================

    #[test]
    fn test_histogram_counts_all_values() {
        let hist = histogram(&present(&[0.0, 1.0, 2.0, 3.0, 10.0]), 5).unwrap();
        assert_eq!(hist.bins.len(), 5);
        assert_eq!(hist.bins.iter().map(|b| b.count).sum::<usize>(), 5);
        // Max value lands in the last bin
        assert_eq!(hist.bins[4].count, 1);
        assert_eq!(hist.bins[0].lower, 0.0);
        assert_eq!(hist.bins[4].upper, 10.0);
    }

    #[test]
    fn test_histogram_constant_column() {
        let hist = histogram(&series(&[Some(2.0), None, Some(2.0)]), 4).unwrap();
        assert_eq!(hist.bins.iter().map(|b| b.count).sum::<usize>(), 2);
        assert_eq!(hist.bins[0].lower, 1.5);
    }

    #[test]
    fn test_histogram_empty() {
        assert!(histogram(&series(&[None]), 30).unwrap().bins.is_empty());
    }

    // ==================== box_plot tests ====================

    #[test]
    fn test_box_plot_flags_outlier() {
        let stats = box_plot(&series(&[Some(1.0), Some(2.0), None, Some(3.0), Some(4.0), Some(100.0)]))
            .unwrap()
            .unwrap();
        assert_eq!(stats.median, 3.0);
        assert_eq!(stats.q1, 2.0);
        assert_eq!(stats.q3, 4.0);
        assert_eq!(stats.lower_whisker, 1.0);
        assert_eq!(stats.upper_whisker, 4.0);
        assert_eq!(stats.outlier_count, 1);
        assert_eq!(stats.max, 100.0);
    }

    #[test]
    fn test_box_plot_empty() {
        assert!(box_plot(&present(&[])).unwrap().is_none());
    }
}
