//! Regression and binary classification metrics.

use crate::error::{LearningError, Result};
use crate::types::{ClassificationMetrics, RegressionMetrics};

fn check_lengths(y_true: &[f64], y_pred: &[f64]) -> Result<()> {
    if y_true.len() != y_pred.len() {
        return Err(LearningError::shape(
            format!("{} predictions", y_true.len()),
            y_pred.len(),
        ));
    }
    if y_true.is_empty() {
        return Err(LearningError::InvalidData(
            "cannot evaluate on zero samples".to_string(),
        ));
    }
    Ok(())
}

fn check_binary(values: &[f64], what: &str) -> Result<()> {
    if let Some(v) = values.iter().find(|&&v| v != 0.0 && v != 1.0) {
        return Err(LearningError::InvalidData(format!(
            "{} must be 0 or 1, found {}",
            what, v
        )));
    }
    Ok(())
}

/// RMSE, MAE and R² of `y_pred` against `y_true`.
pub fn regression_metrics(y_true: &[f64], y_pred: &[f64]) -> Result<RegressionMetrics> {
    check_lengths(y_true, y_pred)?;

    let n = y_true.len() as f64;
    let mean = y_true.iter().sum::<f64>() / n;
    let (ss_res, abs_err, ss_tot) = y_true.iter().zip(y_pred).fold(
        (0.0, 0.0, 0.0),
        |(res, abs, tot), (t, p)| (res + (t - p).powi(2), abs + (t - p).abs(), tot + (t - mean).powi(2)),
    );

    let r2 = if ss_tot > 0.0 {
        1.0 - ss_res / ss_tot
    } else if ss_res == 0.0 {
        1.0
    } else {
        0.0
    };

    Ok(RegressionMetrics {
        rmse: (ss_res / n).sqrt(),
        mae: abs_err / n,
        r2,
        n_samples: y_true.len(),
    })
}

/// Accuracy, precision, recall, F1 and ROC-AUC of hard 0/1 predictions.
pub fn classification_metrics(y_true: &[f64], y_pred: &[f64]) -> Result<ClassificationMetrics> {
    check_lengths(y_true, y_pred)?;
    check_binary(y_true, "true labels")?;
    check_binary(y_pred, "predicted labels")?;

    let (mut tp, mut fp, mut tn, mut fn_) = (0usize, 0usize, 0usize, 0usize);
    for (&t, &p) in y_true.iter().zip(y_pred) {
        match (t == 1.0, p == 1.0) {
            (true, true) => tp += 1,
            (false, true) => fp += 1,
            (false, false) => tn += 1,
            (true, false) => fn_ += 1,
        }
    }

    let ratio = |num: usize, den: usize| if den == 0 { 0.0 } else { num as f64 / den as f64 };
    let precision = ratio(tp, tp + fp);
    let recall = ratio(tp, tp + fn_);
    let f1 = if precision + recall > 0.0 {
        2.0 * precision * recall / (precision + recall)
    } else {
        0.0
    };

    Ok(ClassificationMetrics {
        accuracy: ratio(tp + tn, y_true.len()),
        precision,
        recall,
        f1,
        roc_auc: roc_auc_score(y_true, y_pred)?,
        n_samples: y_true.len(),
    })
}

/// Area under the ROC curve of `scores` for 0/1 labels.
///
/// Computed as the Mann-Whitney statistic with average ranks for ties.
/// Returns `None` when `y_true` holds a single class.
pub fn roc_auc_score(y_true: &[f64], scores: &[f64]) -> Result<Option<f64>> {
    check_lengths(y_true, scores)?;
    check_binary(y_true, "true labels")?;

    let n_pos = y_true.iter().filter(|&&y| y == 1.0).count();
    let n_neg = y_true.len() - n_pos;
    if n_pos == 0 || n_neg == 0 {
        return Ok(None);
    }

    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[a].total_cmp(&scores[b]));

    let mut pos_rank_sum = 0.0;
    let mut start = 0;
    while start < order.len() {
        let mut end = start;
        while end + 1 < order.len() && scores[order[end + 1]] == scores[order[start]] {
            end += 1;
        }
        // Ranks are 1-based; tied scores share the mean rank
        let avg_rank = (start + end) as f64 / 2.0 + 1.0;
        for &idx in &order[start..=end] {
            if y_true[idx] == 1.0 {
                pos_rank_sum += avg_rank;
            }
        }
        start = end + 1;
    }

    let n_pos_f = n_pos as f64;
    let u = pos_rank_sum - n_pos_f * (n_pos_f + 1.0) / 2.0;
    Ok(Some(u / (n_pos_f * n_neg as f64)))
}
