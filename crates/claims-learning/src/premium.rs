//! Risk-based premium calculation.
//!
//! ```text
//! premium = (P(claim) × expected severity + expense loading) × (1 + profit margin)
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{LearningError, Result};

/// Loadings added on top of the expected loss.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PremiumParams {
    /// Flat expense amount added per policy (default: 500).
    pub expense_loading: f64,
    /// Proportional profit margin (default: 0.10).
    pub profit_margin: f64,
}

impl Default for PremiumParams {
    fn default() -> Self {
        Self {
            expense_loading: 500.0,
            profit_margin: 0.10,
        }
    }
}

impl PremiumParams {
    pub fn validate(&self) -> Result<()> {
        if !(self.expense_loading.is_finite() && self.expense_loading >= 0.0) {
            return Err(LearningError::InvalidConfig(format!(
                "expense_loading must be a non-negative number, got {}",
                self.expense_loading
            )));
        }
        if !(self.profit_margin.is_finite() && self.profit_margin > -1.0) {
            return Err(LearningError::InvalidConfig(format!(
                "profit_margin must be greater than -1.0, got {}",
                self.profit_margin
            )));
        }
        Ok(())
    }

    /// Premium for one policy.
    #[inline]
    pub fn premium(&self, prob_claim: f64, severity_pred: f64) -> f64 {
        calculate_risk_based_premium(
            prob_claim,
            severity_pred,
            self.expense_loading,
            self.profit_margin,
        )
    }
}

/// Risk-based premium for a single policy.
///
/// ```
/// use claims_learning::calculate_risk_based_premium;
///
/// let premium = calculate_risk_based_premium(0.1, 1000.0, 500.0, 0.1);
/// assert!((premium - 605.0).abs() < 1e-9);
/// ```
#[inline]
pub fn calculate_risk_based_premium(
    prob_claim: f64,
    severity_pred: f64,
    expense_loading: f64,
    profit_margin: f64,
) -> f64 {
    (prob_claim * severity_pred + expense_loading) * (1.0 + profit_margin)
}

/// Price every policy of a portfolio.
///
/// Fails with `ShapeMismatch` when the two prediction vectors differ in length.
pub fn price_portfolio(
    prob_claim: &[f64],
    severity_pred: &[f64],
    params: &PremiumParams,
) -> Result<Vec<f64>> {
    if prob_claim.len() != severity_pred.len() {
        return Err(LearningError::shape(
            format!("{} severity predictions", prob_claim.len()),
            severity_pred.len(),
        ));
    }
    Ok(prob_claim
        .iter()
        .zip(severity_pred)
        .map(|(&p, &s)| params.premium(p, s))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_premium() {
        let premium = calculate_risk_based_premium(0.1, 1000.0, 500.0, 0.1);
        assert!((premium - 605.0).abs() < 1e-9);
        assert!((PremiumParams::default().premium(0.1, 1000.0) - 605.0).abs() < 1e-9);
    }

    #[test]
    fn test_zero_risk_pays_loaded_expenses() {
        let premium = calculate_risk_based_premium(0.0, 1_000_000.0, 500.0, 0.2);
        assert!((premium - 600.0).abs() < 1e-9);
    }

    #[test]
    fn test_price_portfolio() {
        let prices =
            price_portfolio(&[0.1, 0.5], &[1000.0, 2000.0], &PremiumParams::default()).unwrap();
        assert!((prices[0] - 605.0).abs() < 1e-9);
        assert!((prices[1] - 1650.0).abs() < 1e-9);
    }

    #[test]
    fn test_price_portfolio_length_mismatch() {
        let err = price_portfolio(&[0.1], &[], &PremiumParams::default()).unwrap_err();
        assert_eq!(err.error_code(), "SHAPE_MISMATCH");
    }

    #[test]
    fn test_validate() {
        assert!(PremiumParams::default().validate().is_ok());
        let bad = PremiumParams {
            profit_margin: -1.0,
            ..PremiumParams::default()
        };
        assert!(bad.validate().unwrap_err().to_string().contains("profit_margin"));
    }
}
