//! Cumulative epsilon accounting.

use serde::{Deserialize, Serialize};

use crate::error::PrivacyError;

/// Absolute slack allowed when comparing spend against the total, so that
/// e.g. ten spends of `0.1` fit a total of `1.0` despite rounding.
pub const BUDGET_TOLERANCE: f64 = 1e-12;

/// Epsilon budget: a fixed `total` and a monotonically growing `used`.
///
/// `used <= total` always holds; a spend that would break it is refused and
/// changes nothing.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PrivacyBudget {
    total: f64,
    used: f64,
}

impl PrivacyBudget {
    /// Create a fresh budget. `total` must be positive and finite.
    pub fn new(total: f64) -> Result<Self, PrivacyError> {
        if !(total.is_finite() && total > 0.0) {
            return Err(PrivacyError::InvalidInput(format!(
                "total budget must be positive, got {}",
                total
            )));
        }
        Ok(Self { total, used: 0.0 })
    }

    /// Total epsilon.
    pub fn total(&self) -> f64 {
        self.total
    }

    /// Epsilon spent so far.
    pub fn used(&self) -> f64 {
        self.used
    }

    /// Epsilon still available.
    pub fn remaining(&self) -> f64 {
        self.total - self.used
    }

    /// Whether `epsilon` more can be spent.
    pub fn can_spend(&self, epsilon: f64) -> bool {
        self.used + epsilon <= self.total + BUDGET_TOLERANCE
    }

    /// Spend `epsilon`, or fail with [`PrivacyError::BudgetExhausted`] and
    /// leave the budget unchanged.
    pub fn spend(&mut self, epsilon: f64) -> Result<(), PrivacyError> {
        if !self.can_spend(epsilon) {
            return Err(PrivacyError::BudgetExhausted {
                requested: epsilon,
                remaining: self.remaining(),
            });
        }
        self.used = (self.used + epsilon).min(self.total);
        Ok(())
    }

    /// Forget all spending.
    pub fn reset(&mut self) {
        self.used = 0.0;
    }

    /// Serializable snapshot.
    pub fn report(&self) -> BudgetReport {
        BudgetReport {
            total: self.total,
            used: self.used,
            remaining: self.remaining(),
        }
    }
}

/// Point-in-time view of a budget.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BudgetReport {
    /// Total epsilon
    pub total: f64,
    /// Epsilon spent
    pub used: f64,
    /// Epsilon available
    pub remaining: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spend_and_remaining() {
        let mut budget = PrivacyBudget::new(1.0).unwrap();
        budget.spend(0.25).unwrap();
        assert!((budget.remaining() - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_overspend_is_refused() {
        let mut budget = PrivacyBudget::new(1.0).unwrap();
        budget.spend(0.6).unwrap();
        let err = budget.spend(0.5).unwrap_err();
        assert!(matches!(err, PrivacyError::BudgetExhausted { .. }));
        assert!((budget.used() - 0.6).abs() < 1e-12);
    }

    #[test]
    fn test_many_small_spends_fill_budget() {
        let mut budget = PrivacyBudget::new(1.0).unwrap();
        for _ in 0..10 {
            budget.spend(0.1).unwrap();
        }
        assert!(budget.used() <= budget.total());
        assert!(budget.spend(0.1).is_err());
    }

    #[test]
    fn test_reset() {
        let mut budget = PrivacyBudget::new(2.0).unwrap();
        budget.spend(2.0).unwrap();
        budget.reset();
        assert_eq!(budget.used(), 0.0);
        assert_eq!(budget.remaining(), 2.0);
    }

    #[test]
    fn test_invalid_total() {
        assert!(PrivacyBudget::new(0.0).is_err());
        assert!(PrivacyBudget::new(f64::INFINITY).is_err());
    }

    #[test]
    fn test_report_serde() {
        let mut budget = PrivacyBudget::new(1.0).unwrap();
        budget.spend(0.5).unwrap();
        let json = serde_json::to_string(&budget.report()).unwrap();
        let report: BudgetReport = serde_json::from_str(&json).unwrap();
        assert_eq!(report, budget.report());
    }
}
