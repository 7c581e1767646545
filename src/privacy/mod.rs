//! Differential privacy: calibrated noise under a cumulative epsilon budget.
//!
//! - [`budget`] - the `(total, used)` epsilon ledger
//! - [`mechanism`] - Laplace/Gaussian calibration and sampling
//! - [`sensitivity`] - leave-one-out sensitivity estimation
//!
//! Budget accounting uses basic sequential composition: each successful
//! noising call spends its epsilon, regardless of how many values it noises.

pub mod budget;
pub mod mechanism;
pub mod sensitivity;

pub use budget::{BudgetReport, PrivacyBudget};
pub use mechanism::{calibrated_noise, validate_privacy_params, NoiseMechanism};
pub use sensitivity::estimate_sensitivity;

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, info, warn};

use crate::error::PrivacyError;

/// Default total epsilon.
pub const DEFAULT_TOTAL_BUDGET: f64 = 1.0;

struct BudgetState {
    budget: PrivacyBudget,
    rng: StdRng,
}

/// Adds calibrated noise to values while enforcing an epsilon budget.
///
/// The budget check, the noise draw and the spend happen under one lock, so
/// two concurrent callers can never both pass a check only one of them fits.
///
/// # Example
///
/// ```rust
/// use ppml_core::PrivacyBudgetManager;
///
/// let dp = PrivacyBudgetManager::new(1.0).unwrap();
/// let noisy = dp.add_noise(10.0, 0.4, 1.0, None).unwrap();
/// assert!(noisy.is_finite());
/// assert!((dp.remaining_budget() - 0.6).abs() < 1e-12);
/// assert!(dp.add_noise(10.0, 0.7, 1.0, None).is_err());
/// ```
pub struct PrivacyBudgetManager {
    state: Mutex<BudgetState>,
}

impl PrivacyBudgetManager {
    /// Create a manager with `total` epsilon, seeded from OS entropy.
    pub fn new(total: f64) -> Result<Self, PrivacyError> {
        Self::from_rng(total, StdRng::from_entropy())
    }

    /// Create a deterministic manager, for reproducible runs.
    pub fn with_seed(total: f64, seed: u64) -> Result<Self, PrivacyError> {
        Self::from_rng(total, StdRng::seed_from_u64(seed))
    }

    fn from_rng(total: f64, rng: StdRng) -> Result<Self, PrivacyError> {
        Ok(Self {
            state: Mutex::new(BudgetState {
                budget: PrivacyBudget::new(total)?,
                rng,
            }),
        })
    }

    /// Scale of the noise `add_noise` would draw for these parameters.
    pub fn calibrated_noise(
        &self,
        mechanism: NoiseMechanism,
        sensitivity: f64,
        epsilon: f64,
        delta: Option<f64>,
    ) -> Result<f64, PrivacyError> {
        calibrated_noise(mechanism, sensitivity, epsilon, delta)
    }

    /// Add one noise sample to `value`, spending `epsilon`.
    ///
    /// Draws Laplace noise when `delta` is `None` and Gaussian noise
    /// otherwise. Fails with [`PrivacyError::BudgetExhausted`] without
    /// spending anything if `epsilon` exceeds the remaining budget.
    pub fn add_noise(
        &self,
        value: f64,
        epsilon: f64,
        sensitivity: f64,
        delta: Option<f64>,
    ) -> Result<f64, PrivacyError> {
        let noisy = self.add_noise_batch(&[value], epsilon, sensitivity, delta)?;
        Ok(noisy[0])
    }

    /// Add independent noise to every value, spending `epsilon` once.
    pub fn add_noise_batch(
        &self,
        values: &[f64],
        epsilon: f64,
        sensitivity: f64,
        delta: Option<f64>,
    ) -> Result<Vec<f64>, PrivacyError> {
        if values.is_empty() {
            return Err(PrivacyError::EmptyDataset);
        }
        if values.iter().any(|v| !v.is_finite()) {
            return Err(PrivacyError::InvalidInput(
                "values must be finite".to_string(),
            ));
        }
        let kind = NoiseMechanism::for_delta(delta);
        let scale = calibrated_noise(kind, sensitivity, epsilon, delta)?;

        let mut state = self.state.lock();
        if !state.budget.can_spend(epsilon) {
            warn!(
                requested = epsilon,
                remaining = state.budget.remaining(),
                "privacy budget exhausted"
            );
            return Err(PrivacyError::BudgetExhausted {
                requested: epsilon,
                remaining: state.budget.remaining(),
            });
        }

        let BudgetState { budget, rng } = &mut *state;
        let noisy = values
            .iter()
            .map(|&v| mechanism::sample(kind, scale, &mut *rng).map(|n| v + n))
            .collect::<Result<Vec<_>, _>>()?;
        budget.spend(epsilon)?;

        debug!(
            mechanism = ?kind,
            scale,
            epsilon,
            n_values = values.len(),
            remaining = budget.remaining(),
            "noise added"
        );
        Ok(noisy)
    }

    /// Epsilon still available.
    pub fn remaining_budget(&self) -> f64 {
        self.state.lock().budget.remaining()
    }

    /// Total epsilon.
    pub fn total_budget(&self) -> f64 {
        self.state.lock().budget.total()
    }

    /// Epsilon spent so far.
    pub fn used_budget(&self) -> f64 {
        self.state.lock().budget.used()
    }

    /// Snapshot of the budget.
    pub fn report(&self) -> BudgetReport {
        self.state.lock().budget.report()
    }

    /// Forget all spending. An explicit operator action; never automatic.
    pub fn reset(&self) {
        self.state.lock().budget.reset();
        info!("privacy budget reset");
    }

    /// Leave-one-out sensitivity of `aggregate` on `dataset`.
    ///
    /// Spends no budget. See [`sensitivity::estimate_sensitivity`].
    pub fn estimate_sensitivity<F>(&self, dataset: &[f64], aggregate: F) -> Result<f64, PrivacyError>
    where
        F: Fn(&[f64]) -> f64 + Sync,
    {
        estimate_sensitivity(dataset, aggregate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_budget_monotonicity() {
        let dp = PrivacyBudgetManager::with_seed(1.0, 1).unwrap();
        dp.add_noise(5.0, 0.3, 1.0, None).unwrap();
        assert!((dp.remaining_budget() - 0.7).abs() < 1e-12);

        let err = dp.add_noise(5.0, 0.8, 1.0, None).unwrap_err();
        assert!(matches!(err, PrivacyError::BudgetExhausted { .. }));
        assert!((dp.remaining_budget() - 0.7).abs() < 1e-12);
    }

    #[test]
    fn test_batch_spends_once() {
        let dp = PrivacyBudgetManager::with_seed(1.0, 2).unwrap();
        let noisy = dp.add_noise_batch(&[1.0, 2.0, 3.0], 0.5, 1.0, None).unwrap();
        assert_eq!(noisy.len(), 3);
        assert!((dp.used_budget() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_batch_draws_independent_noise() {
        let dp = PrivacyBudgetManager::with_seed(1.0, 3).unwrap();
        let noisy = dp.add_noise_batch(&[0.0, 0.0], 0.5, 1.0, None).unwrap();
        assert_ne!(noisy[0], noisy[1]);
    }

    #[test]
    fn test_invalid_params_spend_nothing() {
        let dp = PrivacyBudgetManager::with_seed(1.0, 4).unwrap();
        assert!(dp.add_noise(1.0, -0.1, 1.0, None).is_err());
        assert!(dp.add_noise(1.0, 0.1, 1.0, Some(2.0)).is_err());
        assert!(dp.add_noise_batch(&[], 0.1, 1.0, None).is_err());
        assert_eq!(dp.used_budget(), 0.0);
    }

    #[test]
    fn test_reset_restores_budget() {
        let dp = PrivacyBudgetManager::with_seed(1.0, 5).unwrap();
        dp.add_noise(0.0, 1.0, 1.0, None).unwrap();
        assert!(dp.add_noise(0.0, 0.1, 1.0, None).is_err());
        dp.reset();
        assert_eq!(dp.remaining_budget(), 1.0);
        assert!(dp.add_noise(0.0, 0.1, 1.0, None).is_ok());
    }

    #[test]
    fn test_gaussian_path() {
        let dp = PrivacyBudgetManager::with_seed(1.0, 6).unwrap();
        let noisy = dp.add_noise(100.0, 0.5, 1.0, Some(1e-5)).unwrap();
        assert!(noisy.is_finite());
        assert!((dp.remaining_budget() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_report() {
        let dp = PrivacyBudgetManager::with_seed(2.0, 7).unwrap();
        dp.add_noise(0.0, 0.5, 1.0, None).unwrap();
        let report = dp.report();
        assert_eq!(report.total, 2.0);
        assert!((report.remaining - 1.5).abs() < 1e-12);
    }
}
