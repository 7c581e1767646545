//! Secure aggregation of scalars via Shamir shares.
//!
//! Each value is shared independently. Party `i` only ever adds up the
//! shares it holds (its *partial*); because shares at the same index add
//! like the secrets they hide, the vector of partials is itself a valid
//! share set of the total, and is the only thing ever reconstructed.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::PrivacyError;
use crate::sharing::{SecretSharingEngine, Share, ShareSet};

/// Default number of simulated parties.
pub const DEFAULT_NUM_PARTIES: usize = 3;

/// Default reconstruction threshold.
pub const DEFAULT_THRESHOLD: usize = 2;

/// A party's local sum of the shares it received.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PartyPartial {
    /// Party index, starting at 1
    pub party: usize,
    /// Sum of this party's shares across all values
    pub value: f64,
}

impl From<PartyPartial> for Share {
    fn from(p: PartyPartial) -> Self {
        Share {
            party: p.party,
            value: p.value,
        }
    }
}

/// Computes sums, means and variances without reconstructing any input.
pub struct SecureAggregator {
    engine: SecretSharingEngine,
    num_parties: usize,
    threshold: usize,
}

impl Default for SecureAggregator {
    fn default() -> Self {
        Self {
            engine: SecretSharingEngine::new(),
            num_parties: DEFAULT_NUM_PARTIES,
            threshold: DEFAULT_THRESHOLD,
        }
    }
}

impl SecureAggregator {
    /// Create an aggregator over `num_parties` parties with the given threshold.
    pub fn new(
        engine: SecretSharingEngine,
        num_parties: usize,
        threshold: usize,
    ) -> Result<Self, PrivacyError> {
        if num_parties < 2 || threshold < 2 || threshold > num_parties {
            return Err(PrivacyError::InvalidInput(format!(
                "need 2 <= threshold <= num_parties, got threshold {} of {}",
                threshold, num_parties
            )));
        }
        Ok(Self {
            engine,
            num_parties,
            threshold,
        })
    }

    /// Configured party count.
    pub fn num_parties(&self) -> usize {
        self.num_parties
    }

    /// Configured threshold.
    pub fn threshold(&self) -> usize {
        self.threshold
    }

    /// The underlying sharing engine.
    pub fn engine(&self) -> &SecretSharingEngine {
        &self.engine
    }

    /// Share every value and return each party's local sum.
    pub fn party_partials(
        &self,
        values: &[f64],
        num_parties: usize,
        threshold: usize,
    ) -> Result<Vec<PartyPartial>, PrivacyError> {
        if values.is_empty() {
            return Err(PrivacyError::EmptyDataset);
        }

        let mut partials: Vec<PartyPartial> = (1..=num_parties)
            .map(|party| PartyPartial { party, value: 0.0 })
            .collect();
        for &value in values {
            let set = self.engine.share(value, num_parties, threshold)?;
            for (partial, share) in partials.iter_mut().zip(set.shares()) {
                partial.value += share.value;
            }
        }
        Ok(partials)
    }

    /// Secure sum with the configured parties and threshold.
    pub fn secure_sum(&self, values: &[f64]) -> Result<f64, PrivacyError> {
        self.secure_sum_with(values, self.num_parties, self.threshold)
    }

    /// Secure sum with explicit parties and threshold.
    ///
    /// Reconstructs from the partials of the first `threshold` parties.
    pub fn secure_sum_with(
        &self,
        values: &[f64],
        num_parties: usize,
        threshold: usize,
    ) -> Result<f64, PrivacyError> {
        let parties: Vec<usize> = (1..=threshold).collect();
        self.sum_from(values, num_parties, threshold, &parties)
    }

    /// Secure sum reconstructed from the partials of the listed parties.
    pub fn secure_sum_with_subset(
        &self,
        values: &[f64],
        parties: &[usize],
    ) -> Result<f64, PrivacyError> {
        self.sum_from(values, self.num_parties, self.threshold, parties)
    }

    fn sum_from(
        &self,
        values: &[f64],
        num_parties: usize,
        threshold: usize,
        parties: &[usize],
    ) -> Result<f64, PrivacyError> {
        let partials = self.party_partials(values, num_parties, threshold)?;
        let summed = ShareSet::from_shares(
            threshold,
            partials.into_iter().map(Share::from).collect(),
        )?;
        let total = summed.reconstruct_subset(parties)?;
        debug!(n_values = values.len(), num_parties, threshold, "secure sum reconstructed");
        Ok(total)
    }

    /// Secure mean: secure sum divided by the number of values.
    pub fn secure_mean(&self, values: &[f64]) -> Result<f64, PrivacyError> {
        if values.is_empty() {
            return Err(PrivacyError::EmptyDataset);
        }
        Ok(self.secure_sum(values)? / values.len() as f64)
    }

    /// Secure population variance.
    ///
    /// Runs two rounds in sequence: the secure mean, then the secure sum of
    /// squared deviations from it. The second round depends on the first and
    /// draws its own shares.
    pub fn secure_variance(&self, values: &[f64]) -> Result<f64, PrivacyError> {
        let mean = self.secure_mean(values)?;
        let squared: Vec<f64> = values.iter().map(|x| (x - mean).powi(2)).collect();
        Ok(self.secure_sum(&squared)? / values.len() as f64)
    }
}
