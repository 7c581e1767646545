//! Shamir secret sharing over the reals.
//!
//! A secret `s` is hidden as the constant term of a random polynomial
//! `f(x) = s + c_1·x + ... + c_{t-1}·x^{t-1}`; party `i` receives `f(i)`.
//! Any `t` shares pin down `f` and therefore `s`, while fewer than `t`
//! leave the constant term unconstrained.
//!
//! Parties are simulated as indices `1..=n` inside one process. The
//! [`ShareStore`] retains share sets under an operation identifier for
//! callers that reconstruct later.

pub mod store;

pub use store::ShareStore;

use std::collections::BTreeMap;

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::PrivacyError;
use crate::math::{evaluate, lagrange_at_zero};

/// Default half-width of the interval random coefficients are drawn from.
///
/// Coefficients are not scaled to the secret, so with threshold 2 a single
/// share lies within this distance of the secret. Callers hiding values of
/// large magnitude should widen it with
/// [`SecretSharingEngine::with_coefficient_range`].
pub const DEFAULT_COEFFICIENT_RANGE: f64 = 1.0;

/// A single party's share: the share polynomial evaluated at `party`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Share {
    /// Party index, starting at 1
    pub party: usize,
    /// `f(party)`
    pub value: f64,
}

/// The full output of one sharing operation.
///
/// Deserialization runs the same checks as [`ShareSet::from_shares`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawShareSet")]
pub struct ShareSet {
    threshold: usize,
    shares: Vec<Share>,
}

#[derive(Deserialize)]
struct RawShareSet {
    threshold: usize,
    shares: Vec<Share>,
}

impl TryFrom<RawShareSet> for ShareSet {
    type Error = PrivacyError;

    fn try_from(raw: RawShareSet) -> Result<Self, Self::Error> {
        ShareSet::from_shares(raw.threshold, raw.shares)
    }
}

impl ShareSet {
    /// Build a share set from already computed shares.
    ///
    /// Used when shares are combined outside the engine, e.g. party-local
    /// sums in secure aggregation.
    pub fn from_shares(threshold: usize, shares: Vec<Share>) -> Result<Self, PrivacyError> {
        validate_parameters(shares.len(), threshold)?;
        Ok(Self { threshold, shares })
    }

    /// Minimum number of distinct shares needed to reconstruct.
    pub fn threshold(&self) -> usize {
        self.threshold
    }

    /// Number of parties holding a share.
    pub fn num_parties(&self) -> usize {
        self.shares.len()
    }

    /// All shares, ordered by party index.
    pub fn shares(&self) -> &[Share] {
        &self.shares
    }

    /// The share held by `party`, if any.
    pub fn share_for(&self, party: usize) -> Option<Share> {
        self.shares.iter().copied().find(|s| s.party == party)
    }

    /// Reconstruct from every share in the set.
    pub fn reconstruct(&self) -> Result<f64, PrivacyError> {
        reconstruct(&self.shares, self.threshold)
    }

    /// Reconstruct from the shares of the listed parties only.
    pub fn reconstruct_subset(&self, parties: &[usize]) -> Result<f64, PrivacyError> {
        let subset = parties
            .iter()
            .map(|&p| {
                self.share_for(p).ok_or_else(|| {
                    PrivacyError::InvalidInput(format!("party {} holds no share", p))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        reconstruct(&subset, self.threshold)
    }
}

fn validate_parameters(num_parties: usize, threshold: usize) -> Result<(), PrivacyError> {
    if num_parties < 2 {
        return Err(PrivacyError::InvalidInput(format!(
            "num_parties must be at least 2, got {}",
            num_parties
        )));
    }
    if threshold < 2 || threshold > num_parties {
        return Err(PrivacyError::InvalidInput(format!(
            "threshold must be in 2..={}, got {}",
            num_parties, threshold
        )));
    }
    Ok(())
}

/// Recover a secret from `shares` by Lagrange interpolation at zero.
///
/// Uses every distinct party index supplied. Repeated indices carrying the
/// same value count once; repeated indices with conflicting values are
/// rejected, as is the reserved index 0 and any threshold below 2.
pub fn reconstruct(shares: &[Share], threshold: usize) -> Result<f64, PrivacyError> {
    if threshold < 2 {
        return Err(PrivacyError::InvalidInput(format!(
            "threshold must be at least 2, got {}",
            threshold
        )));
    }
    let mut points: BTreeMap<usize, f64> = BTreeMap::new();
    for share in shares {
        if share.party == 0 {
            return Err(PrivacyError::InvalidInput(
                "party index 0 is reserved for the secret".to_string(),
            ));
        }
        if !share.value.is_finite() {
            return Err(PrivacyError::InvalidInput(format!(
                "share for party {} is not finite",
                share.party
            )));
        }
        match points.insert(share.party, share.value) {
            Some(previous) if previous != share.value => {
                return Err(PrivacyError::InvalidInput(format!(
                    "conflicting shares for party {}",
                    share.party
                )));
            }
            _ => {}
        }
    }

    if points.len() < threshold {
        return Err(PrivacyError::InsufficientShares {
            needed: threshold,
            actual: points.len(),
        });
    }

    let xy: Vec<(f64, f64)> = points.into_iter().map(|(p, v)| (p as f64, v)).collect();
    Ok(lagrange_at_zero(&xy))
}

/// Generates Shamir shares and reconstructs secrets.
///
/// Owns its random number generator behind a lock so that concurrent
/// callers always draw disjoint coefficients.
pub struct SecretSharingEngine {
    rng: Mutex<StdRng>,
    coefficient_range: f64,
    store: Mutex<ShareStore<String>>,
}

impl Default for SecretSharingEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl SecretSharingEngine {
    /// Create an engine seeded from OS entropy.
    pub fn new() -> Self {
        Self::from_rng(StdRng::from_entropy())
    }

    /// Create a deterministic engine, for reproducible runs.
    pub fn with_seed(seed: u64) -> Self {
        Self::from_rng(StdRng::seed_from_u64(seed))
    }

    fn from_rng(rng: StdRng) -> Self {
        Self {
            rng: Mutex::new(rng),
            coefficient_range: DEFAULT_COEFFICIENT_RANGE,
            store: Mutex::new(ShareStore::new(store::DEFAULT_CAPACITY)),
        }
    }

    /// Draw coefficients uniformly from `[-range, range)`.
    pub fn with_coefficient_range(mut self, range: f64) -> Result<Self, PrivacyError> {
        if !(range.is_finite() && range > 0.0) {
            return Err(PrivacyError::InvalidInput(format!(
                "coefficient range must be positive and finite, got {}",
                range
            )));
        }
        self.coefficient_range = range;
        Ok(self)
    }

    /// Bound the number of retained share sets.
    pub fn with_store_capacity(self, capacity: usize) -> Self {
        self.store.lock().set_capacity(capacity);
        self
    }

    /// Split `secret` into `num_parties` shares, any `threshold` of which
    /// reconstruct it.
    pub fn share(
        &self,
        secret: f64,
        num_parties: usize,
        threshold: usize,
    ) -> Result<ShareSet, PrivacyError> {
        validate_parameters(num_parties, threshold)?;
        if !secret.is_finite() {
            return Err(PrivacyError::InvalidInput(
                "secret must be finite".to_string(),
            ));
        }

        let range = self.coefficient_range;
        let mut coefficients = Vec::with_capacity(threshold);
        coefficients.push(secret);
        {
            let mut rng = self.rng.lock();
            coefficients.extend((1..threshold).map(|_| rng.gen_range(-range..range)));
        }

        let shares = (1..=num_parties)
            .map(|party| Share {
                party,
                value: evaluate(&coefficients, party as f64),
            })
            .collect();

        debug!(num_parties, threshold, "generated share set");
        Ok(ShareSet { threshold, shares })
    }

    /// Reconstruct a secret from at least `threshold` distinct shares.
    pub fn reconstruct(&self, shares: &[Share], threshold: usize) -> Result<f64, PrivacyError> {
        reconstruct(shares, threshold)
    }

    /// Share `secret` and retain the set under `operation_id`.
    ///
    /// An existing set under the same identifier is replaced.
    pub fn share_and_store(
        &self,
        operation_id: &str,
        secret: f64,
        num_parties: usize,
        threshold: usize,
    ) -> Result<ShareSet, PrivacyError> {
        let set = self.share(secret, num_parties, threshold)?;
        if let Some(evicted) = self.store.lock().insert(operation_id.to_string(), set.clone()) {
            debug!(operation = %evicted, "evicted share set");
        }
        Ok(set)
    }

    /// Reconstruct a retained share set, optionally from a party subset.
    pub fn reconstruct_stored(
        &self,
        operation_id: &str,
        parties: Option<&[usize]>,
    ) -> Result<f64, PrivacyError> {
        let store = self.store.lock();
        let set = store.get(operation_id).ok_or_else(|| {
            PrivacyError::InvalidInput(format!("no shares found for operation '{}'", operation_id))
        })?;
        match parties {
            Some(p) => set.reconstruct_subset(p),
            None => set.reconstruct(),
        }
    }

    /// Drop a retained share set. Returns whether it existed.
    pub fn forget(&self, operation_id: &str) -> bool {
        self.store.lock().remove(operation_id).is_some()
    }

    /// Drop every retained share set.
    pub fn clear_store(&self) {
        self.store.lock().clear();
    }

    /// Number of retained share sets.
    pub fn stored_operations(&self) -> usize {
        self.store.lock().len()
    }
}
