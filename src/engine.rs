//! The operation surface handed to a transport layer.
//!
//! [`PrivacyEngine`] bundles the three state owners (the federated
//! aggregator, the privacy budget and the secure aggregator) and exposes the
//! calls a request handler needs. Each owner guards its own state, so a
//! noising request never waits on a federated round and vice versa.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::aggregators::{FederatedAggregator, SecureAggregator, UpdateOutcome};
use crate::error::PrivacyError;
use crate::model::{GlobalModel, ModelUpdate};
use crate::privacy::{BudgetReport, PrivacyBudgetManager};
use crate::settings::Settings;
use crate::sharing::SecretSharingEngine;

/// Response to a training submission.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainReceipt {
    /// The update passed validation and was buffered
    pub accepted: bool,
    /// Global model version after the call
    pub current_version: u64,
    /// Whether this update closed a round
    pub aggregated: bool,
}

/// Summary of federated progress.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FederatedStatus {
    /// Current global model version
    pub version: u64,
    /// Completed aggregation rounds
    pub rounds: usize,
    /// Distinct clients waiting in the current round
    pub pending_clients: usize,
    /// Distinct clients needed to close a round
    pub min_clients: usize,
}

/// Privacy-preserving computation engine.
///
/// # Example
///
/// ```rust
/// use ppml_core::{ModelUpdate, PrivacyEngine, Settings};
///
/// let initial = ModelUpdate::new()
///     .with_vector("weights", vec![0.0, 0.0])
///     .with_vector("bias", vec![0.0]);
/// let engine = PrivacyEngine::new(&Settings::default(), initial).unwrap();
///
/// let total = engine.secure_sum(&[2.0, 3.0, 5.0]).unwrap();
/// assert!((total - 10.0).abs() < 1e-9);
/// ```
pub struct PrivacyEngine {
    federated: FederatedAggregator,
    privacy: PrivacyBudgetManager,
    secure: SecureAggregator,
    default_epsilon: f64,
    default_sensitivity: f64,
    default_delta: Option<f64>,
}

impl PrivacyEngine {
    /// Build an engine from settings and the initial global parameters.
    pub fn new(settings: &Settings, initial_model: ModelUpdate) -> Result<Self, PrivacyError> {
        settings.validate()?;
        let sharing = SecretSharingEngine::new()
            .with_coefficient_range(settings.secure.coefficient_range)?
            .with_store_capacity(settings.secure.store_capacity);
        Self::from_parts(
            settings,
            initial_model,
            sharing,
            PrivacyBudgetManager::new(settings.privacy.total_budget)?,
        )
    }

    /// Build a deterministic engine, for reproducible runs.
    pub fn with_seed(
        settings: &Settings,
        initial_model: ModelUpdate,
        seed: u64,
    ) -> Result<Self, PrivacyError> {
        settings.validate()?;
        let sharing = SecretSharingEngine::with_seed(seed)
            .with_coefficient_range(settings.secure.coefficient_range)?
            .with_store_capacity(settings.secure.store_capacity);
        Self::from_parts(
            settings,
            initial_model,
            sharing,
            PrivacyBudgetManager::with_seed(settings.privacy.total_budget, seed.wrapping_add(1))?,
        )
    }

    fn from_parts(
        settings: &Settings,
        initial_model: ModelUpdate,
        sharing: SecretSharingEngine,
        privacy: PrivacyBudgetManager,
    ) -> Result<Self, PrivacyError> {
        let engine = Self {
            federated: FederatedAggregator::new(initial_model, settings.federated.min_clients)?,
            privacy,
            secure: SecureAggregator::new(
                sharing,
                settings.secure.num_parties,
                settings.secure.threshold,
            )?,
            default_epsilon: settings.privacy.default_epsilon,
            default_sensitivity: settings.privacy.default_sensitivity,
            default_delta: settings.privacy.default_delta,
        };
        info!(
            min_clients = settings.federated.min_clients,
            total_budget = settings.privacy.total_budget,
            num_parties = settings.secure.num_parties,
            threshold = settings.secure.threshold,
            "privacy engine ready"
        );
        Ok(engine)
    }

    /// Submit a client's model update.
    pub fn train(&self, client_id: &str, update: ModelUpdate) -> Result<TrainReceipt, PrivacyError> {
        let (current_version, aggregated) = match self.federated.update(client_id, update)? {
            UpdateOutcome::Aggregated { version } => (version, true),
            UpdateOutcome::Buffered { version, .. } => (version, false),
        };
        Ok(TrainReceipt {
            accepted: true,
            current_version,
            aggregated,
        })
    }

    /// Current global model for a client.
    pub fn get_model(&self, client_id: &str) -> GlobalModel {
        self.federated.model_for_client(client_id)
    }

    /// Noise every value, spending `epsilon` once for the whole call.
    pub fn add_noise(
        &self,
        values: &[f64],
        epsilon: f64,
        sensitivity: f64,
        delta: Option<f64>,
    ) -> Result<Vec<f64>, PrivacyError> {
        self.privacy
            .add_noise_batch(values, epsilon, sensitivity, delta)
    }

    /// Noise every value with the configured default epsilon, sensitivity
    /// and delta (Laplace when no delta is configured).
    pub fn add_noise_default(&self, values: &[f64]) -> Result<Vec<f64>, PrivacyError> {
        self.add_noise(
            values,
            self.default_epsilon,
            self.default_sensitivity,
            self.default_delta,
        )
    }

    /// Secure sum over the configured parties.
    pub fn secure_sum(&self, values: &[f64]) -> Result<f64, PrivacyError> {
        self.secure.secure_sum(values)
    }

    /// Secure mean over the configured parties.
    pub fn secure_mean(&self, values: &[f64]) -> Result<f64, PrivacyError> {
        self.secure.secure_mean(values)
    }

    /// Secure population variance over the configured parties.
    pub fn secure_variance(&self, values: &[f64]) -> Result<f64, PrivacyError> {
        self.secure.secure_variance(values)
    }

    /// Current privacy budget.
    pub fn privacy_budget(&self) -> BudgetReport {
        self.privacy.report()
    }

    /// Restore the full privacy budget.
    pub fn reset_budget(&self) {
        self.privacy.reset();
    }

    /// Leave-one-out sensitivity of `aggregate` on `dataset`.
    pub fn estimate_sensitivity<F>(&self, dataset: &[f64], aggregate: F) -> Result<f64, PrivacyError>
    where
        F: Fn(&[f64]) -> f64 + Sync,
    {
        self.privacy.estimate_sensitivity(dataset, aggregate)
    }

    /// Federated progress.
    pub fn federated_status(&self) -> FederatedStatus {
        FederatedStatus {
            version: self.federated.version(),
            rounds: self.federated.rounds_completed(),
            pending_clients: self.federated.pending_clients(),
            min_clients: self.federated.min_clients(),
        }
    }

    /// The federated aggregator.
    pub fn federated(&self) -> &FederatedAggregator {
        &self.federated
    }

    /// The privacy budget manager.
    pub fn privacy(&self) -> &PrivacyBudgetManager {
        &self.privacy
    }

    /// The secure aggregator.
    pub fn secure(&self) -> &SecureAggregator {
        &self.secure
    }
}
