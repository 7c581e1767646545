//! Aggregation over private client contributions.
//!
//! | Aggregator | Input | Protection |
//! |------------|-------|------------|
//! | [`SecureAggregator`] | scalar values | Shamir shares, only partial sums combined |
//! | [`FederatedAggregator`] | model updates | raw data never leaves the client |
//! | [`fedavg`] | model updates | none (plain weighted mean) |

pub mod fedavg;
pub mod secure;

pub use fedavg::{client_count_average, fedavg, validate_update};
pub use secure::{PartyPartial, SecureAggregator};

use std::collections::BTreeMap;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::audit::{AggregationAuditEntry, AuditLog};
use crate::error::PrivacyError;
use crate::model::{GlobalModel, ModelUpdate};

/// Distinct clients required before a round closes, unless configured.
pub const DEFAULT_MIN_CLIENTS: usize = 2;

/// What happened to an accepted update.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum UpdateOutcome {
    /// Buffered; the round is still collecting.
    Buffered {
        /// Distinct clients now waiting
        pending_clients: usize,
        /// Global model version the update was buffered against
        version: u64,
    },
    /// The update closed the round and the global model was replaced.
    Aggregated {
        /// New global model version
        version: u64,
    },
}

struct FederatedState {
    model: GlobalModel,
    buffer: BTreeMap<String, Vec<ModelUpdate>>,
    audit: AuditLog,
}

impl FederatedState {
    fn pending_clients(&self) -> usize {
        self.buffer.values().filter(|u| !u.is_empty()).count()
    }

    /// Fold the whole buffer into the global model. Runs under the state lock.
    fn aggregate(&mut self) -> Result<u64, PrivacyError> {
        let n_clients = self.pending_clients();
        let n_updates = self.buffer.values().map(Vec::len).sum();
        let averaged = client_count_average(&self.model.parameters, &self.buffer)?;

        for (name, value) in averaged {
            self.model.parameters.insert(name, value);
        }
        let round = self.model.version;
        self.model.version += 1;
        self.buffer.clear();
        self.audit.push(AggregationAuditEntry {
            round,
            n_clients,
            n_updates,
            version: self.model.version,
        });

        info!(
            round,
            n_clients,
            n_updates,
            version = self.model.version,
            "aggregation round completed"
        );
        Ok(self.model.version)
    }
}

/// Buffers per-client model updates and averages them into a global model.
///
/// The aggregator is *collecting* between calls. The update that brings the
/// number of distinct buffered clients up to `min_clients` runs the round
/// before returning: every buffered update is divided by the distinct-client
/// count and summed into the matching global parameter, the version is
/// bumped and the buffer is emptied.
///
/// # Example
///
/// ```rust
/// use ppml_core::{FederatedAggregator, ModelUpdate};
///
/// let initial = ModelUpdate::new().with_vector("w", vec![0.0, 0.0]);
/// let agg = FederatedAggregator::new(initial, 2).unwrap();
///
/// agg.update("alice", ModelUpdate::new().with_vector("w", vec![1.0, 2.0])).unwrap();
/// agg.update("bob", ModelUpdate::new().with_vector("w", vec![3.0, 4.0])).unwrap();
///
/// let model = agg.model_for_client("alice");
/// assert_eq!(model.version, 1);
/// assert!((model.get("w").unwrap()[[0]] - 2.0).abs() < 1e-12);
/// ```
pub struct FederatedAggregator {
    min_clients: usize,
    state: Mutex<FederatedState>,
}

impl FederatedAggregator {
    /// Create an aggregator around an initial parameter mapping.
    ///
    /// # Arguments
    ///
    /// * `initial` - Starting global parameters; fixes the accepted structure
    /// * `min_clients` - Distinct clients needed to close a round (at least 1)
    pub fn new(initial: impl Into<ModelUpdate>, min_clients: usize) -> Result<Self, PrivacyError> {
        if min_clients == 0 {
            return Err(PrivacyError::InvalidInput(
                "min_clients must be at least 1".to_string(),
            ));
        }
        let model = GlobalModel::new(initial);
        if model.parameters.is_empty() {
            return Err(PrivacyError::InvalidInput(
                "initial model has no parameters".to_string(),
            ));
        }
        Ok(Self {
            min_clients,
            state: Mutex::new(FederatedState {
                model,
                buffer: BTreeMap::new(),
                audit: AuditLog::new(),
            }),
        })
    }

    /// Submit a client's update, aggregating if it completes the round.
    pub fn update(&self, client_id: &str, update: ModelUpdate) -> Result<UpdateOutcome, PrivacyError> {
        if client_id.trim().is_empty() {
            return Err(PrivacyError::InvalidInput(
                "client id must not be empty".to_string(),
            ));
        }

        let mut state = self.state.lock();
        if let Err(e) = validate_update(&state.model.parameters, &update) {
            warn!(client = client_id, error = %e, "rejected model update");
            return Err(e);
        }

        state
            .buffer
            .entry(client_id.to_string())
            .or_default()
            .push(update);

        let pending_clients = state.pending_clients();
        debug!(client = client_id, pending_clients, "buffered model update");

        if pending_clients >= self.min_clients {
            let version = state.aggregate()?;
            Ok(UpdateOutcome::Aggregated { version })
        } else {
            Ok(UpdateOutcome::Buffered {
                pending_clients,
                version: state.model.version,
            })
        }
    }

    /// Snapshot of the current global model.
    ///
    /// Every client receives the same model; the identifier is accepted for
    /// interface symmetry with [`update`](Self::update).
    pub fn model_for_client(&self, _client_id: &str) -> GlobalModel {
        self.state.lock().model.clone()
    }

    /// Current global model version.
    pub fn version(&self) -> u64 {
        self.state.lock().model.version
    }

    /// Number of completed rounds.
    pub fn rounds_completed(&self) -> usize {
        self.state.lock().audit.len()
    }

    /// Distinct clients with buffered updates.
    pub fn pending_clients(&self) -> usize {
        self.state.lock().pending_clients()
    }

    /// Total buffered updates across all clients.
    pub fn pending_updates(&self) -> usize {
        self.state.lock().buffer.values().map(Vec::len).sum()
    }

    /// Distinct clients needed to close a round.
    pub fn min_clients(&self) -> usize {
        self.min_clients
    }

    /// Copy of the round audit log.
    pub fn audit_log(&self) -> AuditLog {
        self.state.lock().audit.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn w(values: Vec<f64>) -> ModelUpdate {
        ModelUpdate::new().with_vector("w", values)
    }

    fn aggregator(min_clients: usize) -> FederatedAggregator {
        FederatedAggregator::new(w(vec![0.0, 0.0]), min_clients).unwrap()
    }

    #[test]
    fn test_two_clients_average() {
        let agg = aggregator(2);
        assert_eq!(
            agg.update("a", w(vec![1.0, 2.0])).unwrap(),
            UpdateOutcome::Buffered {
                pending_clients: 1,
                version: 0
            }
        );
        assert_eq!(
            agg.update("b", w(vec![3.0, 4.0])).unwrap(),
            UpdateOutcome::Aggregated { version: 1 }
        );

        let model = agg.model_for_client("a");
        let weights = model.get("w").unwrap();
        assert!((weights[[0]] - 2.0).abs() < 1e-12);
        assert!((weights[[1]] - 3.0).abs() < 1e-12);
        assert_eq!(agg.pending_updates(), 0);
    }

    #[test]
    fn test_same_client_twice_does_not_close_round() {
        let agg = aggregator(2);
        agg.update("a", w(vec![1.0, 1.0])).unwrap();
        let outcome = agg.update("a", w(vec![3.0, 3.0])).unwrap();
        assert_eq!(
            outcome,
            UpdateOutcome::Buffered {
                pending_clients: 1,
                version: 0
            }
        );
        assert_eq!(agg.pending_updates(), 2);
        assert_eq!(agg.version(), 0);
    }

    #[test]
    fn test_repeat_updates_divided_by_client_count() {
        let agg = aggregator(2);
        agg.update("a", w(vec![1.0, 1.0])).unwrap();
        agg.update("a", w(vec![3.0, 3.0])).unwrap();
        agg.update("b", w(vec![2.0, 2.0])).unwrap();
        // (1 + 3 + 2) / 2 distinct clients
        let model = agg.model_for_client("b");
        assert!((model.get("w").unwrap()[[0]] - 3.0).abs() < 1e-12);
        let entry = agg.audit_log().last().cloned().unwrap();
        assert_eq!(entry.n_clients, 2);
        assert_eq!(entry.n_updates, 3);
    }

    #[test]
    fn test_malformed_update_leaves_buffer_untouched() {
        let agg = aggregator(2);
        agg.update("a", w(vec![1.0, 1.0])).unwrap();
        let bad = ModelUpdate::new().with_vector("v", vec![1.0, 1.0]);
        assert!(matches!(
            agg.update("b", bad),
            Err(PrivacyError::MalformedUpdate(_))
        ));
        assert_eq!(agg.pending_clients(), 1);
        assert_eq!(agg.version(), 0);
    }

    #[test]
    fn test_wrong_shape_is_invalid_input() {
        let agg = aggregator(2);
        assert!(matches!(
            agg.update("a", w(vec![1.0])),
            Err(PrivacyError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_buffered_outcome_reports_current_round_version() {
        let agg = aggregator(2);
        agg.update("a", w(vec![1.0, 1.0])).unwrap();
        agg.update("b", w(vec![1.0, 1.0])).unwrap();
        assert_eq!(
            agg.update("c", w(vec![2.0, 2.0])).unwrap(),
            UpdateOutcome::Buffered {
                pending_clients: 1,
                version: 1
            }
        );
    }

    #[test]
    fn test_empty_client_id() {
        let agg = aggregator(2);
        assert!(agg.update("  ", w(vec![1.0, 1.0])).is_err());
    }

    #[test]
    fn test_min_clients_one_aggregates_every_update() {
        let agg = aggregator(1);
        agg.update("a", w(vec![5.0, 6.0])).unwrap();
        agg.update("a", w(vec![7.0, 8.0])).unwrap();
        assert_eq!(agg.version(), 2);
        assert_eq!(agg.rounds_completed(), 2);
        assert!((agg.model_for_client("a").get("w").unwrap()[[1]] - 8.0).abs() < 1e-12);
    }

    #[test]
    fn test_invalid_construction() {
        assert!(FederatedAggregator::new(w(vec![0.0]), 0).is_err());
        assert!(FederatedAggregator::new(ModelUpdate::new(), 2).is_err());
    }
}
