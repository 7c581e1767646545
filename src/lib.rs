//! # ppml-core: Privacy-Preserving Aggregation Engine
//!
//! Lets many clients contribute values or model parameters to a central
//! coordinator without handing over raw data.
//!
//! ## Components
//!
//! - [`SecretSharingEngine`] - Shamir shares of a scalar and Lagrange reconstruction
//! - [`SecureAggregator`] - sum, mean and variance computed over shares only
//! - [`PrivacyBudgetManager`] - Laplace/Gaussian noise under a cumulative epsilon budget
//! - [`FederatedAggregator`] - buffers client updates and averages them into a global model
//!
//! ## High-Level API
//!
//! [`PrivacyEngine`] wires the components together from [`Settings`] and
//! exposes the operations a transport layer needs.
//!
//! Parties in secure aggregation are simulated as indices inside one
//! process; nothing here talks to the network.

#![deny(missing_docs)]

pub mod aggregators;
pub mod audit;
pub mod engine;
pub mod error;
pub mod keys;
pub mod logging;
pub mod math;
pub mod model;
pub mod privacy;
pub mod settings;
pub mod sharing;

// Re-exports
pub use aggregators::{fedavg, FederatedAggregator, SecureAggregator, UpdateOutcome};
pub use audit::{AggregationAuditEntry, AuditLog};
pub use engine::{FederatedStatus, PrivacyEngine, TrainReceipt};
pub use error::{ErrorKind, PrivacyError};
pub use keys::KeyMaterial;
pub use model::{GlobalModel, ModelUpdate, ParameterMap};
pub use privacy::{BudgetReport, NoiseMechanism, PrivacyBudget, PrivacyBudgetManager};
pub use settings::Settings;
pub use sharing::{SecretSharingEngine, Share, ShareSet};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
