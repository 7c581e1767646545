//! Error types for ppml-core

use thiserror::Error;

/// All possible errors in ppml-core.
///
/// Every failure is raised before any state is touched, so an `Err` always
/// leaves budgets, buffers and the global model as they were.
#[derive(Error, Debug)]
pub enum PrivacyError {
    /// Arguments are out of range or inconsistent
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Not enough distinct party shares to reconstruct a secret
    #[error("Insufficient shares: need {needed}, got {actual}")]
    InsufficientShares {
        /// Reconstruction threshold
        needed: usize,
        /// Distinct party indices supplied
        actual: usize,
    },

    /// The differential privacy budget cannot cover the request
    #[error("Privacy budget exhausted: requested {requested}, remaining {remaining}")]
    BudgetExhausted {
        /// Epsilon the caller asked to spend
        requested: f64,
        /// Epsilon still available
        remaining: f64,
    },

    /// An aggregate was requested over no values
    #[error("Empty dataset provided")]
    EmptyDataset,

    /// A model update does not carry the global model's parameter names
    #[error("Malformed update: {0}")]
    MalformedUpdate(String),

    /// Configuration could not be loaded or failed validation
    #[error("Settings error: {0}")]
    Settings(String),

    /// Key material could not be read, written or decoded
    #[error("Key material error: {0}")]
    KeyMaterial(String),
}

/// Coarse error classification for callers deciding how to react.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad arguments or update shapes
    InvalidInput,
    /// Too few shares for reconstruction
    InsufficientShares,
    /// Epsilon budget spent
    BudgetExhausted,
    /// No values supplied
    EmptyDataset,
    /// Parameter names disagree with the global model
    MalformedUpdate,
    /// Configuration or key-material problem
    Environment,
}

impl PrivacyError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            PrivacyError::InvalidInput(_) => ErrorKind::InvalidInput,
            PrivacyError::InsufficientShares { .. } => ErrorKind::InsufficientShares,
            PrivacyError::BudgetExhausted { .. } => ErrorKind::BudgetExhausted,
            PrivacyError::EmptyDataset => ErrorKind::EmptyDataset,
            PrivacyError::MalformedUpdate(_) => ErrorKind::MalformedUpdate,
            PrivacyError::Settings(_) | PrivacyError::KeyMaterial(_) => ErrorKind::Environment,
        }
    }

    /// Whether repeating the same call unchanged could succeed.
    ///
    /// Only environment failures (I/O on the key file, say) qualify. An
    /// exhausted budget stays exhausted until an explicit reset.
    pub fn is_retryable(&self) -> bool {
        matches!(self.kind(), ErrorKind::Environment)
    }
}

impl From<config::ConfigError> for PrivacyError {
    fn from(e: config::ConfigError) -> Self {
        PrivacyError::Settings(e.to_string())
    }
}

impl From<std::io::Error> for PrivacyError {
    fn from(e: std::io::Error) -> Self {
        PrivacyError::KeyMaterial(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds() {
        assert_eq!(PrivacyError::EmptyDataset.kind(), ErrorKind::EmptyDataset);
        assert_eq!(
            PrivacyError::InsufficientShares {
                needed: 3,
                actual: 1
            }
            .kind(),
            ErrorKind::InsufficientShares
        );
        assert_eq!(
            PrivacyError::Settings("x".into()).kind(),
            ErrorKind::Environment
        );
    }

    #[test]
    fn test_budget_exhausted_not_retryable() {
        let e = PrivacyError::BudgetExhausted {
            requested: 0.5,
            remaining: 0.1,
        };
        assert!(!e.is_retryable());
        assert!(PrivacyError::KeyMaterial("disk".into()).is_retryable());
    }

    #[test]
    fn test_display() {
        let e = PrivacyError::InsufficientShares {
            needed: 4,
            actual: 2,
        };
        let msg = e.to_string();
        assert!(msg.contains('4') && msg.contains('2'));
    }
}
