//! Loading and validation of settings.
//!
//! Every value has a default. A TOML file may override them, and
//! environment variables prefixed with `PPML_` override both, using `__` to
//! separate sections from keys:
//!
//! ```text
//! PPML_PRIVACY__TOTAL_BUDGET=2.5
//! PPML_SECURE__NUM_PARTIES=5
//! ```

use std::path::{Path, PathBuf};

use config::{Config, Environment, File, FileFormat};
use serde::Deserialize;

use crate::aggregators::secure::{DEFAULT_NUM_PARTIES, DEFAULT_THRESHOLD};
use crate::aggregators::DEFAULT_MIN_CLIENTS;
use crate::error::PrivacyError;
use crate::privacy::DEFAULT_TOTAL_BUDGET;
use crate::sharing::store::DEFAULT_CAPACITY;
use crate::sharing::DEFAULT_COEFFICIENT_RANGE;

/// The combined settings.
///
/// Each section in the configuration file corresponds to the identically
/// named field.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Federated averaging
    pub federated: FederatedSettings,
    /// Differential privacy
    pub privacy: PrivacySettings,
    /// Secure aggregation
    pub secure: SecureSettings,
    /// Key material
    pub keys: KeySettings,
    /// Logging
    pub log: LoggingSettings,
}

/// Federated averaging settings.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct FederatedSettings {
    /// Distinct clients required to close a round.
    pub min_clients: usize,
}

impl Default for FederatedSettings {
    fn default() -> Self {
        Self {
            min_clients: DEFAULT_MIN_CLIENTS,
        }
    }
}

/// Differential privacy settings.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct PrivacySettings {
    /// Total epsilon available until an explicit reset.
    pub total_budget: f64,
    /// Epsilon spent by noising calls that don't specify one.
    pub default_epsilon: f64,
    /// Sensitivity assumed by noising calls that don't specify one.
    pub default_sensitivity: f64,
    /// Delta for default noising calls. Unset means Laplace noise, set means
    /// Gaussian noise with this delta.
    pub default_delta: Option<f64>,
}

impl Default for PrivacySettings {
    fn default() -> Self {
        Self {
            total_budget: DEFAULT_TOTAL_BUDGET,
            default_epsilon: 1.0,
            default_sensitivity: 1.0,
            default_delta: None,
        }
    }
}

/// Secure aggregation settings.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct SecureSettings {
    /// Number of simulated parties.
    pub num_parties: usize,
    /// Shares needed for reconstruction.
    pub threshold: usize,
    /// Half-width of the interval polynomial coefficients are drawn from.
    pub coefficient_range: f64,
    /// Share sets retained before the oldest is evicted.
    pub store_capacity: usize,
}

impl Default for SecureSettings {
    fn default() -> Self {
        Self {
            num_parties: DEFAULT_NUM_PARTIES,
            threshold: DEFAULT_THRESHOLD,
            coefficient_range: DEFAULT_COEFFICIENT_RANGE,
            store_capacity: DEFAULT_CAPACITY,
        }
    }
}

/// Key material settings.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct KeySettings {
    /// File holding the persisted symmetric key.
    pub path: PathBuf,
}

impl Default for KeySettings {
    fn default() -> Self {
        Self {
            path: PathBuf::from(".encryption_key"),
        }
    }
}

/// Logging settings.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// A `tracing_subscriber::EnvFilter` directive, e.g. `info,ppml_core=debug`.
    pub filter: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
        }
    }
}

fn invalid(msg: String) -> Result<(), PrivacyError> {
    Err(PrivacyError::Settings(msg))
}

impl Settings {
    /// Loads and validates the settings from an optional file plus the
    /// environment.
    ///
    /// # Errors
    /// Fails when the file cannot be read or parsed, or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, PrivacyError> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(true));
        }
        let settings: Settings = builder
            .add_source(
                Environment::with_prefix("PPML")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Parses and validates settings from a TOML string, ignoring the
    /// environment.
    pub fn from_toml_str(toml: &str) -> Result<Self, PrivacyError> {
        let settings: Settings = Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()?
            .try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Check cross-field constraints.
    pub fn validate(&self) -> Result<(), PrivacyError> {
        if self.federated.min_clients == 0 {
            return invalid("federated.min_clients must be at least 1".to_string());
        }
        if !(self.privacy.total_budget.is_finite() && self.privacy.total_budget > 0.0) {
            return invalid(format!(
                "privacy.total_budget must be positive, got {}",
                self.privacy.total_budget
            ));
        }
        let privacy = &self.privacy;
        if !(privacy.default_epsilon.is_finite()
            && privacy.default_epsilon > 0.0
            && privacy.default_sensitivity.is_finite()
            && privacy.default_sensitivity > 0.0)
        {
            return invalid(
                "privacy.default_epsilon and privacy.default_sensitivity must be positive and finite"
                    .to_string(),
            );
        }
        if let Some(delta) = privacy.default_delta {
            if !(delta > 0.0 && delta < 1.0) {
                return invalid(format!(
                    "privacy.default_delta must lie in (0, 1), got {}",
                    delta
                ));
            }
        }
        let secure = &self.secure;
        if secure.num_parties < 2 || secure.threshold < 2 || secure.threshold > secure.num_parties
        {
            return invalid(format!(
                "secure.threshold must lie in 2..=num_parties, got {} of {}",
                secure.threshold, secure.num_parties
            ));
        }
        if !(secure.coefficient_range.is_finite() && secure.coefficient_range > 0.0) {
            return invalid("secure.coefficient_range must be positive".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let settings = Settings::default();
        settings.validate().unwrap();
        assert_eq!(settings.federated.min_clients, 2);
        assert_eq!(settings.secure.num_parties, 3);
        assert_eq!(settings.secure.threshold, 2);
        assert_eq!(settings.privacy.total_budget, 1.0);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let settings = Settings::from_toml_str(
            r#"
            [privacy]
            total_budget = 3.5

            [secure]
            num_parties = 5
            threshold = 3
            "#,
        )
        .unwrap();
        assert_eq!(settings.privacy.total_budget, 3.5);
        assert_eq!(settings.privacy.default_epsilon, 1.0);
        assert_eq!(settings.secure.threshold, 3);
        assert_eq!(settings.federated.min_clients, 2);
        assert_eq!(settings.log.filter, "info");
    }

    #[test]
    fn test_threshold_above_parties_rejected() {
        let err = Settings::from_toml_str(
            r#"
            [secure]
            num_parties = 3
            threshold = 4
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, PrivacyError::Settings(_)));
    }

    #[test]
    fn test_zero_budget_rejected() {
        assert!(Settings::from_toml_str("[privacy]\ntotal_budget = 0.0\n").is_err());
    }

    #[test]
    fn test_infinite_defaults_rejected() {
        let mut settings = Settings::default();
        settings.privacy.default_epsilon = f64::INFINITY;
        assert!(matches!(settings.validate(), Err(PrivacyError::Settings(_))));

        let mut settings = Settings::default();
        settings.privacy.default_sensitivity = f64::INFINITY;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_default_delta() {
        assert_eq!(Settings::default().privacy.default_delta, None);
        let settings = Settings::from_toml_str("[privacy]\ndefault_delta = 1e-5\n").unwrap();
        assert_eq!(settings.privacy.default_delta, Some(1e-5));
        assert!(Settings::from_toml_str("[privacy]\ndefault_delta = 1.5\n").is_err());
    }

    #[test]
    fn test_missing_file_is_error() {
        let path = std::env::temp_dir().join("ppml-core-no-such-settings.toml");
        assert!(Settings::load(Some(&path)).is_err());
    }
}
