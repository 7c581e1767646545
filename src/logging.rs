//! Structured logging setup.
//!
//! The library only emits `tracing` events; binaries and demos call
//! [`init`] once to print them.

use tracing_subscriber::EnvFilter;

use crate::error::PrivacyError;
use crate::settings::LoggingSettings;

/// Install a global `fmt` subscriber filtered by `settings.filter`.
///
/// `RUST_LOG`, when set, takes precedence over the configured filter.
///
/// # Errors
/// Fails if the filter directive is malformed or a global subscriber is
/// already installed.
pub fn init(settings: &LoggingSettings) -> Result<(), PrivacyError> {
    let filter = match std::env::var(EnvFilter::DEFAULT_ENV) {
        Ok(directive) if !directive.trim().is_empty() => EnvFilter::try_new(directive),
        _ => EnvFilter::try_new(&settings.filter),
    }
    .map_err(|e| PrivacyError::Settings(format!("invalid log filter: {}", e)))?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .map_err(|e| PrivacyError::Settings(format!("logging already initialised: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_malformed_filter() {
        let settings = LoggingSettings {
            filter: "ppml_core=notalevel[".to_string(),
        };
        if std::env::var(EnvFilter::DEFAULT_ENV).is_err() {
            assert!(init(&settings).is_err());
        }
    }
}
