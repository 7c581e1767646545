//! Noise calibration and sampling for the Laplace and Gaussian mechanisms.

use rand::Rng;
use rand_distr::{Distribution, Exp1, Normal};
use serde::{Deserialize, Serialize};

use crate::error::PrivacyError;

/// Which distribution noise is drawn from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum NoiseMechanism {
    /// Pure epsilon-DP, scale `b = sensitivity / epsilon`
    Laplace,
    /// (epsilon, delta)-DP, `σ = sensitivity · sqrt(2 ln(1.25/δ)) / epsilon`
    Gaussian,
}

impl NoiseMechanism {
    /// Laplace without a delta, Gaussian with one.
    pub fn for_delta(delta: Option<f64>) -> Self {
        match delta {
            Some(_) => NoiseMechanism::Gaussian,
            None => NoiseMechanism::Laplace,
        }
    }

    /// Theoretical variance of a single draw at the given scale.
    pub fn variance(&self, scale: f64) -> f64 {
        match self {
            NoiseMechanism::Laplace => 2.0 * scale * scale,
            NoiseMechanism::Gaussian => scale * scale,
        }
    }
}

/// Check epsilon, sensitivity and the optional delta.
pub fn validate_privacy_params(
    epsilon: f64,
    sensitivity: f64,
    delta: Option<f64>,
) -> Result<(), PrivacyError> {
    if !(epsilon.is_finite() && epsilon > 0.0) {
        return Err(PrivacyError::InvalidInput(format!(
            "epsilon must be positive, got {}",
            epsilon
        )));
    }
    if !(sensitivity.is_finite() && sensitivity > 0.0) {
        return Err(PrivacyError::InvalidInput(format!(
            "sensitivity must be positive, got {}",
            sensitivity
        )));
    }
    if let Some(d) = delta {
        if !(d > 0.0 && d < 1.0) {
            return Err(PrivacyError::InvalidInput(format!(
                "delta must lie in (0, 1), got {}",
                d
            )));
        }
    }
    Ok(())
}

/// Scale parameter for `mechanism`: the Laplace `b` or the Gaussian `σ`.
///
/// `delta` is required for [`NoiseMechanism::Gaussian`] and must be absent
/// for [`NoiseMechanism::Laplace`].
pub fn calibrated_noise(
    mechanism: NoiseMechanism,
    sensitivity: f64,
    epsilon: f64,
    delta: Option<f64>,
) -> Result<f64, PrivacyError> {
    validate_privacy_params(epsilon, sensitivity, delta)?;
    match (mechanism, delta) {
        (NoiseMechanism::Laplace, None) => Ok(sensitivity / epsilon),
        (NoiseMechanism::Gaussian, Some(d)) => {
            Ok(sensitivity * (2.0 * (1.25 / d).ln()).sqrt() / epsilon)
        }
        (NoiseMechanism::Laplace, Some(_)) => Err(PrivacyError::InvalidInput(
            "the Laplace mechanism takes no delta".to_string(),
        )),
        (NoiseMechanism::Gaussian, None) => Err(PrivacyError::InvalidInput(
            "the Gaussian mechanism requires delta".to_string(),
        )),
    }
}

/// Draw one zero-centred sample at `scale`.
///
/// Laplace noise is the difference of two unit exponentials scaled by `b`,
/// which avoids the log-of-zero edge of inverse-CDF sampling.
pub fn sample<R: Rng + ?Sized>(
    mechanism: NoiseMechanism,
    scale: f64,
    rng: &mut R,
) -> Result<f64, PrivacyError> {
    match mechanism {
        NoiseMechanism::Laplace => {
            let a: f64 = Exp1.sample(rng);
            let b: f64 = Exp1.sample(rng);
            Ok(scale * (a - b))
        }
        NoiseMechanism::Gaussian => {
            let normal = Normal::new(0.0, scale)
                .map_err(|e| PrivacyError::InvalidInput(e.to_string()))?;
            Ok(normal.sample(rng))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_laplace_scale() {
        let b = calibrated_noise(NoiseMechanism::Laplace, 2.0, 0.5, None).unwrap();
        assert!((b - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_gaussian_sigma() {
        let sigma = calibrated_noise(NoiseMechanism::Gaussian, 1.0, 1.0, Some(1e-5)).unwrap();
        let expected = (2.0 * (1.25e5f64).ln()).sqrt();
        assert!((sigma - expected).abs() < 1e-12);
    }

    #[test]
    fn test_delta_required_iff_gaussian() {
        assert!(calibrated_noise(NoiseMechanism::Gaussian, 1.0, 1.0, None).is_err());
        assert!(calibrated_noise(NoiseMechanism::Laplace, 1.0, 1.0, Some(0.1)).is_err());
    }

    #[test]
    fn test_invalid_params() {
        assert!(validate_privacy_params(0.0, 1.0, None).is_err());
        assert!(validate_privacy_params(1.0, -1.0, None).is_err());
        assert!(validate_privacy_params(1.0, 1.0, Some(1.0)).is_err());
        assert!(validate_privacy_params(1.0, 1.0, Some(0.0)).is_err());
        assert!(validate_privacy_params(1.0, 1.0, Some(0.5)).is_ok());
    }

    #[test]
    fn test_laplace_sample_variance() {
        let mut rng = StdRng::seed_from_u64(11);
        let n = 50_000;
        let samples: Vec<f64> = (0..n)
            .map(|_| sample(NoiseMechanism::Laplace, 1.5, &mut rng).unwrap())
            .collect();
        let mean = samples.iter().sum::<f64>() / n as f64;
        let var = samples.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n as f64;
        let expected = NoiseMechanism::Laplace.variance(1.5);
        assert!(mean.abs() < 0.1, "mean {}", mean);
        assert!((var - expected).abs() / expected < 0.1, "variance {}", var);
    }

    #[test]
    fn test_for_delta() {
        assert_eq!(NoiseMechanism::for_delta(None), NoiseMechanism::Laplace);
        assert_eq!(NoiseMechanism::for_delta(Some(0.01)), NoiseMechanism::Gaussian);
    }
}
