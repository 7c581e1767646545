//! Polynomial evaluation.

/// Evaluate `c[0] + c[1]·x + c[2]·x² + ...` with Horner's rule.
///
/// An empty coefficient slice is the zero polynomial.
pub fn evaluate(coefficients: &[f64], x: f64) -> f64 {
    coefficients
        .iter()
        .rev()
        .fold(0.0, |acc, &c| acc * x + c)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant() {
        assert_eq!(evaluate(&[7.5], 3.0), 7.5);
    }

    #[test]
    fn test_quadratic() {
        // 1 + 2x + 3x^2 at x = 2 -> 1 + 4 + 12
        assert!((evaluate(&[1.0, 2.0, 3.0], 2.0) - 17.0).abs() < 1e-12);
    }

    #[test]
    fn test_empty_is_zero() {
        assert_eq!(evaluate(&[], 5.0), 0.0);
    }
}
