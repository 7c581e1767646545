//! Lagrange interpolation evaluated at `x = 0`.
//!
//! Recovers the constant term of the unique polynomial of degree
//! `< points.len()` passing through the given points. The abscissae must be
//! pairwise distinct; callers deduplicate before getting here.

/// Lagrange basis coefficients `Π_{j≠i} (0 − x_j) / (x_i − x_j)` for each `x_i`.
pub fn lagrange_coefficients_at_zero(xs: &[f64]) -> Vec<f64> {
    xs.iter()
        .enumerate()
        .map(|(i, &xi)| {
            xs.iter()
                .enumerate()
                .filter(|&(j, _)| j != i)
                .fold(1.0, |acc, (_, &xj)| acc * (-xj) / (xi - xj))
        })
        .collect()
}

/// Interpolate `(x, y)` points and evaluate the polynomial at zero.
pub fn lagrange_at_zero(points: &[(f64, f64)]) -> f64 {
    let xs: Vec<f64> = points.iter().map(|&(x, _)| x).collect();
    lagrange_coefficients_at_zero(&xs)
        .iter()
        .zip(points.iter())
        .map(|(&l, &(_, y))| l * y)
        .sum()
}
