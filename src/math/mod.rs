//! Mathematical primitives for ppml-core.
//!
//! - [`polynomial`] - evaluation of share polynomials
//! - [`interpolation`] - Lagrange interpolation at zero

pub mod interpolation;
pub mod polynomial;

pub use interpolation::{lagrange_at_zero, lagrange_coefficients_at_zero};
pub use polynomial::evaluate;
