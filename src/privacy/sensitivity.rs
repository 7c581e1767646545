//! Leave-one-out sensitivity estimation.

use rayon::prelude::*;

use crate::error::PrivacyError;

/// Largest change in `aggregate` caused by removing any single record.
///
/// Evaluates `aggregate` on the full dataset and on every dataset with
/// exactly one record removed, returning the maximum absolute difference.
/// A single-record dataset has no non-empty neighbour and yields `0.0`; an
/// empty dataset is [`PrivacyError::InvalidInput`]. Non-finite aggregate
/// outputs are also rejected.
pub fn estimate_sensitivity<F>(dataset: &[f64], aggregate: F) -> Result<f64, PrivacyError>
where
    F: Fn(&[f64]) -> f64 + Sync,
{
    if dataset.is_empty() {
        return Err(PrivacyError::InvalidInput(
            "cannot estimate sensitivity of an empty dataset".to_string(),
        ));
    }
    if dataset.len() == 1 {
        return Ok(0.0);
    }

    let full = finite(aggregate(dataset))?;
    let max_change = (0..dataset.len())
        .into_par_iter()
        .map(|i| {
            let mut neighbour = Vec::with_capacity(dataset.len() - 1);
            neighbour.extend_from_slice(&dataset[..i]);
            neighbour.extend_from_slice(&dataset[i + 1..]);
            finite(aggregate(&neighbour)).map(|v| (full - v).abs())
        })
        .try_reduce(|| 0.0, |a, b| Ok(a.max(b)))?;

    Ok(max_change)
}

fn finite(value: f64) -> Result<f64, PrivacyError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(PrivacyError::InvalidInput(
            "aggregate produced a non-finite value".to_string(),
        ))
    }
}

/// Sum of a dataset, a common aggregate for [`estimate_sensitivity`].
pub fn sum(values: &[f64]) -> f64 {
    values.iter().sum()
}

/// Arithmetic mean, `0.0` for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        sum(values) / values.len() as f64
    }
}
