//! Federated averaging over named parameter tensors.
//!
//! Two rules live here. [`fedavg`] is the textbook (optionally weighted)
//! mean of McMahan et al. (2017), one term per update. [`client_count_average`]
//! is the coordinator's round rule: every buffered update is divided by the
//! number of *distinct clients*, so a client that reported twice before the
//! round closed contributes two terms.

use std::collections::BTreeMap;

use ndarray::ArrayD;
use rayon::prelude::*;

use crate::error::PrivacyError;
use crate::model::{ModelUpdate, ParameterMap};

fn check_structure(template: &ParameterMap, update: &ModelUpdate) -> Result<(), PrivacyError> {
    let params = update.parameters();
    if params.len() != template.len() || params.keys().zip(template.keys()).any(|(a, b)| a != b) {
        return Err(PrivacyError::MalformedUpdate(format!(
            "expected parameters {:?}, got {:?}",
            template.keys().collect::<Vec<_>>(),
            params.keys().collect::<Vec<_>>()
        )));
    }
    for (name, tensor) in params {
        let expected = &template[name];
        if tensor.shape() != expected.shape() {
            return Err(PrivacyError::InvalidInput(format!(
                "parameter '{}' has shape {:?}, expected {:?}",
                name,
                tensor.shape(),
                expected.shape()
            )));
        }
    }
    Ok(())
}

/// Check that `update` has exactly the parameter names and shapes of `template`.
///
/// A differing name set is [`PrivacyError::MalformedUpdate`]; a differing
/// tensor shape under a matching name is [`PrivacyError::InvalidInput`].
pub fn validate_update(template: &ParameterMap, update: &ModelUpdate) -> Result<(), PrivacyError> {
    check_structure(template, update)?;
    if update
        .parameters()
        .values()
        .any(|t| t.iter().any(|v| !v.is_finite()))
    {
        return Err(PrivacyError::InvalidInput(
            "update contains non-finite values".to_string(),
        ));
    }
    Ok(())
}

/// Standard FedAvg: (optionally weighted) arithmetic mean of updates.
///
/// # Arguments
///
/// * `updates` - Client model updates, all with the same structure
/// * `weights` - Optional client weights (e.g. proportional to dataset size)
pub fn fedavg(updates: &[ModelUpdate], weights: Option<&[f64]>) -> Result<ParameterMap, PrivacyError> {
    let first = updates.first().ok_or(PrivacyError::EmptyDataset)?;
    let template = first.parameters();
    for update in &updates[1..] {
        check_structure(template, update)?;
    }

    let weights: Vec<f64> = match weights {
        Some(w) => {
            if w.len() != updates.len() {
                return Err(PrivacyError::InvalidInput(format!(
                    "{} weights for {} updates",
                    w.len(),
                    updates.len()
                )));
            }
            w.to_vec()
        }
        None => vec![1.0; updates.len()],
    };
    let weight_sum: f64 = weights.iter().sum();
    if weight_sum <= 0.0 {
        return Err(PrivacyError::InvalidInput(
            "weights must sum to a positive value".to_string(),
        ));
    }

    Ok(template
        .par_iter()
        .map(|(name, tensor)| {
            let sum = updates.iter().zip(weights.iter()).fold(
                ArrayD::<f64>::zeros(tensor.raw_dim()),
                |acc, (update, &w)| acc + &(&update.parameters()[name] * w),
            );
            (name.clone(), sum / weight_sum)
        })
        .collect())
}

/// The coordinator's round rule over a client buffer.
///
/// For each parameter of `template`, sums `value / distinct_clients` over
/// every buffered update of every client. Updates must already have been
/// validated against `template`.
pub fn client_count_average(
    template: &ParameterMap,
    buffer: &BTreeMap<String, Vec<ModelUpdate>>,
) -> Result<ParameterMap, PrivacyError> {
    let clients = buffer.values().filter(|u| !u.is_empty()).count();
    if clients == 0 {
        return Err(PrivacyError::EmptyDataset);
    }
    let divisor = clients as f64;

    Ok(template
        .par_iter()
        .map(|(name, tensor)| {
            let acc = buffer.values().flatten().fold(
                ArrayD::<f64>::zeros(tensor.raw_dim()),
                |acc, update| match update.get(name) {
                    Some(value) => acc + &(value / divisor),
                    None => acc,
                },
            );
            (name.clone(), acc)
        })
        .collect())
}
