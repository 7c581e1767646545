//! Model parameter containers exchanged between clients and the coordinator.

use std::collections::{BTreeMap, BTreeSet};

use ndarray::{Array1, ArrayD};
use serde::{Deserialize, Serialize};

/// Parameter name to tensor mapping.
pub type ParameterMap = BTreeMap<String, ArrayD<f64>>;

/// A client's proposed model parameters.
///
/// Must carry exactly the parameter names of the global model, each with the
/// same shape.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelUpdate {
    parameters: ParameterMap,
}

impl ModelUpdate {
    /// Create an update with no parameters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a parameter tensor.
    pub fn with_parameter(mut self, name: impl Into<String>, tensor: ArrayD<f64>) -> Self {
        self.parameters.insert(name.into(), tensor);
        self
    }

    /// Add or replace a one-dimensional parameter.
    pub fn with_vector(self, name: impl Into<String>, values: Vec<f64>) -> Self {
        self.with_parameter(name, Array1::from(values).into_dyn())
    }

    /// Look up a parameter.
    pub fn get(&self, name: &str) -> Option<&ArrayD<f64>> {
        self.parameters.get(name)
    }

    /// All parameters.
    pub fn parameters(&self) -> &ParameterMap {
        &self.parameters
    }

    /// Parameter names, sorted.
    pub fn names(&self) -> BTreeSet<&str> {
        self.parameters.keys().map(String::as_str).collect()
    }

    /// Consume the update and return its parameters.
    pub fn into_parameters(self) -> ParameterMap {
        self.parameters
    }
}

impl From<ParameterMap> for ModelUpdate {
    fn from(parameters: ParameterMap) -> Self {
        Self { parameters }
    }
}

/// The coordinator's current model and its version.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GlobalModel {
    /// Completed aggregation rounds since startup
    pub version: u64,
    /// Current parameters
    pub parameters: ParameterMap,
}

impl GlobalModel {
    /// Create a version-0 model from initial parameters.
    pub fn new(initial: impl Into<ModelUpdate>) -> Self {
        Self {
            version: 0,
            parameters: initial.into().into_parameters(),
        }
    }

    /// Look up a parameter.
    pub fn get(&self, name: &str) -> Option<&ArrayD<f64>> {
        self.parameters.get(name)
    }

    /// Parameter names, sorted.
    pub fn names(&self) -> BTreeSet<&str> {
        self.parameters.keys().map(String::as_str).collect()
    }

    /// The parameters as a model update, e.g. to hand to a client.
    pub fn to_update(&self) -> ModelUpdate {
        ModelUpdate::from(self.parameters.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_vector_shape() {
        let update = ModelUpdate::new().with_vector("w", vec![1.0, 2.0, 3.0]);
        assert_eq!(update.get("w").unwrap().shape(), &[3]);
    }

    #[test]
    fn test_names_sorted() {
        let update = ModelUpdate::new()
            .with_vector("weights", vec![0.0])
            .with_vector("bias", vec![0.0]);
        let names: Vec<&str> = update.names().into_iter().collect();
        assert_eq!(names, vec!["bias", "weights"]);
    }

    #[test]
    fn test_global_model_starts_at_zero() {
        let model = GlobalModel::new(ModelUpdate::new().with_vector("w", vec![0.5]));
        assert_eq!(model.version, 0);
        assert_eq!(model.get("w").unwrap()[[0]], 0.5);
    }

    #[test]
    fn test_model_serde() {
        let model = GlobalModel::new(ModelUpdate::new().with_vector("w", vec![1.0, -1.0]));
        let json = serde_json::to_string(&model).unwrap();
        let restored: GlobalModel = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, model);
    }
}
