//! Dense Autoencoder from JSON Weights
//!
//! Kernels use the Keras layout `[inputs][outputs]`, so weights exported
//! layer by layer with `layer.get_weights()` can be dumped as-is.

use crate::model::{Autoencoder, ModelFormat};
use crate::InferenceError;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Layer activation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Activation {
    #[default]
    Linear,
    Relu,
    Sigmoid,
    Tanh,
}

impl Activation {
    fn apply(&self, x: f32) -> f32 {
        match self {
            Activation::Linear => x,
            Activation::Relu => x.max(0.0),
            Activation::Sigmoid => 1.0 / (1.0 + (-x).exp()),
            Activation::Tanh => x.tanh(),
        }
    }
}

/// Serialized dense layer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DenseLayerSpec {
    /// `kernel[i][j]` connects input `i` to output `j`
    pub kernel: Vec<Vec<f32>>,
    pub bias: Vec<f32>,
    #[serde(default)]
    pub activation: Activation,
}

/// Serialized dense autoencoder
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DenseModelSpec {
    pub layers: Vec<DenseLayerSpec>,
}

struct DenseLayer {
    kernel: Array2<f32>,
    bias: Array1<f32>,
    activation: Activation,
}

/// Feed-forward autoencoder evaluated with ndarray
pub struct DenseAutoencoder {
    layers: Vec<DenseLayer>,
    input_dim: usize,
}

impl DenseAutoencoder {
    /// Load weights from a JSON file
    pub fn load(path: &Path) -> Result<Self, InferenceError> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            InferenceError::ModelLoadError(format!("{}: {}", path.display(), e))
        })?;
        let spec: DenseModelSpec = serde_json::from_str(&text).map_err(|e| {
            InferenceError::ModelLoadError(format!("{}: {}", path.display(), e))
        })?;
        Self::from_spec(spec)
    }

    /// Build from an in-memory spec, validating layer shapes
    pub fn from_spec(spec: DenseModelSpec) -> Result<Self, InferenceError> {
        if spec.layers.is_empty() {
            return Err(InferenceError::ModelLoadError("model has no layers".to_string()));
        }

        let mut layers = Vec::with_capacity(spec.layers.len());
        let mut width: Option<usize> = None;

        for (idx, layer) in spec.layers.into_iter().enumerate() {
            let inputs = layer.kernel.len();
            let outputs = layer.kernel.first().map(Vec::len).unwrap_or(0);

            if inputs == 0 || outputs == 0 {
                return Err(InferenceError::ModelLoadError(format!("layer {} has an empty kernel", idx)));
            }
            if layer.kernel.iter().any(|row| row.len() != outputs) {
                return Err(InferenceError::ModelLoadError(format!("layer {} kernel is ragged", idx)));
            }
            if layer.bias.len() != outputs {
                return Err(InferenceError::ModelLoadError(format!(
                    "layer {} bias has {} values, expected {}",
                    idx,
                    layer.bias.len(),
                    outputs
                )));
            }
            if let Some(prev) = width {
                if prev != inputs {
                    return Err(InferenceError::ModelLoadError(format!(
                        "layer {} expects {} inputs but previous layer yields {}",
                        idx, inputs, prev
                    )));
                }
            }

            let flat: Vec<f32> = layer.kernel.into_iter().flatten().collect();
            let kernel = Array2::from_shape_vec((inputs, outputs), flat)
                .map_err(|e| InferenceError::ModelLoadError(e.to_string()))?;

            layers.push(DenseLayer {
                kernel,
                bias: Array1::from(layer.bias),
                activation: layer.activation,
            });
            width = Some(outputs);
        }

        let input_dim = layers[0].kernel.nrows();
        if width != Some(input_dim) {
            return Err(InferenceError::ModelLoadError(format!(
                "output width {:?} does not match input width {}",
                width, input_dim
            )));
        }

        Ok(Self { layers, input_dim })
    }
}

impl Autoencoder for DenseAutoencoder {
    fn input_dim(&self) -> usize {
        self.input_dim
    }

    fn reconstruct(&self, input: &[f32]) -> Result<Vec<f32>, InferenceError> {
        if input.len() != self.input_dim {
            return Err(InferenceError::DimensionMismatch {
                expected: self.input_dim,
                actual: input.len(),
            });
        }

        let mut x = Array1::from(input.to_vec());
        for layer in &self.layers {
            x = x.dot(&layer.kernel) + &layer.bias;
            let activation = layer.activation;
            x.mapv_inplace(|v| activation.apply(v));
        }

        Ok(x.to_vec())
    }

    fn format(&self) -> ModelFormat {
        ModelFormat::Dense
    }
}
