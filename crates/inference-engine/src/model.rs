//! Reconstruction Model Abstraction

use crate::dense::DenseAutoencoder;
use crate::onnx::OnnxAutoencoder;
use crate::InferenceError;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// A trained model mapping a feature vector onto its reconstruction
pub trait Autoencoder: Send + Sync {
    /// Expected input (and output) width
    fn input_dim(&self) -> usize;

    /// Run forward inference on a single vector of `input_dim()` values
    fn reconstruct(&self, input: &[f32]) -> Result<Vec<f32>, InferenceError>;

    /// Serialized format the model was loaded from
    fn format(&self) -> ModelFormat;
}

/// On-disk model format, chosen by file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelFormat {
    /// ONNX graph executed with tract
    Onnx,
    /// Dense layer weights serialized as JSON
    Dense,
}

impl ModelFormat {
    /// Detect format from a path's extension
    pub fn from_path(path: &Path) -> Option<Self> {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .as_deref()
        {
            Some("onnx") => Some(ModelFormat::Onnx),
            Some("json") => Some(ModelFormat::Dense),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ModelFormat::Onnx => "onnx",
            ModelFormat::Dense => "dense",
        }
    }
}

/// Load a model file, dispatching on its extension
pub fn load_model(path: &Path) -> Result<Arc<dyn Autoencoder>, InferenceError> {
    if !path.is_file() {
        return Err(InferenceError::ModelUnavailable(format!(
            "Model '{}' not found",
            path.display()
        )));
    }

    let model: Arc<dyn Autoencoder> = match ModelFormat::from_path(path) {
        Some(ModelFormat::Onnx) => Arc::new(OnnxAutoencoder::load(path)?),
        Some(ModelFormat::Dense) => Arc::new(DenseAutoencoder::load(path)?),
        None => {
            return Err(InferenceError::ModelLoadError(format!(
                "Unsupported model format: {}",
                path.display()
            )))
        }
    };

    info!(
        "Model loaded: {} (format={}, input_dim={})",
        path.display(),
        model.format().as_str(),
        model.input_dim()
    );
    Ok(model)
}
