//! ONNX Autoencoder (tract)

use crate::model::{Autoencoder, ModelFormat};
use crate::InferenceError;
use std::path::Path;
use tract_onnx::prelude::*;
use tracing::debug;

/// ONNX autoencoder specialised to a `[1, input_dim]` f32 input
pub struct OnnxAutoencoder {
    /// Optimized runnable plan
    plan: TypedRunnableModel<TypedModel>,
    /// Width of the last input axis
    input_dim: usize,
}

impl OnnxAutoencoder {
    /// Load and optimize an ONNX graph.
    ///
    /// The expected feature width is read from the last axis of the first
    /// input; the batch axis is pinned to 1.
    pub fn load(path: &Path) -> Result<Self, InferenceError> {
        let load_err = |e: TractError| {
            InferenceError::ModelLoadError(format!("{}: {}", path.display(), e))
        };

        let probe = tract_onnx::onnx()
            .model_for_path(path)
            .and_then(|m| m.into_typed())
            .map_err(load_err)?;
        let input_dim = {
            let fact = probe.input_fact(0).map_err(load_err)?;
            fact.shape
                .last()
                .and_then(|d| d.to_i64().ok())
                .and_then(|d| usize::try_from(d).ok())
                .filter(|&d| d > 0)
                .ok_or_else(|| {
                    InferenceError::ModelLoadError(format!(
                        "{}: input has no concrete feature dimension",
                        path.display()
                    ))
                })?
        };
        debug!("ONNX model {} expects {} features", path.display(), input_dim);

        let plan = tract_onnx::onnx()
            .model_for_path(path)
            .and_then(|m| m.with_input_fact(0, f32::fact([1, input_dim]).into()))
            .and_then(|m| m.into_optimized())
            .and_then(|m| m.into_runnable())
            .map_err(load_err)?;

        Ok(Self { plan, input_dim })
    }
}

impl Autoencoder for OnnxAutoencoder {
    fn input_dim(&self) -> usize {
        self.input_dim
    }

    fn reconstruct(&self, input: &[f32]) -> Result<Vec<f32>, InferenceError> {
        let tensor = Tensor::from_shape(&[1, input.len()], input)
            .map_err(|e| InferenceError::InferenceFailed(e.to_string()))?;

        let outputs = self
            .plan
            .run(tvec!(tensor.into()))
            .map_err(|e| InferenceError::InferenceFailed(e.to_string()))?;

        let output = outputs
            .first()
            .ok_or_else(|| InferenceError::InferenceFailed("model produced no output".to_string()))?;
        let view = output
            .to_array_view::<f32>()
            .map_err(|e| InferenceError::InferenceFailed(e.to_string()))?;

        Ok(view.iter().copied().collect())
    }

    fn format(&self) -> ModelFormat {
        ModelFormat::Onnx
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AnomalyScorer;
    use feature_engine::FeatureVector;
    use std::path::PathBuf;

    /// `y = x · I` over a `[1, 4]` input
    fn identity_fixture() -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures/identity_4.onnx")
    }

    #[test]
    fn test_input_dim_from_last_axis() {
        let model = OnnxAutoencoder::load(&identity_fixture()).unwrap();
        assert_eq!(model.input_dim(), 4);
        assert_eq!(model.format(), ModelFormat::Onnx);
    }

    #[test]
    fn test_identity_graph_round_trips() {
        let model = OnnxAutoencoder::load(&identity_fixture()).unwrap();
        let input = [0.5f32, -1.25, 3.0, 0.0];

        let output = model.reconstruct(&input).unwrap();
        assert_eq!(output, input.to_vec());

        let score = AnomalyScorer::default()
            .score(&FeatureVector::new(input.to_vec()), Some(&model))
            .unwrap();
        assert_eq!(score.reconstruction_error, 0.0);
        assert_eq!(score.verdict, crate::Verdict::Normal);
    }

    #[test]
    fn test_onnx_dispatch_by_extension() {
        let model = crate::load_model(&identity_fixture()).unwrap();
        assert_eq!(model.input_dim(), 4);
    }

    #[test]
    fn test_corrupt_onnx_is_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Encoder_Model.onnx");
        std::fs::write(&path, b"\x00\x01 not a protobuf graph").unwrap();

        let err = OnnxAutoencoder::load(&path).err().unwrap();
        assert!(matches!(err, InferenceError::ModelLoadError(_)));
    }
}
