//! Autoencoder Inference Engine
//!
//! Loads reconstruction models and scores cepstral feature vectors by their
//! reconstruction error.

mod catalog;
mod dense;
mod detector;
mod engine;
mod model;
mod onnx;

pub use catalog::{CacheLookup, ModelCatalog, ModelStatus};
pub use dense::{Activation, DenseAutoencoder, DenseLayerSpec, DenseModelSpec};
pub use detector::{AnomalyDetector, Analysis};
pub use engine::{
    reconstruction_error, AnomalyScorer, Score, Verdict, DEFAULT_ANOMALY_THRESHOLD,
};
pub use model::{load_model, Autoencoder, ModelFormat};
pub use onnx::OnnxAutoencoder;

use feature_engine::FeatureError;
use thiserror::Error;

/// Errors during model loading and inference
#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("Model unavailable: {0}")]
    ModelUnavailable(String),
    #[error("Model load failed: {0}")]
    ModelLoadError(String),
    #[error("Feature dimension mismatch: model expects {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
    #[error("Inference failed: {0}")]
    InferenceFailed(String),
}

/// Errors from the combined extract-then-score pipeline
#[derive(Debug, Error)]
pub enum DetectError {
    #[error(transparent)]
    Feature(#[from] FeatureError),
    #[error(transparent)]
    Inference(#[from] InferenceError),
}
