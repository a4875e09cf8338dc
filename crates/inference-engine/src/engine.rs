//! Reconstruction-Error Scoring

use crate::model::Autoencoder;
use crate::InferenceError;
use feature_engine::FeatureVector;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Reconstruction error above which a recording is flagged
pub const DEFAULT_ANOMALY_THRESHOLD: f64 = 0.02;

/// Classification of a recording
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    /// Reconstruction error at or below threshold
    Normal,
    /// Reconstruction error above threshold
    Anomaly,
}

impl Verdict {
    /// Get string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Normal => "normal",
            Verdict::Anomaly => "anomaly",
        }
    }

    /// Human-readable status line
    pub fn message(&self) -> &'static str {
        match self {
            Verdict::Normal => "Normal pump sound detected",
            Verdict::Anomaly => "Anomaly detected",
        }
    }
}

/// Result of scoring one feature vector
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Score {
    /// Mean squared reconstruction error
    pub reconstruction_error: f64,
    /// Threshold the verdict was taken against
    pub threshold: f64,
    pub verdict: Verdict,
}

/// Mean squared difference between a vector and its reconstruction
pub fn reconstruction_error(input: &[f32], reconstruction: &[f32]) -> f64 {
    if input.is_empty() {
        return 0.0;
    }
    let sum: f64 = input
        .iter()
        .zip(reconstruction)
        .map(|(&a, &b)| {
            let d = a as f64 - b as f64;
            d * d
        })
        .sum();
    sum / input.len() as f64
}

/// Scores feature vectors against a loaded autoencoder
#[derive(Debug, Clone)]
pub struct AnomalyScorer {
    threshold: f64,
}

impl AnomalyScorer {
    /// Create a scorer with the given threshold
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Strictly greater than the threshold is an anomaly
    pub fn classify(&self, error: f64) -> Verdict {
        if error > self.threshold {
            Verdict::Anomaly
        } else {
            Verdict::Normal
        }
    }

    /// Reconstruct `features` with `model` and classify the error
    pub fn score(
        &self,
        features: &FeatureVector,
        model: Option<&dyn Autoencoder>,
    ) -> Result<Score, InferenceError> {
        let model = model
            .ok_or_else(|| InferenceError::ModelUnavailable("no model loaded".to_string()))?;

        let expected = model.input_dim();
        if features.len() != expected {
            return Err(InferenceError::DimensionMismatch {
                expected,
                actual: features.len(),
            });
        }

        let reconstruction = model.reconstruct(features.as_slice())?;
        if reconstruction.len() != expected {
            return Err(InferenceError::InferenceFailed(format!(
                "reconstruction has {} values, expected {}",
                reconstruction.len(),
                expected
            )));
        }

        let error = reconstruction_error(features.as_slice(), &reconstruction);
        if !error.is_finite() {
            return Err(InferenceError::InferenceFailed(format!(
                "reconstruction error is not finite ({})",
                error
            )));
        }
        let verdict = self.classify(error);
        debug!(
            "Scored {} features: error={:.6}, verdict={}",
            expected,
            error,
            verdict.as_str()
        );

        Ok(Score {
            reconstruction_error: error,
            threshold: self.threshold,
            verdict,
        })
    }
}

impl Default for AnomalyScorer {
    fn default() -> Self {
        Self::new(DEFAULT_ANOMALY_THRESHOLD)
    }
}
