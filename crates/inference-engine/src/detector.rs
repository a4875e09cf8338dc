//! Extract-then-score pipeline

use crate::engine::{AnomalyScorer, Score};
use crate::model::Autoencoder;
use crate::{DetectError, InferenceError};
use feature_engine::{FeatureExtractor, FeatureVector, Waveform};
use serde::Serialize;
use std::time::Instant;
use tracing::debug;

/// Outcome of analysing one recording
#[derive(Debug, Clone, Serialize)]
pub struct Analysis {
    pub features: FeatureVector,
    pub score: Score,
    /// Wall time spent extracting and scoring
    pub latency_ms: u64,
}

/// Feature extractor and scorer bundled for one-call analysis
pub struct AnomalyDetector {
    extractor: FeatureExtractor,
    scorer: AnomalyScorer,
}

impl AnomalyDetector {
    pub fn new(extractor: FeatureExtractor, scorer: AnomalyScorer) -> Self {
        Self { extractor, scorer }
    }

    pub fn extractor(&self) -> &FeatureExtractor {
        &self.extractor
    }

    pub fn scorer(&self) -> &AnomalyScorer {
        &self.scorer
    }

    /// Extract features sized to the model's input and score them.
    ///
    /// Fails with `ModelUnavailable` before touching the audio when no model
    /// is loaded.
    pub fn analyze(
        &self,
        waveform: &Waveform,
        model: Option<&dyn Autoencoder>,
    ) -> Result<Analysis, DetectError> {
        let start = Instant::now();
        let model = model
            .ok_or_else(|| InferenceError::ModelUnavailable("no model loaded".to_string()))?;

        let features = self.extractor.extract(waveform, model.input_dim())?;
        let score = self.scorer.score(&features, Some(model))?;

        let latency_ms = start.elapsed().as_millis() as u64;
        debug!("Analysis completed in {}ms", latency_ms);

        Ok(Analysis {
            features,
            score,
            latency_ms,
        })
    }
}
