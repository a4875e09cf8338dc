//! Request handlers

pub mod dataset;
pub mod models;
pub mod upload;

use axum::{
    http::header,
    response::{IntoResponse, Response},
};
use feature_engine::{MelSpectrogram, Waveform};
use inference_engine::{Analysis, Verdict};
use metrics::{counter, histogram};
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

use crate::error::ApiError;
use crate::SharedState;

/// Scoring outcome returned to clients
#[derive(Debug, Serialize)]
pub struct AnalysisResponse {
    /// `normal/<file>`, `abnormal/<file>` or `upload`
    pub source: String,
    pub model: String,
    pub reconstruction_error: f64,
    /// Error formatted to six decimals
    pub reconstruction_error_display: String,
    pub threshold: f64,
    pub verdict: Verdict,
    pub message: String,
    pub features: Vec<f32>,
    pub latency_ms: u64,
}

impl AnalysisResponse {
    fn new(source: String, model: String, analysis: Analysis) -> Self {
        let score = analysis.score;
        Self {
            source,
            model,
            reconstruction_error: score.reconstruction_error,
            reconstruction_error_display: format!("{:.6}", score.reconstruction_error),
            threshold: score.threshold,
            verdict: score.verdict,
            message: score.verdict.message().to_string(),
            features: analysis.features.values,
            latency_ms: analysis.latency_ms,
        }
    }
}

/// Score the waveform produced by `load` against the active model.
///
/// `load` runs on the blocking pool and only after a model is confirmed,
/// so a missing model never touches the audio.
pub(crate) async fn analyze_with<F>(
    state: &SharedState,
    source: String,
    load: F,
) -> Result<AnalysisResponse, ApiError>
where
    F: FnOnce() -> Result<Waveform, ApiError> + Send + 'static,
{
    let result = analyze_inner(state, source, load).await;
    match &result {
        Ok(response) => {
            counter!("pump_detector_analyses_total", "verdict" => response.verdict.as_str())
                .increment(1);
            histogram!("pump_detector_reconstruction_error").record(response.reconstruction_error);
        }
        Err(e) => {
            counter!("pump_detector_analysis_failures_total", "kind" => e.kind()).increment(1);
        }
    }
    result
}

async fn analyze_inner<F>(
    state: &SharedState,
    source: String,
    load: F,
) -> Result<AnalysisResponse, ApiError>
where
    F: FnOnce() -> Result<Waveform, ApiError> + Send + 'static,
{
    let (detector, active) = {
        let state = state.read().await;
        (Arc::clone(&state.detector), state.session.scoring_model())
    };
    let active = active?;

    let model = Arc::clone(&active.model);
    let analysis = tokio::task::spawn_blocking(move || {
        let waveform = load()?;
        detector
            .analyze(&waveform, Some(model.as_ref()))
            .map_err(ApiError::from)
    })
    .await
    .map_err(|e| ApiError::Internal(e.to_string()))??;

    info!(
        "{}: error={:.6} verdict={} (model={})",
        source,
        analysis.score.reconstruction_error,
        analysis.score.verdict.as_str(),
        active.name
    );

    Ok(AnalysisResponse::new(source, active.name, analysis))
}

/// Render the diagnostic mel-spectrogram of the waveform produced by `load`
pub(crate) async fn spectrogram_with<F>(state: &SharedState, load: F) -> Result<Response, ApiError>
where
    F: FnOnce() -> Result<Waveform, ApiError> + Send + 'static,
{
    let detector = Arc::clone(&state.read().await.detector);

    let png = tokio::task::spawn_blocking(move || {
        let waveform = load()?;
        MelSpectrogram::compute(detector.extractor(), &waveform)?
            .render_png()
            .map_err(ApiError::from)
    })
    .await
    .map_err(|e| ApiError::Internal(e.to_string()))??;

    Ok(([(header::CONTENT_TYPE, "image/png")], png).into_response())
}
