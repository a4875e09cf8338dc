//! Upload Routes
//!
//! The request body is the WAV file itself. It is spooled to a transient
//! file, decoded once and the file removed before the handler returns.

use axum::{body::Bytes, extract::State, response::Response, Json};
use feature_engine::Waveform;
use std::path::PathBuf;
use storage::TransientUpload;

use super::{analyze_with, spectrogram_with, AnalysisResponse};
use crate::error::ApiError;
use crate::SharedState;

fn decode_upload(dir: Option<PathBuf>, body: Bytes) -> Result<Waveform, ApiError> {
    let upload = TransientUpload::write(dir.as_deref(), &body)?;
    let waveform = Waveform::from_wav_path(upload.path())?;
    Ok(waveform)
}

/// Score an uploaded recording against the active model
pub async fn analyze_upload(
    State(state): State<SharedState>,
    body: Bytes,
) -> Result<Json<AnalysisResponse>, ApiError> {
    let dir = state.read().await.upload_dir.clone();
    let response = analyze_with(&state, "upload".to_string(), move || decode_upload(dir, body)).await?;
    Ok(Json(response))
}

/// Mel-spectrogram PNG of an uploaded recording
pub async fn upload_spectrogram(
    State(state): State<SharedState>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let dir = state.read().await.upload_dir.clone();
    spectrogram_with(&state, move || decode_upload(dir, body)).await
}
