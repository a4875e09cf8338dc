//! Dataset Routes

use axum::{
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use feature_engine::Waveform;
use serde::Serialize;
use std::path::PathBuf;
use storage::DatasetKind;

use super::{analyze_with, spectrogram_with, AnalysisResponse};
use crate::error::ApiError;
use crate::SharedState;

/// Response for the dataset listing endpoint
#[derive(Debug, Serialize)]
pub struct DatasetListResponse {
    pub dataset: DatasetKind,
    pub files: Vec<String>,
    pub count: usize,
}

async fn resolve(state: &SharedState, kind: &str, file: &str) -> Result<(DatasetKind, PathBuf), ApiError> {
    let kind: DatasetKind = kind.parse()?;
    let path = state.read().await.dataset.resolve(kind, file)?;
    Ok((kind, path))
}

/// List the `.wav` recordings of one dataset folder
pub async fn list_files(
    State(state): State<SharedState>,
    Path(kind): Path<String>,
) -> Result<Json<DatasetListResponse>, ApiError> {
    let kind: DatasetKind = kind.parse()?;
    let files = state.read().await.dataset.list(kind)?;
    Ok(Json(DatasetListResponse {
        dataset: kind,
        count: files.len(),
        files,
    }))
}

/// Raw WAV bytes for playback
pub async fn audio(
    State(state): State<SharedState>,
    Path((kind, file)): Path<(String, String)>,
) -> Result<Response, ApiError> {
    let kind: DatasetKind = kind.parse()?;
    let bytes = state.read().await.dataset.read(kind, &file)?;
    Ok(([(header::CONTENT_TYPE, "audio/wav")], bytes).into_response())
}

/// Mel-spectrogram PNG of a recording
pub async fn spectrogram(
    State(state): State<SharedState>,
    Path((kind, file)): Path<(String, String)>,
) -> Result<Response, ApiError> {
    let (_, path) = resolve(&state, &kind, &file).await?;
    spectrogram_with(&state, move || Waveform::from_wav_path(&path).map_err(ApiError::from)).await
}

/// Score a recording against the active model
pub async fn analyze(
    State(state): State<SharedState>,
    Path((kind, file)): Path<(String, String)>,
) -> Result<Json<AnalysisResponse>, ApiError> {
    let (kind, path) = resolve(&state, &kind, &file).await?;
    let source = format!("{}/{}", kind.dir_name(), file);
    let response = analyze_with(&state, source, move || {
        Waveform::from_wav_path(&path).map_err(ApiError::from)
    })
    .await?;
    Ok(Json(response))
}
