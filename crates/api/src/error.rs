//! API error mapping

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use feature_engine::FeatureError;
use inference_engine::{DetectError, InferenceError};
use serde::Serialize;
use storage::StorageError;
use thiserror::Error;
use tracing::warn;

/// Errors surfaced by request handlers
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Inference(#[from] InferenceError),
    #[error(transparent)]
    Feature(#[from] FeatureError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<DetectError> for ApiError {
    fn from(err: DetectError) -> Self {
        match err {
            DetectError::Feature(e) => ApiError::Feature(e),
            DetectError::Inference(e) => ApiError::Inference(e),
        }
    }
}

/// Error body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: &'static str,
    pub message: String,
}

impl ApiError {
    /// Stable machine-readable error kind
    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::Inference(InferenceError::ModelUnavailable(_)) => "model_unavailable",
            ApiError::Inference(InferenceError::ModelLoadError(_)) => "model_load_failed",
            ApiError::Inference(InferenceError::DimensionMismatch { .. }) => "dimension_mismatch",
            ApiError::Inference(InferenceError::InferenceFailed(_)) => "inference_failed",
            ApiError::Feature(FeatureError::InvalidAudio(_)) => "invalid_audio",
            ApiError::Feature(FeatureError::InvalidDimension { .. }) => "invalid_dimension",
            ApiError::Feature(FeatureError::ImageEncoding(_))
            | ApiError::Feature(FeatureError::InvalidConfig(_)) => "internal",
            ApiError::Storage(StorageError::FolderNotFound(_))
            | ApiError::Storage(StorageError::FileNotFound(_)) => "not_found",
            ApiError::Storage(StorageError::InvalidName(_))
            | ApiError::Storage(StorageError::UnknownDataset(_)) => "bad_request",
            ApiError::Storage(StorageError::Io(_)) => "io_error",
            ApiError::Internal(_) => "internal",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self.kind() {
            "model_unavailable" | "model_load_failed" => StatusCode::SERVICE_UNAVAILABLE,
            "dimension_mismatch" | "invalid_audio" | "invalid_dimension" => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            "not_found" => StatusCode::NOT_FOUND,
            "bad_request" => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        warn!("Request failed ({}): {}", status, self);
        let body = ErrorResponse {
            error: self.kind(),
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
