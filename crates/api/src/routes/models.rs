//! Model Routes

use axum::{extract::State, Json};
use inference_engine::{load_model, CacheLookup, ModelStatus};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::session::ActiveModelInfo;
use crate::SharedState;

/// Response for the model list endpoint
#[derive(Debug, Serialize)]
pub struct ModelsResponse {
    pub candidates: Vec<ModelStatus>,
    pub active: Option<ActiveModelInfo>,
    pub threshold: f64,
}

/// Body of the select endpoint
#[derive(Debug, Deserialize)]
pub struct SelectModelRequest {
    pub name: String,
}

/// List candidate models and the active selection
pub async fn list_models(State(state): State<SharedState>) -> Json<ModelsResponse> {
    let state = state.read().await;
    Json(ModelsResponse {
        candidates: state.session.model_statuses(),
        active: state.session.active().map(|a| a.info()),
        threshold: state.detector.scorer().threshold(),
    })
}

/// Select (and load, once) a candidate model.
///
/// Loading runs on the blocking pool with no lock held; the write lock is
/// only taken to install the result.
pub async fn select_model(
    State(state): State<SharedState>,
    Json(request): Json<SelectModelRequest>,
) -> Result<Json<ActiveModelInfo>, ApiError> {
    let name = request.name;
    let lookup = state.read().await.session.lookup_model(&name);

    let loaded = match lookup {
        Ok(CacheLookup::Hit(model)) => Ok(model),
        Ok(CacheLookup::Miss(path)) => tokio::task::spawn_blocking(move || load_model(&path))
            .await
            .map_err(|e| ApiError::Internal(e.to_string()))?,
        Err(e) => Err(e),
    };

    let mut state = state.write().await;
    match loaded {
        Ok(model) => Ok(Json(state.session.activate(&name, model))),
        Err(e) => {
            state.session.reject(&name, &e);
            Err(e.into())
        }
    }
}
