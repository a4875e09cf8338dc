//! Session state: which model is active

use inference_engine::{
    Autoencoder, CacheLookup, InferenceError, ModelCatalog, ModelFormat, ModelStatus,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

/// The model currently selected for scoring
#[derive(Clone)]
pub struct ActiveModel {
    pub name: String,
    pub model: Arc<dyn Autoencoder>,
}

/// Serializable view of the active model
#[derive(Debug, Clone, Serialize)]
pub struct ActiveModelInfo {
    pub name: String,
    pub input_dim: usize,
    pub format: ModelFormat,
}

impl ActiveModel {
    pub fn info(&self) -> ActiveModelInfo {
        ActiveModelInfo {
            name: self.name.clone(),
            input_dim: self.model.input_dim(),
            format: self.model.format(),
        }
    }
}

/// Per-process session: the model catalog and the current selection
pub struct Session {
    catalog: ModelCatalog,
    active: Option<ActiveModel>,
}

impl Session {
    /// Create a session with nothing selected
    pub fn new(catalog: ModelCatalog) -> Self {
        Self {
            catalog,
            active: None,
        }
    }

    /// Select a candidate model, loading it on the calling thread.
    ///
    /// On failure the previous selection is cleared, so later scoring reports
    /// the model as unavailable rather than silently using a stale one.
    pub fn select_model(&mut self, name: &str) -> Result<ActiveModelInfo, InferenceError> {
        match self.catalog.load(name) {
            Ok(model) => Ok(self.activate(name, model)),
            Err(e) => {
                self.reject(name, &e);
                Err(e)
            }
        }
    }

    /// First half of a selection that loads elsewhere: validate `name`
    /// and return either the cached model or the path to load.
    pub fn lookup_model(&self, name: &str) -> Result<CacheLookup, InferenceError> {
        self.catalog.lookup(name)
    }

    /// Make a loaded model current and cache it
    pub fn activate(&mut self, name: &str, model: Arc<dyn Autoencoder>) -> ActiveModelInfo {
        self.catalog.insert(name, Arc::clone(&model));
        let active = ActiveModel {
            name: name.to_string(),
            model,
        };
        let info = active.info();
        info!("Active model: {} (input_dim={})", info.name, info.input_dim);
        self.active = Some(active);
        info
    }

    /// Record a failed selection: nothing stays active and the cache entry goes
    pub fn reject(&mut self, name: &str, error: &InferenceError) {
        warn!("Model selection failed for '{}': {}", name, error);
        self.catalog.evict(name);
        self.active = None;
    }

    /// The active model, provided its file is still on disk
    pub fn scoring_model(&self) -> Result<ActiveModel, InferenceError> {
        let active = self
            .active
            .as_ref()
            .ok_or_else(|| InferenceError::ModelUnavailable("no model loaded".to_string()))?;
        self.catalog.lookup(&active.name)?;
        Ok(active.clone())
    }

    pub fn active(&self) -> Option<&ActiveModel> {
        self.active.as_ref()
    }

    pub fn model_statuses(&self) -> Vec<ModelStatus> {
        self.catalog.statuses()
    }
}
