//! Candidate Model Files

use crate::model::{load_model, Autoencoder};
use crate::InferenceError;
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Presence of a candidate model on disk
#[derive(Debug, Clone, Serialize)]
pub struct ModelStatus {
    pub name: String,
    pub available: bool,
    pub loaded: bool,
}

/// Outcome of a catalog lookup
pub enum CacheLookup {
    /// Already loaded this session
    Hit(Arc<dyn Autoencoder>),
    /// Present on disk, not loaded yet
    Miss(PathBuf),
}

/// Fixed set of selectable model files with a load-once cache
pub struct ModelCatalog {
    /// Directory the candidate names resolve in
    model_dir: PathBuf,
    /// Selectable file names
    candidates: Vec<String>,
    /// Models already loaded this session, by file name
    cache: HashMap<String, Arc<dyn Autoencoder>>,
}

impl ModelCatalog {
    /// Create a catalog over `candidates` inside `model_dir`
    pub fn new(model_dir: impl Into<PathBuf>, candidates: Vec<String>) -> Self {
        let model_dir = model_dir.into();
        info!(
            "Model catalog at {} with {} candidates",
            model_dir.display(),
            candidates.len()
        );
        Self {
            model_dir,
            candidates,
            cache: HashMap::new(),
        }
    }

    pub fn model_dir(&self) -> &Path {
        &self.model_dir
    }

    pub fn candidates(&self) -> &[String] {
        &self.candidates
    }

    pub fn is_candidate(&self, name: &str) -> bool {
        self.candidates.iter().any(|c| c == name)
    }

    /// Path a candidate resolves to
    pub fn path_of(&self, name: &str) -> PathBuf {
        self.model_dir.join(name)
    }

    /// Availability of every candidate
    pub fn statuses(&self) -> Vec<ModelStatus> {
        self.candidates
            .iter()
            .map(|name| ModelStatus {
                name: name.clone(),
                available: self.path_of(name).is_file(),
                loaded: self.cache.contains_key(name),
            })
            .collect()
    }

    /// Check a candidate against the disk and the cache.
    ///
    /// The file must exist on every call, cached or not.
    pub fn lookup(&self, name: &str) -> Result<CacheLookup, InferenceError> {
        if !self.is_candidate(name) {
            return Err(InferenceError::ModelUnavailable(format!(
                "'{}' is not a selectable model",
                name
            )));
        }

        let path = self.path_of(name);
        if !path.is_file() {
            warn!("Model '{}' not found at {}", name, path.display());
            return Err(InferenceError::ModelUnavailable(format!(
                "Model '{}' not found",
                name
            )));
        }

        match self.cache.get(name) {
            Some(model) => {
                debug!("Model cache hit: {}", name);
                Ok(CacheLookup::Hit(Arc::clone(model)))
            }
            None => Ok(CacheLookup::Miss(path)),
        }
    }

    /// Remember a model loaded outside the catalog
    pub fn insert(&mut self, name: &str, model: Arc<dyn Autoencoder>) {
        self.cache.insert(name.to_string(), model);
    }

    /// Drop a cached model; returns whether one was cached
    pub fn evict(&mut self, name: &str) -> bool {
        let evicted = self.cache.remove(name).is_some();
        if evicted {
            debug!("Evicted cached model {}", name);
        }
        evicted
    }

    /// Load a candidate, reusing the cached instance while its file exists
    pub fn load(&mut self, name: &str) -> Result<Arc<dyn Autoencoder>, InferenceError> {
        match self.lookup(name) {
            Ok(CacheLookup::Hit(model)) => Ok(model),
            Ok(CacheLookup::Miss(path)) => {
                let model = load_model(&path)?;
                self.insert(name, Arc::clone(&model));
                Ok(model)
            }
            Err(e) => {
                self.evict(name);
                Err(e)
            }
        }
    }
}
