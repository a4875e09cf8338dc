//! Service configuration

use feature_engine::SpectralConfig;
use inference_engine::DEFAULT_ANOMALY_THRESHOLD;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;
use tracing::Level;

/// Environment variable naming the configuration file
pub const CONFIG_PATH_ENV: &str = "PUMP_DETECTOR_CONFIG";

/// Configuration file used when `PUMP_DETECTOR_CONFIG` is unset
pub const DEFAULT_CONFIG_PATH: &str = "pump-detector.toml";

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration error: {0}")]
    Load(#[from] ::config::ConfigError),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Listen address
    pub bind_addr: String,

    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,

    /// Directory containing the candidate model files
    pub model_dir: PathBuf,

    /// Selectable model file names
    pub model_candidates: Vec<String>,

    /// Model loaded at start-up; first candidate when unset
    pub default_model: Option<String>,

    /// Directory holding the `normal` and `abnormal` folders
    pub dataset_root: PathBuf,

    /// Reconstruction error above which a recording is an anomaly
    pub anomaly_threshold: f64,

    /// Largest accepted upload body (bytes)
    pub max_upload_bytes: usize,

    /// Where uploads are spooled; system temp dir when unset
    pub upload_dir: Option<PathBuf>,

    /// STFT / mel parameters
    pub features: SpectralConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".to_string(),
            log_level: "info".to_string(),
            model_dir: PathBuf::from("."),
            model_candidates: vec![
                "Encoder_Model.onnx".to_string(),
                "Encoder_Model2.onnx".to_string(),
                "Encoder_Model3.onnx".to_string(),
            ],
            default_model: None,
            dataset_root: PathBuf::from("."),
            anomaly_threshold: DEFAULT_ANOMALY_THRESHOLD,
            max_upload_bytes: 32 * 1024 * 1024,
            upload_dir: None,
            features: SpectralConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load from the file named by `PUMP_DETECTOR_CONFIG` (or the default
    /// path) overlaid with `PUMP_DETECTOR_*` environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load_from(Path::new(&path))
    }

    /// Load from a specific file (optional) plus the environment
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let settings = ::config::Config::builder()
            .add_source(::config::File::from(path).required(false))
            .add_source(
                ::config::Environment::with_prefix("PUMP_DETECTOR")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("model_candidates"),
            )
            .build()?;

        let config: AppConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the service cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.anomaly_threshold.is_finite() || self.anomaly_threshold < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "anomaly_threshold must be a non-negative number, got {}",
                self.anomaly_threshold
            )));
        }
        if self.model_candidates.is_empty() {
            return Err(ConfigError::Invalid("model_candidates is empty".to_string()));
        }
        if let Some(name) = &self.default_model {
            if !self.model_candidates.contains(name) {
                return Err(ConfigError::Invalid(format!(
                    "default_model '{}' is not among model_candidates",
                    name
                )));
            }
        }
        if self.features.n_fft == 0 || self.features.hop_length == 0 || self.features.n_mels == 0 {
            return Err(ConfigError::Invalid(
                "features.n_fft, features.hop_length and features.n_mels must be positive".to_string(),
            ));
        }
        let features = &self.features;
        if !(features.top_db.is_finite() && features.top_db > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "features.top_db must be positive, got {}",
                features.top_db
            )));
        }
        if !(features.f_min.is_finite() && features.f_min >= 0.0) {
            return Err(ConfigError::Invalid(format!(
                "features.f_min must be non-negative, got {}",
                features.f_min
            )));
        }
        if let Some(f_max) = features.f_max {
            if !(f_max.is_finite() && f_max > features.f_min) {
                return Err(ConfigError::Invalid(format!(
                    "features.f_max ({}) must exceed features.f_min ({})",
                    f_max, features.f_min
                )));
            }
        }
        self.log_level()?;
        Ok(())
    }

    /// Parsed log level
    pub fn log_level(&self) -> Result<Level, ConfigError> {
        Level::from_str(&self.log_level)
            .map_err(|_| ConfigError::Invalid(format!("unknown log level '{}'", self.log_level)))
    }

    /// Model to load at start-up
    pub fn initial_model(&self) -> Option<&str> {
        self.default_model
            .as_deref()
            .or_else(|| self.model_candidates.first().map(String::as_str))
    }
}
