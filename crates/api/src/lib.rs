//! Pump Sound Anomaly Detection API
//!
//! HTTP handlers over an explicit session: model selection, dataset
//! browsing, scoring of bundled and uploaded recordings.

use axum::{
    extract::{DefaultBodyLimit, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use feature_engine::FeatureExtractor;
use inference_engine::{AnomalyDetector, AnomalyScorer, ModelCatalog};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use storage::DatasetRepository;
use tokio::sync::RwLock;
use tower_http::trace::TraceLayer;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

pub mod config;
pub mod error;
mod routes;
pub mod session;

pub use crate::config::AppConfig;
pub use error::ApiError;
pub use session::Session;

/// State shared across handlers
pub type SharedState = Arc<RwLock<AppState>>;

/// Application state
pub struct AppState {
    /// Model catalog and current selection
    pub session: Session,
    /// Bundled recordings
    pub dataset: DatasetRepository,
    /// Feature extractor + scorer
    pub detector: Arc<AnomalyDetector>,
    /// Spool directory for uploads
    pub upload_dir: Option<PathBuf>,
    /// Prometheus renderer, when a recorder is installed
    pub metrics: Option<PrometheusHandle>,
    /// Version string
    pub version: String,
    /// Start time
    pub start_time: Instant,
}

impl AppState {
    /// Build state from configuration and load the start-up model.
    ///
    /// A missing start-up model is logged, not fatal.
    pub fn new(config: &AppConfig, metrics: Option<PrometheusHandle>) -> Self {
        let catalog = ModelCatalog::new(config.model_dir.clone(), config.model_candidates.clone());
        let mut session = Session::new(catalog);
        if let Some(name) = config.initial_model() {
            if let Err(e) = session.select_model(name) {
                warn!("Starting without an active model: {}", e);
            }
        }

        let detector = AnomalyDetector::new(
            FeatureExtractor::new(config.features.clone()),
            AnomalyScorer::new(config.anomaly_threshold),
        );

        Self {
            session,
            dataset: DatasetRepository::new(config.dataset_root.clone()),
            detector: Arc::new(detector),
            upload_dir: config.upload_dir.clone(),
            metrics,
            version: env!("CARGO_PKG_VERSION").to_string(),
            start_time: Instant::now(),
        }
    }
}

/// Health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub active_model: Option<String>,
    pub threshold: f64,
}

/// Create the application router
pub fn create_router(state: SharedState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/api/v1/health", get(health_handler))
        .route("/api/v1/models", get(routes::models::list_models))
        .route("/api/v1/models/select", post(routes::models::select_model))
        .route("/api/v1/dataset/:kind", get(routes::dataset::list_files))
        .route("/api/v1/dataset/:kind/:file/audio", get(routes::dataset::audio))
        .route(
            "/api/v1/dataset/:kind/:file/spectrogram",
            get(routes::dataset::spectrogram),
        )
        .route("/api/v1/dataset/:kind/:file/analyze", post(routes::dataset::analyze))
        .route("/api/v1/upload/analyze", post(routes::upload::analyze_upload))
        .route("/api/v1/upload/spectrogram", post(routes::upload::upload_spectrogram))
        .route("/metrics", get(metrics_handler))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check handler
async fn health_handler(State(state): State<SharedState>) -> impl IntoResponse {
    let state = state.read().await;
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: state.version.clone(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        active_model: state.session.active().map(|a| a.name.clone()),
        threshold: state.detector.scorer().threshold(),
    })
}

/// Prometheus exposition
async fn metrics_handler(State(state): State<SharedState>) -> Response {
    let state = state.read().await;
    match &state.metrics {
        Some(handle) => handle.render().into_response(),
        None => (StatusCode::NOT_FOUND, "metrics recorder not installed").into_response(),
    }
}

/// Initialize logging
pub fn init_logging(level: Level) -> Result<(), tracing::subscriber::SetGlobalDefaultError> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
}

/// Run the server
pub async fn run_server(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let metrics = PrometheusBuilder::new().install_recorder()?;
    let state = Arc::new(RwLock::new(AppState::new(&config, Some(metrics))));
    let app = create_router(state, config.max_upload_bytes);

    info!("Starting API server on {}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use hound::{SampleFormat, WavSpec, WavWriter};
    use inference_engine::{Activation, DenseLayerSpec, DenseModelSpec};
    use std::path::Path;
    use tower::ServiceExt;

    const DIM: usize = 18;

    fn write_tone(path: &Path, freq: f32) {
        let spec = WavSpec {
            channels: 1,
            sample_rate: 16_000,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let mut writer = WavWriter::create(path, spec).unwrap();
        for i in 0..16_000 {
            let v = 0.3 * (2.0 * std::f32::consts::PI * freq * i as f32 / 16_000.0).sin();
            writer.write_sample((v * i16::MAX as f32) as i16).unwrap();
        }
        writer.finalize().unwrap();
    }

    fn write_scaled_identity(path: &Path, scale: f32) {
        let kernel = (0..DIM)
            .map(|i| (0..DIM).map(|j| if i == j { scale } else { 0.0 }).collect())
            .collect();
        let spec = DenseModelSpec {
            layers: vec![DenseLayerSpec {
                kernel,
                bias: vec![0.0; DIM],
                activation: Activation::Linear,
            }],
        };
        std::fs::write(path, serde_json::to_string(&spec).unwrap()).unwrap();
    }

    /// Identity model (normal), collapsing model (anomaly), one missing
    /// candidate, a `normal` folder with two tones and no `abnormal` folder.
    fn fixture() -> (tempfile::TempDir, AppConfig) {
        let dir = tempfile::tempdir().unwrap();
        let models = dir.path().join("models");
        let normal = dir.path().join("normal");
        let uploads = dir.path().join("uploads");
        for d in [&models, &normal, &uploads] {
            std::fs::create_dir(d).unwrap();
        }

        write_scaled_identity(&models.join("Encoder_Model.json"), 1.0);
        write_scaled_identity(&models.join("Encoder_Model2.json"), 0.0);
        write_tone(&normal.join("pump_00.wav"), 120.0);
        write_tone(&normal.join("pump_01.wav"), 240.0);

        let config = AppConfig {
            model_dir: models,
            model_candidates: vec![
                "Encoder_Model.json".to_string(),
                "Encoder_Model2.json".to_string(),
                "Encoder_Model3.json".to_string(),
            ],
            dataset_root: dir.path().to_path_buf(),
            upload_dir: Some(uploads),
            ..Default::default()
        };
        (dir, config)
    }

    fn app(config: &AppConfig) -> Router {
        let state = Arc::new(RwLock::new(AppState::new(config, None)));
        create_router(state, config.max_upload_bytes)
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, body.to_vec())
    }

    async fn send_json(app: &Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
        let (status, body) = send(app, request).await;
        (status, serde_json::from_slice(&body).unwrap())
    }

    fn get_req(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post_req(uri: &str, body: Body) -> Request<Body> {
        Request::builder().method("POST").uri(uri).body(body).unwrap()
    }

    fn select_req(name: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/v1/models/select")
            .header("content-type", "application/json")
            .body(Body::from(format!(r#"{{"name":"{}"}}"#, name)))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health_reports_startup_model() {
        let (_dir, config) = fixture();
        let app = app(&config);

        let (status, body) = send_json(&app, get_req("/api/v1/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["active_model"], "Encoder_Model.json");
        assert_eq!(body["threshold"], 0.02);
    }

    #[tokio::test]
    async fn test_model_listing() {
        let (_dir, config) = fixture();
        let app = app(&config);

        let (status, body) = send_json(&app, get_req("/api/v1/models")).await;
        assert_eq!(status, StatusCode::OK);

        let candidates = body["candidates"].as_array().unwrap();
        assert_eq!(candidates.len(), 3);
        assert_eq!(candidates[0]["available"], true);
        assert_eq!(candidates[2]["available"], false);
        assert_eq!(body["active"]["name"], "Encoder_Model.json");
        assert_eq!(body["active"]["input_dim"], DIM);
        assert_eq!(body["active"]["format"], "dense");
    }

    #[tokio::test]
    async fn test_dataset_analysis_with_identity_model_is_normal() {
        let (_dir, config) = fixture();
        let app = app(&config);

        let (status, body) = send_json(
            &app,
            post_req("/api/v1/dataset/normal/pump_00.wav/analyze", Body::empty()),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["source"], "normal/pump_00.wav");
        assert_eq!(body["reconstruction_error"], 0.0);
        assert_eq!(body["reconstruction_error_display"], "0.000000");
        assert_eq!(body["verdict"], "normal");
        assert_eq!(body["features"].as_array().unwrap().len(), DIM);
    }

    #[tokio::test]
    async fn test_switching_to_collapsing_model_flags_anomaly() {
        let (_dir, config) = fixture();
        let app = app(&config);

        let (status, body) = send_json(&app, select_req("Encoder_Model2.json")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["name"], "Encoder_Model2.json");

        let (status, body) = send_json(
            &app,
            post_req("/api/v1/dataset/normal/pump_01.wav/analyze", Body::empty()),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["verdict"], "anomaly");
        assert!(body["reconstruction_error"].as_f64().unwrap() > 0.02);
    }

    #[tokio::test]
    async fn test_missing_model_is_unavailable_and_recoverable() {
        let (_dir, config) = fixture();
        let app = app(&config);

        let (status, body) = send_json(&app, select_req("Encoder_Model3.json")).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["error"], "model_unavailable");

        let (status, body) = send_json(
            &app,
            post_req("/api/v1/dataset/normal/pump_00.wav/analyze", Body::empty()),
        )
        .await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["error"], "model_unavailable");

        let (status, _) = send_json(&app, select_req("Encoder_Model.json")).await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = send_json(
            &app,
            post_req("/api/v1/dataset/normal/pump_00.wav/analyze", Body::empty()),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_dataset_listing_and_missing_folder() {
        let (_dir, config) = fixture();
        let app = app(&config);

        let (status, body) = send_json(&app, get_req("/api/v1/dataset/normal")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], 2);
        assert_eq!(body["files"][0], "pump_00.wav");

        let (status, body) = send_json(&app, get_req("/api/v1/dataset/abnormal")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "Folder 'abnormal' not found");

        let (status, _) = send_json(&app, get_req("/api/v1/dataset/broken")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_audio_and_spectrogram() {
        let (dir, config) = fixture();
        let app = app(&config);

        let (status, body) = send(&app, get_req("/api/v1/dataset/normal/pump_00.wav/audio")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, std::fs::read(dir.path().join("normal/pump_00.wav")).unwrap());

        let response = app
            .clone()
            .oneshot(get_req("/api/v1/dataset/normal/pump_00.wav/spectrogram"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["content-type"], "image/png");
    }

    #[tokio::test]
    async fn test_upload_is_scored_and_cleaned_up() {
        let (dir, config) = fixture();
        let app = app(&config);
        let wav = std::fs::read(dir.path().join("normal/pump_01.wav")).unwrap();

        let (status, body) =
            send_json(&app, post_req("/api/v1/upload/analyze", Body::from(wav))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["source"], "upload");
        assert_eq!(body["verdict"], "normal");

        let leftovers = std::fs::read_dir(dir.path().join("uploads")).unwrap().count();
        assert_eq!(leftovers, 0);
    }

    #[tokio::test]
    async fn test_corrupt_upload_is_rejected_and_cleaned_up() {
        let (dir, config) = fixture();
        let app = app(&config);

        let (status, body) = send_json(
            &app,
            post_req("/api/v1/upload/analyze", Body::from("not audio at all")),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"], "invalid_audio");

        let leftovers = std::fs::read_dir(dir.path().join("uploads")).unwrap().count();
        assert_eq!(leftovers, 0);

        // Next interaction still succeeds
        let (status, _) = send_json(&app, get_req("/api/v1/health")).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_upload_spectrogram_is_png_and_cleaned_up() {
        let (dir, config) = fixture();
        let app = app(&config);
        let wav = std::fs::read(dir.path().join("normal/pump_00.wav")).unwrap();

        let response = app
            .clone()
            .oneshot(post_req("/api/v1/upload/spectrogram", Body::from(wav)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["content-type"], "image/png");
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert!(body.starts_with(b"\x89PNG"));

        let (status, body) = send_json(
            &app,
            post_req("/api/v1/upload/spectrogram", Body::from("RIFF garbage")),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"], "invalid_audio");

        let leftovers = std::fs::read_dir(dir.path().join("uploads")).unwrap().count();
        assert_eq!(leftovers, 0);
    }

    #[tokio::test]
    async fn test_deleted_model_file_is_unavailable() {
        let (dir, config) = fixture();
        let app = app(&config);

        std::fs::remove_file(dir.path().join("models/Encoder_Model.json")).unwrap();

        let (status, body) = send_json(
            &app,
            post_req("/api/v1/dataset/normal/pump_00.wav/analyze", Body::empty()),
        )
        .await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["error"], "model_unavailable");

        let (status, _) = send_json(&app, select_req("Encoder_Model.json")).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

        let (_, body) = send_json(&app, get_req("/api/v1/models")).await;
        assert_eq!(body["candidates"][0]["loaded"], false);
        assert!(body["active"].is_null());
    }

    #[tokio::test]
    async fn test_non_wav_name_rejected() {
        let (_dir, config) = fixture();
        let app = app(&config);

        let (status, body) = send_json(
            &app,
            post_req("/api/v1/dataset/normal/notes.txt/analyze", Body::empty()),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "bad_request");
    }

    #[tokio::test]
    async fn test_metrics_without_recorder() {
        let (_dir, config) = fixture();
        let app = app(&config);
        let (status, _) = send(&app, get_req("/metrics")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
