//! Pump Sound Anomaly Detector - Main Entry Point

use api::{init_logging, run_server, AppConfig};
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    init_logging(config.log_level()?)?;

    info!("=== Pump Anomaly Detector v{} ===", env!("CARGO_PKG_VERSION"));
    info!(
        "Models: {} in {}, threshold {}",
        config.model_candidates.join(", "),
        config.model_dir.display(),
        config.anomaly_threshold
    );

    run_server(config).await?;

    Ok(())
}
