use crate::config::GatewayConfig;
use crate::services::staging::StagingArea;
use std::sync::Arc;
use tracing::info;

pub async fn setup_staging(config: &GatewayConfig) -> anyhow::Result<Arc<StagingArea>> {
    let staging = StagingArea::open(&config.staging_dir).await.map_err(|e| {
        anyhow::anyhow!(
            "Failed to create staging directory {}: {}",
            config.staging_dir.display(),
            e
        )
    })?;

    info!("📂 Staging directory: {}", staging.root().display());
    Ok(Arc::new(staging))
}
