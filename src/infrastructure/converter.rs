use crate::config::GatewayConfig;
use crate::services::converter::MediaConverter;
use std::sync::Arc;
use tracing::info;

pub async fn setup_converter(config: &GatewayConfig) -> Arc<dyn MediaConverter> {
    let converter = crate::services::converter::create_converter(config);

    // Probe the tool once so a missing binary shows up at startup, not on the first request
    match converter.version().await {
        Some(version) => info!(
            "🎞️  {} {} ready (timeout {}s)",
            config.ffmpeg_path.display(),
            version,
            config.conversion_timeout.as_secs()
        ),
        None => tracing::warn!(
            "⚠️  {} is not runnable! Conversions will fail until it is installed.",
            config.ffmpeg_path.display()
        ),
    }

    converter
}
