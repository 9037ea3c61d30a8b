use clap::Parser;
use dotenvy::dotenv;
use rust_convert_gateway::config::{GatewayConfig, Profile};
use rust_convert_gateway::infrastructure::{converter, staging};
use rust_convert_gateway::services::conversion::ConversionService;
use rust_convert_gateway::services::worker::BackgroundWorker;
use rust_convert_gateway::{AppState, create_app};
use std::sync::Arc;
use tokio::signal;
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Format profile to serve (overrides CONVERTER_PROFILE)
    #[arg(long, value_enum)]
    profile: Option<Profile>,

    /// Bind host (overrides HOST)
    #[arg(long)]
    host: Option<String>,

    /// Bind port (overrides PORT)
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Environment & Logging
    dotenv().ok();
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rust_convert_gateway=info,tower_http=info,metrics=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 2. Configuration
    let mut config = match args.profile {
        Some(profile) => GatewayConfig::from_env_with_profile(profile),
        None => GatewayConfig::from_env(),
    };
    if let Some(host) = args.host {
        config.host = host;
    }
    if let Some(port) = args.port {
        config.port = port;
    }

    info!("🚀 Starting Convert Gateway [Profile: {}]...", config.profile);
    info!(
        "⚙️  Formats: {} in / {} out, Timeout={}s, Max Parallel={}, Max Size={}MB",
        config.formats.inputs().len(),
        config.formats.outputs().len(),
        config.conversion_timeout.as_secs(),
        config.max_concurrent_conversions,
        config.max_file_size / 1024 / 1024
    );

    // 3. Infrastructure
    let staging_area = staging::setup_staging(&config).await?;
    let converter_service = converter::setup_converter(&config).await;

    // 4. Graceful Shutdown Channel
    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);

    // 5. Staging Sweeper
    let worker = BackgroundWorker::new(
        staging_area.clone(),
        config.staging_cleanup_age_hours,
        shutdown_rx,
    );
    let worker_handle = tokio::spawn(worker.run());
    info!("👷 Staging sweeper initialized.");

    // 6. API Service
    let conversions = Arc::new(ConversionService::new(
        staging_area,
        converter_service,
        &config,
    ));

    let addr = format!("{}:{}", config.host, config.port);
    let state = AppState {
        config: Arc::new(config),
        conversions,
    };

    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(|request: &axum::http::Request<_>| {
            let request_id = request
                .headers()
                .get("x-request-id")
                .and_then(|v| v.to_str().ok())
                .unwrap_or("unknown");
            tracing::info_span!(
                "http_request",
                method = %request.method(),
                uri = %request.uri(),
                request_id = %request_id,
            )
        })
        .on_request(|request: &axum::http::Request<_>, _span: &tracing::Span| {
            info!("📥 {} {}", request.method(), request.uri());
        })
        .on_response(
            |response: &axum::http::Response<_>,
             latency: std::time::Duration,
             _span: &tracing::Span| {
                info!(
                    "📤 Finished in {:?} with status {}",
                    latency,
                    response.status()
                );
            },
        );

    let app = create_app(state).layer(trace_layer);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!("✅ API Server listening on: http://{}", addr);
    info!("📖 Swagger UI documentation: http://{}/swagger-ui", addr);

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!("❌ Server runtime error: {}", e);
    }

    info!("🛑 Shutting down gateway services...");
    let _ = shutdown_tx.send(true);
    let _ = worker_handle.await;

    info!("👋 Gateway exited cleanly.");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("⌨️  Ctrl+C received, initiating graceful shutdown...");
        },
        _ = terminate => {
            info!("💤 SIGTERM received, initiating graceful shutdown...");
        },
    }
}
