pub mod api;
pub mod config;
pub mod infrastructure;
pub mod models;
pub mod services;
pub mod utils;

use crate::config::GatewayConfig;
use crate::services::conversion::ConversionService;
use axum::{
    Router,
    middleware::from_fn,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Multipart framing on top of the file itself.
const MULTIPART_OVERHEAD: usize = 10 * 1024 * 1024;

#[derive(OpenApi)]
#[openapi(
    paths(
        api::handlers::convert::convert_file,
        api::handlers::formats::list_formats,
        api::handlers::health::health_check,
    ),
    components(
        schemas(
            api::handlers::convert::ConvertForm,
            api::handlers::formats::FormatsResponse,
            api::handlers::health::HealthResponse,
            api::error::ErrorResponse,
        )
    ),
    tags(
        (name = "convert", description = "Media conversion endpoints"),
        (name = "system", description = "Service status")
    )
)]
pub struct ApiDoc;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<GatewayConfig>,
    pub conversions: Arc<ConversionService>,
}

pub fn create_app(state: AppState) -> Router {
    let body_limit = state.config.max_file_size.saturating_add(MULTIPART_OVERHEAD);

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/health", get(api::handlers::health::health_check))
        .route("/formats", get(api::handlers::formats::list_formats))
        .route(
            "/convert",
            post(api::handlers::convert::convert_file)
                .layer(axum::extract::DefaultBodyLimit::max(body_limit)),
        )
        .layer(from_fn(api::middleware::metrics::metrics_middleware))
        .layer(from_fn(api::middleware::request_id::request_id_middleware))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
                .expose_headers(Any),
        )
        .with_state(state)
}
