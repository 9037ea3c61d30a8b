use crate::AppState;
use axum::{Json, extract::State, response::IntoResponse};
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub converter: String,
    pub converter_version: Option<String>,
    pub profile: String,
    pub version: String,
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "System health status", body = HealthResponse)
    ),
    tag = "system"
)]
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let converter_version = state.conversions.converter().version().await;
    let converter_status = if converter_version.is_some() {
        "available"
    } else {
        "unavailable"
    };

    Json(HealthResponse {
        status: "ok".to_string(),
        converter: converter_status.to_string(),
        converter_version,
        profile: state.config.profile.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
