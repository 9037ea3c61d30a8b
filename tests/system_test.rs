use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use http_body_util::BodyExt;
use rust_convert_gateway::config::GatewayConfig;
use rust_convert_gateway::services::conversion::ConversionService;
use rust_convert_gateway::services::converter::FfmpegConverter;
use rust_convert_gateway::services::staging::StagingArea;
use rust_convert_gateway::{AppState, create_app};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

async fn setup(config: GatewayConfig) -> (tempfile::TempDir, Router) {
    let dir = tempfile::tempdir().unwrap();
    let staging = Arc::new(StagingArea::open(dir.path()).await.unwrap());
    let converter = Arc::new(FfmpegConverter::new(
        "/nonexistent/ffmpeg",
        Duration::from_secs(1),
    ));
    let conversions = Arc::new(ConversionService::new(staging, converter, &config));
    let state = AppState {
        config: Arc::new(config),
        conversions,
    };
    (dir, create_app(state))
}

async fn get_json(app: &Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&body).unwrap())
}

fn as_strings(value: &Value) -> Vec<String> {
    value
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn test_formats_are_sorted_and_stable() {
    let (_dir, app) = setup(GatewayConfig::video()).await;

    let (status, first) = get_json(&app, "/formats").await;
    assert_eq!(status, StatusCode::OK);

    let inputs = as_strings(&first["supported_input_formats"]);
    let outputs = as_strings(&first["supported_output_formats"]);
    let mut sorted = inputs.clone();
    sorted.sort();
    assert_eq!(inputs, sorted);
    assert!(inputs.contains(&"mkv".to_string()));
    assert!(outputs.contains(&"mp3".to_string()));
    assert!(!inputs.contains(&"xyz".to_string()));

    let (_, second) = get_json(&app, "/formats").await;
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_audio_profile_formats() {
    let (_dir, app) = setup(GatewayConfig::audio()).await;

    let (_, json) = get_json(&app, "/formats").await;
    let inputs = as_strings(&json["supported_input_formats"]);
    assert!(inputs.contains(&"wav".to_string()));
    assert!(!inputs.contains(&"mkv".to_string()));
}

#[tokio::test]
async fn test_health_reports_missing_converter() {
    let (_dir, app) = setup(GatewayConfig::audio()).await;

    let (status, json) = get_json(&app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert_eq!(json["converter"], "unavailable");
    assert_eq!(json["profile"], "audio");
}

#[tokio::test]
async fn test_openapi_document_lists_routes() {
    let (_dir, app) = setup(GatewayConfig::video()).await;

    let (status, json) = get_json(&app, "/api-docs/openapi.json").await;
    assert_eq!(status, StatusCode::OK);
    for path in ["/convert", "/formats", "/health"] {
        assert!(json["paths"].get(path).is_some(), "missing {}", path);
    }
}

#[tokio::test]
async fn test_request_id_is_propagated() {
    let (_dir, app) = setup(GatewayConfig::video()).await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .header("x-request-id", "trace-abc")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.headers()["x-request-id"], "trace-abc");
}
