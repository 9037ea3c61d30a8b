use axum::{extract::Request, middleware::Next, response::Response};
use std::time::Instant;
use tracing::{info, warn};

use super::request_id::REQUEST_ID_HEADER;

pub async fn metrics_middleware(req: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let request_id = req
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string();

    let response = next.run(req).await;

    let latency = start.elapsed();
    let status = response.status();

    if status.is_server_error() {
        warn!(
            target: "metrics",
            method = %method,
            path = %path,
            request_id = %request_id,
            status = %status.as_u16(),
            latency_ms = %latency.as_millis(),
            "request_failed"
        );
    } else {
        info!(
            target: "metrics",
            method = %method,
            path = %path,
            request_id = %request_id,
            status = %status.as_u16(),
            latency_ms = %latency.as_millis(),
            "request_completed"
        );
    }

    response
}
