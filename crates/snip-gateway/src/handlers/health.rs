use crate::model::{EndpointInfo, HealthResponse, ServiceInfoResponse};
use axum::Json;

pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

pub async fn root_handler() -> Json<ServiceInfoResponse> {
    let endpoint = |name: &'static str, route: &'static str| EndpointInfo { name, route };

    Json(ServiceInfoResponse {
        service: "snip",
        version: env!("CARGO_PKG_VERSION"),
        endpoints: vec![
            endpoint("shorten", "POST /api/shorten"),
            endpoint("redirect", "GET /{short_code}"),
            endpoint("stats", "GET /api/stats"),
            endpoint("top_urls", "GET /api/top"),
            endpoint("search", "GET /api/search?prefix={prefix}"),
        ],
    })
}
