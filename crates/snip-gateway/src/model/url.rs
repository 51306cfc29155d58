use serde::{Deserialize, Serialize};
use snip_core::{CollisionStrategy, UrlRecord};
use snip_engine::ShortenOutcome;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

#[derive(Serialize)]
pub struct ServiceInfoResponse {
    pub service: &'static str,
    pub version: &'static str,
    pub endpoints: Vec<EndpointInfo>,
}

#[derive(Serialize)]
pub struct EndpointInfo {
    pub name: &'static str,
    pub route: &'static str,
}

#[derive(Deserialize)]
pub struct ShortenRequest {
    pub url: String,
    #[serde(default)]
    pub collision_strategy: Option<CollisionStrategy>,
}

#[derive(Serialize)]
pub struct ShortenResponse {
    pub success: bool,
    #[serde(flatten)]
    pub outcome: ShortenOutcome,
}

#[derive(Serialize)]
pub struct TopUrlsResponse {
    pub success: bool,
    pub top_urls: Vec<UrlRecord>,
}

fn default_max_results() -> usize {
    5
}

#[derive(Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub prefix: String,
    #[serde(default = "default_max_results")]
    pub max_results: usize,
}

#[derive(Serialize)]
pub struct SearchResult {
    pub url: String,
    pub frequency: u64,
}

#[derive(Serialize)]
pub struct SearchResponse {
    pub success: bool,
    pub prefix: String,
    pub results: Vec<SearchResult>,
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
}
