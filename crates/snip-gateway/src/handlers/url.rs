use crate::error::{AppError, Result};
use crate::model::{
    SearchQuery, SearchResponse, SearchResult, ShortenRequest, ShortenResponse, TopUrlsResponse,
};
use crate::state::AppState;
use axum::extract::{Path, Query, State};
use axum::http::header::LOCATION;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use snip_engine::EngineStats;

pub async fn shorten_handler(
    State(state): State<AppState>,
    Json(request): Json<ShortenRequest>,
) -> Result<Json<ShortenResponse>> {
    let outcome = state
        .engine()
        .shorten(&request.url, request.collision_strategy)
        .await?;

    Ok(Json(ShortenResponse {
        success: true,
        outcome,
    }))
}

pub async fn redirect_handler(
    Path(short_code): Path<String>,
    State(state): State<AppState>,
) -> Result<Response> {
    let original_url = state.engine().resolve(&short_code).await?;
    Ok((StatusCode::MOVED_PERMANENTLY, [(LOCATION, original_url)]).into_response())
}

pub async fn stats_handler(State(state): State<AppState>) -> Json<EngineStats> {
    Json(state.engine().stats())
}

pub async fn top_handler(State(state): State<AppState>) -> Json<TopUrlsResponse> {
    Json(TopUrlsResponse {
        success: true,
        top_urls: state.engine().top_urls(),
    })
}

pub async fn search_handler(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<SearchResponse>> {
    if query.prefix.is_empty() {
        return Err(AppError::BadRequest(
            "prefix parameter is required".to_string(),
        ));
    }

    let results = state
        .engine()
        .search_prefix(&query.prefix, query.max_results)
        .into_iter()
        .map(|m| SearchResult {
            url: m.url,
            frequency: m.frequency,
        })
        .collect();

    Ok(Json(SearchResponse {
        success: true,
        prefix: query.prefix,
        results,
    }))
}
