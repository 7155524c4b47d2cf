use axum::Json;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;

use crate::domain::locator::ContentLocator;

use super::error::ApiError;
use super::models::*;
use super::state::ApiState;

pub async fn render_markdown(
    State(state): State<ApiState>,
    Query(query): Query<MarkdownQuery>,
) -> Result<Json<DocumentResponse>, ApiError> {
    let url = required(query.url, "URL parameter is missing")?;
    let outcome = state.cache.render_or_fetch_url(&url).await?;
    Ok(Json(outcome.into()))
}

pub async fn render_readme(
    State(state): State<ApiState>,
    Query(query): Query<ReadmeQuery>,
) -> Result<Json<DocumentResponse>, ApiError> {
    let owner = required(query.owner, "owner parameter is missing")?;
    let repo = required(query.repo, "repo parameter is missing")?;
    let locator = ContentLocator::readme(&owner, &repo)
        .map_err(|err| ApiError::bad_request("Invalid repository", Some(err.to_string())))?;
    let outcome = state.cache.render_or_fetch(&locator).await?;
    Ok(Json(outcome.into()))
}

pub async fn invalidate_cache(
    State(state): State<ApiState>,
    Query(query): Query<InvalidateQuery>,
) -> Result<Json<InvalidateResponse>, ApiError> {
    let key = required(query.key, "key parameter is missing")?;
    let invalidated = state.cache.invalidate(&key).await?;
    Ok(Json(InvalidateResponse { invalidated }))
}

pub async fn cache_stats(State(state): State<ApiState>) -> Result<impl IntoResponse, ApiError> {
    let stats = state.cache.stats().await?;
    Ok(Json(stats))
}

pub async fn not_found() -> ApiError {
    ApiError::not_found("Route not found")
}

pub async fn health() -> StatusCode {
    StatusCode::NO_CONTENT
}

fn required(value: Option<String>, message: &'static str) -> Result<String, ApiError> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .ok_or_else(|| ApiError::bad_request(message, None))
}
