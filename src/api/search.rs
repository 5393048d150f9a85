//! Search API endpoints.

use axum::extract::{Query, State};
use serde::Deserialize;

use super::{page_params, parse_param, success, ApiResult};
use crate::errors::AppError;
use crate::models::{SearchPage, SearchType};
use crate::AppState;

/// Search query parameters, kept as raw strings so malformed values are
/// reported in the error envelope.
#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    /// Search query string.
    #[serde(default)]
    pub q: String,
    /// Fields to match (default: title or content).
    #[serde(default, rename = "type")]
    pub search_type: Option<String>,
    /// Zero-based page (default: 0).
    #[serde(default)]
    pub page: Option<String>,
    /// Page size (default: configured default page size).
    #[serde(default)]
    pub size: Option<String>,
}

/// GET /api/search - Search posts and reviews together.
pub async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchQuery>,
) -> ApiResult<SearchPage> {
    let query = params.q.trim();
    if query.is_empty() {
        return Err(AppError::Validation("Search query is required".to_string()));
    }

    let search_type: SearchType =
        parse_param(params.search_type.as_deref(), "search type")?.unwrap_or_default();
    let (page, size) = page_params(
        params.page.as_deref(),
        params.size.as_deref(),
        state.config.default_page_size,
        state.config.max_page_size,
    )?;

    let page = state.search.search(query, search_type, page, size).await?;
    success(page)
}
