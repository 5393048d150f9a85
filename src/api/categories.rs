//! Category API endpoints.

use axum::extract::State;

use super::{success, ApiResult};
use crate::models::Category;
use crate::AppState;

/// GET /api/categories - List all categories.
pub async fn list_categories(State(state): State<AppState>) -> ApiResult<Vec<Category>> {
    success(state.repo.list_categories().await?)
}
