//! User API endpoints.

use axum::{
    extract::{Path, State},
    Json,
};

use super::{require_text, success, ApiResult};
use crate::errors::AppError;
use crate::models::{CreateUserRequest, User};
use crate::AppState;

/// GET /api/users - List all users.
pub async fn list_users(State(state): State<AppState>) -> ApiResult<Vec<User>> {
    success(state.repo.list_users().await?)
}

/// GET /api/users/:id - Get a single user.
pub async fn get_user(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<User> {
    match state.repo.get_user(&id).await? {
        Some(user) => success(user),
        None => Err(AppError::NotFound(format!("User {} not found", id))),
    }
}

/// POST /api/users - Create a new user.
pub async fn create_user(
    State(state): State<AppState>,
    Json(request): Json<CreateUserRequest>,
) -> ApiResult<User> {
    require_text(&request.display_name, "Display name")?;

    let user = state.repo.create_user(&request).await?;
    tracing::info!(user_id = %user.id, "Created user");
    success(user)
}
