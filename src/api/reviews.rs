//! Review API endpoints.

use axum::{
    extract::{Path, State},
    Json,
};

use super::{require_text, success, ApiResult};
use crate::errors::AppError;
use crate::models::{CreateReviewRequest, Review};
use crate::AppState;

/// POST /api/reviews - Create a new review.
pub async fn create_review(
    State(state): State<AppState>,
    Json(request): Json<CreateReviewRequest>,
) -> ApiResult<Review> {
    require_text(&request.title, "Title")?;
    require_text(&request.content, "Content")?;
    require_text(&request.author_id, "Author (user ID)")?;
    if !(1..=5).contains(&request.rating) {
        return Err(AppError::Validation(
            "Rating must be between 1 and 5".to_string(),
        ));
    }

    let review = state.repo.create_review(&request).await?;
    tracing::info!(review_id = %review.id, "Created review");
    success(review)
}

/// GET /api/reviews/:id - Get a single review.
pub async fn get_review(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Review> {
    match state.repo.get_review(&id).await? {
        Some(review) => success(review),
        None => Err(AppError::NotFound(format!("Review {} not found", id))),
    }
}
