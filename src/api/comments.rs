//! Comment API endpoints.

use axum::{
    extract::{Path, State},
    Json,
};

use super::{require_text, success, ApiResult};
use crate::models::{Comment, CreateCommentRequest};
use crate::AppState;

/// POST /api/posts/:id/comments - Comment on a post or reply to a comment.
pub async fn create_comment(
    State(state): State<AppState>,
    Path(post_id): Path<String>,
    Json(request): Json<CreateCommentRequest>,
) -> ApiResult<Comment> {
    require_text(&request.body, "Comment body")?;
    require_text(&request.author_id, "Author (user ID)")?;

    let comment = state.repo.create_comment(&post_id, &request).await?;
    tracing::info!(
        post_id = %post_id,
        comment_id = %comment.id,
        reply = comment.parent_id.is_some(),
        "Created comment"
    );
    success(comment)
}

/// POST /api/comments/:id/upvote - Upvote a comment.
pub async fn upvote_comment(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Comment> {
    success(state.repo.upvote_comment(&id).await?)
}
