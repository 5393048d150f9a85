//! Post API endpoints.
//!
//! Creating a post reconciles its tags; updating it replaces them. Both run
//! in one transaction with the post row. Reading a post returns its tags and
//! the full comment thread.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;

use super::{page_params, parse_param, require_text, success, ApiResult};
use crate::comments::load_thread;
use crate::errors::AppError;
use crate::models::{
    CreatePostRequest, PostDetail, PostList, PostListFilter, PostSort, PostSummary,
    UpdatePostRequest,
};
use crate::search::page_count;
use crate::AppState;

/// Query parameters for listing an author's posts.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListPostsQuery {
    #[serde(default)]
    pub author_id: String,
    #[serde(default)]
    pub category_id: Option<String>,
    #[serde(default)]
    pub sort: Option<String>,
    #[serde(default)]
    pub page: Option<String>,
    #[serde(default)]
    pub size: Option<String>,
}

/// GET /api/posts - List an author's posts, optionally within one category.
pub async fn list_posts(
    State(state): State<AppState>,
    Query(params): Query<ListPostsQuery>,
) -> ApiResult<PostList> {
    require_text(&params.author_id, "Author (user ID)")?;
    if state.repo.get_user(params.author_id.trim()).await?.is_none() {
        return Err(AppError::NotFound(format!(
            "User {} not found",
            params.author_id.trim()
        )));
    }
    let sort: PostSort = parse_param(params.sort.as_deref(), "sort")?.unwrap_or_default();
    let (page, size) = page_params(
        params.page.as_deref(),
        params.size.as_deref(),
        state.config.default_page_size,
        state.config.max_page_size,
    )?;

    let filter = PostListFilter {
        author_id: params.author_id.trim().to_string(),
        category_id: params
            .category_id
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty()),
        sort,
        page,
        size,
    };
    let posts = state.repo.list_posts(&filter).await?;

    let mut items = Vec::with_capacity(posts.items.len());
    for post in posts.items {
        let tags = state.repo.list_post_tag_names(&post.id).await?;
        items.push(PostSummary { post, tags });
    }

    success(PostList {
        total_count: posts.total_count,
        total_pages: page_count(posts.total_count, size),
        page,
        size,
        items,
    })
}

/// POST /api/posts - Create a new post with its tags.
pub async fn create_post(
    State(state): State<AppState>,
    Json(request): Json<CreatePostRequest>,
) -> ApiResult<PostDetail> {
    require_text(&request.title, "Title")?;
    require_text(&request.content, "Content")?;
    require_text(&request.author_id, "Author (user ID)")?;

    let post = state
        .repo
        .create_post(&request, &state.tags)
        .await
        .inspect_err(|e| tracing::warn!(title = %request.title, "Post creation failed: {}", e))?;

    tracing::info!(post_id = %post.id, "Created post");
    success(load_post_detail(&state, &post.id).await?)
}

/// GET /api/posts/:id - Get a post with its tags and comment thread.
pub async fn get_post(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<PostDetail> {
    success(load_post_detail(&state, &id).await?)
}

/// PATCH /api/posts/:id - Update a post and replace its tags.
pub async fn update_post(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<UpdatePostRequest>,
) -> ApiResult<PostDetail> {
    if let Some(title) = &request.title {
        require_text(title, "Title")?;
    }

    state.repo.update_post(&id, &request, &state.tags).await?;

    tracing::info!(post_id = %id, "Updated post");
    success(load_post_detail(&state, &id).await?)
}

/// DELETE /api/posts/:id - Soft-delete a post.
pub async fn delete_post(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<()> {
    state.repo.deactivate_post(&id).await?;
    tracing::info!(post_id = %id, "Deleted post");
    success(())
}

async fn load_post_detail(state: &AppState, id: &str) -> Result<PostDetail, AppError> {
    let post = state.repo.get_active_post(id).await?;

    let category_name = state
        .repo
        .get_category(&post.category_id)
        .await?
        .map(|c| c.name)
        .unwrap_or_default();
    let author_name = state
        .repo
        .get_user(&post.author_id)
        .await?
        .map(|u| u.display_name)
        .unwrap_or_default();
    let tags = state.repo.list_post_tag_names(id).await?;
    let comments = load_thread(state.repo.as_ref(), id).await?;

    Ok(PostDetail {
        post,
        category_name,
        author_name,
        tags,
        comments,
    })
}
