//! Post (board item) models.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{sql_page_bounds, CommentNode};

/// A user-authored board post.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: String,
    pub title: String,
    pub content: String,
    pub category_id: String,
    pub author_id: String,
    pub active: bool,
    pub view_count: i64,
    pub upvote_count: i64,
    pub comment_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A post with everything the detail page renders.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostDetail {
    #[serde(flatten)]
    pub post: Post,
    pub category_name: String,
    pub author_name: String,
    pub tags: Vec<String>,
    pub comments: Vec<CommentNode>,
}

/// Request body for creating a new post.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePostRequest {
    pub title: String,
    pub content: String,
    pub category_id: String,
    /// User ID of the author
    pub author_id: String,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
}

/// Request body for updating an existing post.
///
/// `tags` is a full replacement: leaving it out removes every tag from the post.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePostRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub category_id: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
}

/// A post in a listing, with its tag names.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostSummary {
    #[serde(flatten)]
    pub post: Post,
    pub tags: Vec<String>,
}

/// One page of an author's posts.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostList {
    pub total_count: usize,
    pub total_pages: usize,
    pub page: usize,
    pub size: usize,
    pub items: Vec<PostSummary>,
}

/// Ordering of an author's post listing. Ties fall back to newest first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PostSort {
    #[default]
    Latest,
    Upvotes,
    Views,
    Comments,
}

impl PostSort {
    /// `ORDER BY` clause over the `posts` table.
    pub fn order_by(self) -> &'static str {
        match self {
            PostSort::Latest => "created_at DESC, id DESC",
            PostSort::Upvotes => "upvote_count DESC, created_at DESC, id DESC",
            PostSort::Views => "view_count DESC, created_at DESC, id DESC",
            PostSort::Comments => "comment_count DESC, created_at DESC, id DESC",
        }
    }
}

impl FromStr for PostSort {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "latest" => Ok(PostSort::Latest),
            "upvotes" => Ok(PostSort::Upvotes),
            "views" => Ok(PostSort::Views),
            "comments" => Ok(PostSort::Comments),
            other => Err(format!("unknown sort '{}'", other)),
        }
    }
}

/// Which of an author's posts to list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostListFilter {
    pub author_id: String,
    pub category_id: Option<String>,
    pub sort: PostSort,
    pub page: usize,
    pub size: usize,
}

impl PostListFilter {
    pub fn sql_bounds(&self) -> (i64, i64) {
        sql_page_bounds(self.page, self.size)
    }
}
