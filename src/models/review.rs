//! Review models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A rated review, searchable alongside posts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: String,
    pub title: String,
    pub content: String,
    pub category_id: String,
    pub author_id: String,
    /// Star rating, 1 to 5
    pub rating: i64,
    pub active: bool,
    pub view_count: i64,
    pub upvote_count: i64,
    pub comment_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request body for creating a new review.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateReviewRequest {
    pub title: String,
    pub content: String,
    pub category_id: String,
    pub author_id: String,
    pub rating: i64,
}
