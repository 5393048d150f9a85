//! Comment models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A comment on a post. A comment without a parent is a root comment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: String,
    pub post_id: String,
    pub author_id: String,
    pub author_name: String,
    pub body: String,
    pub parent_id: Option<String>,
    pub upvote_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A comment with its replies, as rendered in a thread.
#[derive(Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentNode {
    pub id: String,
    pub author_id: String,
    pub author_name: String,
    pub body: String,
    pub upvote_count: i64,
    pub created_at: DateTime<Utc>,
    pub children: Vec<CommentNode>,
}

impl CommentNode {
    pub fn leaf(comment: &Comment) -> Self {
        Self {
            id: comment.id.clone(),
            author_id: comment.author_id.clone(),
            author_name: comment.author_name.clone(),
            body: comment.body.clone(),
            upvote_count: comment.upvote_count,
            created_at: comment.created_at,
            children: Vec::new(),
        }
    }
}

// Reply chains can be arbitrarily deep; unlink them without recursing.
impl Drop for CommentNode {
    fn drop(&mut self) {
        let mut pending = std::mem::take(&mut self.children);
        while let Some(mut node) = pending.pop() {
            pending.append(&mut node.children);
        }
    }
}

/// Request body for posting a comment.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCommentRequest {
    pub author_id: String,
    pub body: String,
    #[serde(default)]
    pub parent_id: Option<String>,
}
