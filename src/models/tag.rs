//! Tag and post-tag link models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A tag. Identity is its normalized name, which is globally unique.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tag {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// Join row associating one post with one tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostTagLink {
    pub id: String,
    pub post_id: String,
    pub tag_id: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
