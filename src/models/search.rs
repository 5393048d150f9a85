//! Search filter, source pages and the unified result item.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which fields a text query is matched against.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SearchType {
    #[default]
    TitleOrContent,
    Title,
    Content,
    Author,
}

impl FromStr for SearchType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "titleOrContent" => Ok(SearchType::TitleOrContent),
            "title" => Ok(SearchType::Title),
            "content" => Ok(SearchType::Content),
            "author" => Ok(SearchType::Author),
            other => Err(format!("unknown search type '{}'", other)),
        }
    }
}

/// A text query with the page each source should return.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchFilter {
    pub query: String,
    pub search_type: SearchType,
    pub page: usize,
    pub size: usize,
}

impl SearchFilter {
    /// SQL `LIKE` pattern for a substring match on the query.
    pub fn like_pattern(&self) -> String {
        let escaped = self
            .query
            .replace('\\', "\\\\")
            .replace('%', "\\%")
            .replace('_', "\\_");
        format!("%{}%", escaped)
    }

    pub fn sql_bounds(&self) -> (i64, i64) {
        sql_page_bounds(self.page, self.size)
    }
}

/// `LIMIT` and `OFFSET` for a zero-based page as SQL integers.
///
/// SQLite reads a negative limit as "no limit" and a negative offset as zero,
/// so values past `i64::MAX` are clamped rather than cast.
pub fn sql_page_bounds(page: usize, size: usize) -> (i64, i64) {
    let clamp = |n: usize| i64::try_from(n).unwrap_or(i64::MAX);
    (clamp(size), clamp(page.saturating_mul(size)))
}

/// One page of rows from a single source, with the source's unpaginated total.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total_count: usize,
}

impl<T> Page<T> {
    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            total_count: 0,
        }
    }
}

/// A post row as returned by the post source.
#[derive(Debug, Clone, PartialEq)]
pub struct PostHit {
    pub id: String,
    pub title: String,
    pub content: String,
    pub category_name: String,
    pub author_name: String,
    pub view_count: i64,
    pub upvote_count: i64,
    pub comment_count: i64,
    pub created_at: DateTime<Utc>,
}

/// A review row as returned by the review source.
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewHit {
    pub id: String,
    pub title: String,
    pub content: String,
    pub category_name: String,
    pub author_name: String,
    pub rating: i64,
    pub view_count: i64,
    pub upvote_count: i64,
    pub comment_count: i64,
    pub created_at: DateTime<Utc>,
}

/// Discriminator for the entity a search result came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceKind {
    Board,
    Review,
}

/// Normalized projection of a post or a review.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResultItem {
    pub id: String,
    pub title: String,
    pub excerpt: String,
    pub category_name: String,
    pub author_name: String,
    pub created_at: DateTime<Utc>,
    pub view_count: i64,
    pub upvote_count: i64,
    pub comment_count: i64,
    pub kind: SourceKind,
}

/// A merged, re-paginated search response.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchPage {
    pub total_count: usize,
    pub total_pages: usize,
    pub page: usize,
    pub size: usize,
    /// Set when a source timed out and its results are missing
    pub partial: bool,
    pub items: Vec<SearchResultItem>,
}
