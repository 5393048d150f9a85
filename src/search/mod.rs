//! Cross-entity search.
//!
//! Queries the post and review sources concurrently, projects both into
//! [`SearchResultItem`]s, merges them newest-first and re-slices the merged
//! list to the requested page.
//!
//! With [`MergeMode::PerSourcePage`] each source is paginated on its own
//! before the merge. The merged window can then miss items that would rank
//! on the requested page in a global ordering, and the reported total only
//! counts the rows fetched for this page. [`MergeMode::Window`] fetches the
//! leading `(page + 1) * size` rows of each source instead, which makes the
//! window exact at the cost of larger source queries.

use std::future::Future;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::{error::Elapsed, timeout};

use crate::errors::AppError;
use crate::models::{
    Page, PostHit, ReviewHit, SearchFilter, SearchPage, SearchResultItem, SearchType, SourceKind,
};

/// Maximum number of characters of the body shown in a result.
pub const EXCERPT_CHARS: usize = 100;

/// Storage capabilities for the two searchable entities.
pub trait SearchSource: Send + Sync {
    /// Active posts matching the filter, newest first, paginated by the filter.
    fn query_posts_by_text(
        &self,
        filter: &SearchFilter,
    ) -> impl Future<Output = Result<Page<PostHit>, AppError>> + Send;

    /// Active reviews matching the filter, newest first, paginated by the filter.
    fn query_reviews_by_text(
        &self,
        filter: &SearchFilter,
    ) -> impl Future<Output = Result<Page<ReviewHit>, AppError>> + Send;
}

/// How sources are paginated ahead of the merge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MergeMode {
    /// Each source returns the caller's page; totals count fetched rows only.
    #[default]
    PerSourcePage,
    /// Each source returns everything up to the end of the caller's page.
    Window,
}

impl FromStr for MergeMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "page" | "per-source-page" => Ok(MergeMode::PerSourcePage),
            "window" => Ok(MergeMode::Window),
            other => Err(format!("unknown search merge mode '{}'", other)),
        }
    }
}

/// Merges independently paginated post and review results.
pub struct SearchAggregator<S> {
    source: Arc<S>,
    source_timeout: Duration,
    mode: MergeMode,
}

impl<S: SearchSource> SearchAggregator<S> {
    pub fn new(source: Arc<S>, source_timeout: Duration, mode: MergeMode) -> Self {
        Self {
            source,
            source_timeout,
            mode,
        }
    }

    /// Search posts and reviews and return one page of the merged feed.
    ///
    /// A source that times out contributes nothing and marks the page
    /// `partial`; a source that fails fails the whole search.
    pub async fn search(
        &self,
        query: &str,
        search_type: SearchType,
        page: usize,
        size: usize,
    ) -> Result<SearchPage, AppError> {
        let filter = match self.mode {
            MergeMode::PerSourcePage => SearchFilter {
                query: query.to_string(),
                search_type,
                page,
                size,
            },
            MergeMode::Window => SearchFilter {
                query: query.to_string(),
                search_type,
                page: 0,
                size: page.saturating_add(1).saturating_mul(size),
            },
        };

        let (posts, reviews) = tokio::join!(
            timeout(self.source_timeout, self.source.query_posts_by_text(&filter)),
            timeout(self.source_timeout, self.source.query_reviews_by_text(&filter)),
        );
        let posts = settle("post", posts)?;
        let reviews = settle("review", reviews)?;

        if posts.is_none() && reviews.is_none() {
            return Err(AppError::SourceQuery(
                "Both search sources timed out".to_string(),
            ));
        }
        let partial = posts.is_none() || reviews.is_none();
        let posts = posts.unwrap_or_else(Page::empty);
        let reviews = reviews.unwrap_or_else(Page::empty);

        let total_count = match self.mode {
            MergeMode::PerSourcePage => posts.items.len() + reviews.items.len(),
            MergeMode::Window => posts.total_count + reviews.total_count,
        };

        let combined: Vec<SearchResultItem> = posts
            .items
            .into_iter()
            .map(project_post)
            .chain(reviews.items.into_iter().map(project_review))
            .collect();
        let merged_len = combined.len();
        let items = reslice(merge_by_recency(combined), page, size);

        tracing::debug!(
            query,
            page,
            size,
            merged = merged_len,
            returned = items.len(),
            partial,
            "Merged search results"
        );

        Ok(SearchPage {
            total_count,
            total_pages: page_count(total_count, size),
            page,
            size,
            partial,
            items,
        })
    }
}

fn settle<T>(
    source: &str,
    outcome: Result<Result<Page<T>, AppError>, Elapsed>,
) -> Result<Option<Page<T>>, AppError> {
    match outcome {
        Ok(Ok(page)) => Ok(Some(page)),
        Ok(Err(e)) => {
            tracing::error!("{} search source failed: {}", source, e);
            Err(AppError::SourceQuery(format!(
                "{} search failed: {}",
                source,
                e.message()
            )))
        }
        Err(_) => {
            tracing::warn!("{} search source timed out, returning partial results", source);
            Ok(None)
        }
    }
}

/// Sort newest first. Equal timestamps keep their input order.
pub fn merge_by_recency(mut items: Vec<SearchResultItem>) -> Vec<SearchResultItem> {
    items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    items
}

/// Take `[page * size, page * size + size)`, clamped to the list.
pub fn reslice<T>(mut items: Vec<T>, page: usize, size: usize) -> Vec<T> {
    let len = items.len();
    let start = page.saturating_mul(size).min(len);
    let end = start.saturating_add(size).min(len);
    items.drain(start..end).collect()
}

pub fn page_count(total: usize, size: usize) -> usize {
    if size == 0 {
        0
    } else {
        total.div_ceil(size)
    }
}

/// The first [`EXCERPT_CHARS`] characters of a body.
pub fn excerpt(body: &str) -> String {
    match body.char_indices().nth(EXCERPT_CHARS) {
        Some((cut, _)) => format!("{}...", &body[..cut]),
        None => body.to_string(),
    }
}

fn project_post(hit: PostHit) -> SearchResultItem {
    SearchResultItem {
        excerpt: excerpt(&hit.content),
        id: hit.id,
        title: hit.title,
        category_name: hit.category_name,
        author_name: hit.author_name,
        created_at: hit.created_at,
        view_count: hit.view_count,
        upvote_count: hit.upvote_count,
        comment_count: hit.comment_count,
        kind: SourceKind::Board,
    }
}

fn project_review(hit: ReviewHit) -> SearchResultItem {
    SearchResultItem {
        excerpt: excerpt(&hit.content),
        id: hit.id,
        title: hit.title,
        category_name: hit.category_name,
        author_name: hit.author_name,
        created_at: hit.created_at,
        view_count: hit.view_count,
        upvote_count: hit.upvote_count,
        comment_count: hit.comment_count,
        kind: SourceKind::Review,
    }
}
