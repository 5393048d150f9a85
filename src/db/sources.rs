//! SQLite-backed implementations of the engine's storage traits.

use sqlx::{Row, SqliteConnection};

use super::repository::{comment_from_row, current_time, new_id, tag_from_row, timestamp};
use super::{PostWrite, Repository};
use crate::comments::CommentSource;
use crate::errors::AppError;
use crate::models::{Comment, Page, PostHit, PostTagLink, ReviewHit, SearchFilter, SearchType, Tag};
use crate::search::SearchSource;
use crate::tags::TagStore;

impl TagStore for PostWrite {
    async fn find_tag_by_name(&self, name: &str) -> Result<Option<Tag>, AppError> {
        let mut tx = self.conn().await;
        let conn: &mut SqliteConnection = &mut tx;

        let row = sqlx::query("SELECT id, name, created_at FROM tags WHERE name = ?")
            .bind(name)
            .fetch_optional(conn)
            .await?;

        Ok(row.as_ref().map(tag_from_row))
    }

    async fn create_tag(&self, name: &str) -> Result<Tag, AppError> {
        let mut tx = self.conn().await;
        let conn: &mut SqliteConnection = &mut tx;
        let id = new_id();
        let now = current_time();

        // A concurrent insert of the same name surfaces as AppError::Conflict.
        sqlx::query("INSERT INTO tags (id, name, created_at) VALUES (?, ?, ?)")
            .bind(&id)
            .bind(name)
            .bind(timestamp(now))
            .execute(conn)
            .await?;

        Ok(Tag {
            id,
            name: name.to_string(),
            created_at: now,
        })
    }

    async fn delete_all_post_tag_links(&self, post_id: &str) -> Result<u64, AppError> {
        let mut tx = self.conn().await;
        let conn: &mut SqliteConnection = &mut tx;

        let result = sqlx::query("DELETE FROM post_tags WHERE post_id = ?")
            .bind(post_id)
            .execute(conn)
            .await?;

        Ok(result.rows_affected())
    }

    async fn create_post_tag_link(
        &self,
        post_id: &str,
        tag_id: &str,
    ) -> Result<PostTagLink, AppError> {
        let mut tx = self.conn().await;
        let conn: &mut SqliteConnection = &mut tx;
        let id = new_id();
        let now = current_time();

        sqlx::query(
            "INSERT INTO post_tags (id, post_id, tag_id, active, created_at, updated_at) VALUES (?, ?, ?, 1, ?, ?)",
        )
        .bind(&id)
        .bind(post_id)
        .bind(tag_id)
        .bind(timestamp(now))
        .bind(timestamp(now))
        .execute(conn)
        .await?;

        Ok(PostTagLink {
            id,
            post_id: post_id.to_string(),
            tag_id: tag_id.to_string(),
            active: true,
            created_at: now,
            updated_at: now,
        })
    }
}

impl CommentSource for Repository {
    async fn find_comments_for_post(&self, post_id: &str) -> Result<Vec<Comment>, AppError> {
        let rows = sqlx::query(
            "SELECT cm.id, cm.post_id, cm.author_id, u.display_name AS author_name, cm.body, cm.parent_id, cm.upvote_count, cm.created_at, cm.updated_at FROM comments cm JOIN users u ON u.id = cm.author_id WHERE cm.post_id = ? ORDER BY cm.created_at, cm.rowid",
        )
        .bind(post_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(comment_from_row).collect())
    }
}

/// `WHERE` fragment for a text search over an entity aliased `e`, joined to
/// its author as `u`. `?1` is the `LIKE` pattern.
fn text_condition(search_type: SearchType) -> &'static str {
    match search_type {
        SearchType::TitleOrContent => {
            r"(e.title LIKE ?1 ESCAPE '\' OR e.content LIKE ?1 ESCAPE '\')"
        }
        SearchType::Title => r"e.title LIKE ?1 ESCAPE '\'",
        SearchType::Content => r"e.content LIKE ?1 ESCAPE '\'",
        SearchType::Author => r"u.display_name LIKE ?1 ESCAPE '\'",
    }
}

impl Repository {
    /// Run the count and page queries for one searchable table.
    async fn search_table(
        &self,
        table: &str,
        extra_columns: &str,
        filter: &SearchFilter,
    ) -> Result<(Vec<sqlx::sqlite::SqliteRow>, usize), AppError> {
        let from = format!(
            "FROM {} e JOIN categories c ON c.id = e.category_id JOIN users u ON u.id = e.author_id WHERE e.active = 1 AND {}",
            table,
            text_condition(filter.search_type)
        );
        let pattern = filter.like_pattern();
        let (limit, offset) = filter.sql_bounds();

        let count_row = sqlx::query(&format!("SELECT COUNT(*) AS n {}", from))
            .bind(&pattern)
            .fetch_one(&self.pool)
            .await?;
        let total: i64 = count_row.get("n");

        let rows = sqlx::query(&format!(
            "SELECT e.id, e.title, e.content, c.name AS category_name, u.display_name AS author_name, e.view_count, e.upvote_count, e.comment_count, e.created_at{} {} ORDER BY e.created_at DESC, e.id DESC LIMIT ?2 OFFSET ?3",
            extra_columns, from
        ))
        .bind(&pattern)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok((rows, total.max(0) as usize))
    }
}

impl SearchSource for Repository {
    async fn query_posts_by_text(&self, filter: &SearchFilter) -> Result<Page<PostHit>, AppError> {
        let (rows, total_count) = self.search_table("posts", "", filter).await?;

        let items = rows
            .iter()
            .map(|row| PostHit {
                id: row.get("id"),
                title: row.get("title"),
                content: row.get("content"),
                category_name: row.get("category_name"),
                author_name: row.get("author_name"),
                view_count: row.get("view_count"),
                upvote_count: row.get("upvote_count"),
                comment_count: row.get("comment_count"),
                created_at: row.get("created_at"),
            })
            .collect();

        Ok(Page { items, total_count })
    }

    async fn query_reviews_by_text(
        &self,
        filter: &SearchFilter,
    ) -> Result<Page<ReviewHit>, AppError> {
        let (rows, total_count) = self.search_table("reviews", ", e.rating", filter).await?;

        let items = rows
            .iter()
            .map(|row| ReviewHit {
                id: row.get("id"),
                title: row.get("title"),
                content: row.get("content"),
                category_name: row.get("category_name"),
                author_name: row.get("author_name"),
                rating: row.get("rating"),
                view_count: row.get("view_count"),
                upvote_count: row.get("upvote_count"),
                comment_count: row.get("comment_count"),
                created_at: row.get("created_at"),
            })
            .collect();

        Ok(Page { items, total_count })
    }
}
