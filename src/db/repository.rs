//! Database repository for CRUD operations.
//!
//! Uses prepared statements and transactions for data integrity.

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use sqlx::{Row, SqlitePool};

use super::PostWrite;
use crate::errors::AppError;
use crate::models::{
    Category, Comment, CreateCommentRequest, CreatePostRequest, CreateReviewRequest,
    CreateUserRequest, Page, Post, PostListFilter, Review, Tag, UpdatePostRequest, User,
};
use crate::tags::TagReconciler;

/// Database repository for all data operations.
#[derive(Clone)]
pub struct Repository {
    pub(super) pool: SqlitePool,
}

/// Fixed-width RFC 3339, so text ordering in SQL is chronological.
pub(super) fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// The current time at the precision it is stored with.
pub(super) fn current_time() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

pub(super) fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

fn title_conflict(title: &str) -> AppError {
    AppError::Conflict(format!("A post titled '{}' already exists", title))
}

const POST_COLUMNS: &str = "id, title, content, category_id, author_id, active, view_count, upvote_count, comment_count, created_at, updated_at";

const REVIEW_COLUMNS: &str = "id, title, content, category_id, author_id, rating, active, view_count, upvote_count, comment_count, created_at, updated_at";

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    // ==================== USER OPERATIONS ====================

    /// List all users.
    pub async fn list_users(&self) -> Result<Vec<User>, AppError> {
        let rows = sqlx::query("SELECT id, display_name, created_at FROM users ORDER BY display_name")
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.iter().map(user_from_row).collect())
    }

    /// Get a user by ID.
    pub async fn get_user(&self, id: &str) -> Result<Option<User>, AppError> {
        let row = sqlx::query("SELECT id, display_name, created_at FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(user_from_row))
    }

    /// Create a new user.
    pub async fn create_user(&self, request: &CreateUserRequest) -> Result<User, AppError> {
        let id = new_id();
        let now = current_time();

        sqlx::query("INSERT INTO users (id, display_name, created_at) VALUES (?, ?, ?)")
            .bind(&id)
            .bind(request.display_name.trim())
            .bind(timestamp(now))
            .execute(&self.pool)
            .await?;

        Ok(User {
            id,
            display_name: request.display_name.trim().to_string(),
            created_at: now,
        })
    }

    // ==================== CATEGORY OPERATIONS ====================

    /// List all categories.
    pub async fn list_categories(&self) -> Result<Vec<Category>, AppError> {
        let rows = sqlx::query("SELECT id, name FROM categories ORDER BY name")
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .iter()
            .map(|row| Category {
                id: row.get("id"),
                name: row.get("name"),
            })
            .collect())
    }

    /// Get a category by ID.
    pub async fn get_category(&self, id: &str) -> Result<Option<Category>, AppError> {
        let row = sqlx::query("SELECT id, name FROM categories WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|row| Category {
            id: row.get("id"),
            name: row.get("name"),
        }))
    }

    async fn require_author_and_category(
        &self,
        author_id: &str,
        category_id: &str,
    ) -> Result<(), AppError> {
        if self.get_user(author_id).await?.is_none() {
            return Err(AppError::NotFound(format!("User {} not found", author_id)));
        }
        if self.get_category(category_id).await?.is_none() {
            return Err(AppError::NotFound(format!(
                "Category {} not found",
                category_id
            )));
        }
        Ok(())
    }

    // ==================== POST OPERATIONS ====================

    /// Get a post by ID, active or not.
    pub async fn get_post(&self, id: &str) -> Result<Option<Post>, AppError> {
        let row = sqlx::query(&format!("SELECT {} FROM posts WHERE id = ?", POST_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(post_from_row))
    }

    /// Get a post that has not been deleted.
    pub async fn get_active_post(&self, id: &str) -> Result<Post, AppError> {
        self.get_post(id)
            .await?
            .filter(|p| p.active)
            .ok_or_else(|| AppError::NotFound(format!("Post {} not found", id)))
    }

    async fn title_taken(&self, title: &str, except_id: Option<&str>) -> Result<bool, AppError> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS n FROM posts WHERE title = ? AND active = 1 AND id != COALESCE(?, '')",
        )
        .bind(title)
        .bind(except_id)
        .fetch_one(&self.pool)
        .await?;

        let n: i64 = row.get("n");
        Ok(n > 0)
    }

    /// Create a new post and link its tags in one transaction. Titles are
    /// unique among active posts.
    pub async fn create_post(
        &self,
        request: &CreatePostRequest,
        tags: &TagReconciler,
    ) -> Result<Post, AppError> {
        let title = request.title.trim();
        if self.title_taken(title, None).await? {
            return Err(title_conflict(title));
        }
        self.require_author_and_category(&request.author_id, &request.category_id)
            .await?;

        let now = current_time();
        let post = Post {
            id: new_id(),
            title: title.to_string(),
            content: request.content.clone(),
            category_id: request.category_id.clone(),
            author_id: request.author_id.clone(),
            active: true,
            view_count: 0,
            upvote_count: 0,
            comment_count: 0,
            created_at: now,
            updated_at: now,
        };

        let write = PostWrite::begin(&self.pool).await?;
        // The partial unique index on active titles catches concurrent creates.
        write
            .insert_post(&post)
            .await
            .map_err(|e| if e.is_conflict() { title_conflict(title) } else { e })?;
        tags.reconcile_tags(&write, request.tags.as_deref(), &post.id)
            .await?;
        write.commit().await?;

        Ok(post)
    }

    /// Update title, content and category of an active post and replace its
    /// tag links, all in one transaction.
    pub async fn update_post(
        &self,
        id: &str,
        request: &UpdatePostRequest,
        tags: &TagReconciler,
    ) -> Result<Post, AppError> {
        let existing = self.get_active_post(id).await?;

        let title = request
            .title
            .as_deref()
            .map(str::trim)
            .unwrap_or(&existing.title)
            .to_string();
        if title != existing.title && self.title_taken(&title, Some(id)).await? {
            return Err(title_conflict(&title));
        }
        let content = request.content.clone().unwrap_or(existing.content.clone());
        let category_id = request
            .category_id
            .clone()
            .unwrap_or(existing.category_id.clone());
        if self.get_category(&category_id).await?.is_none() {
            return Err(AppError::NotFound(format!(
                "Category {} not found",
                category_id
            )));
        }

        let post = Post {
            title,
            content,
            category_id,
            updated_at: current_time(),
            ..existing
        };

        let write = PostWrite::begin(&self.pool).await?;
        write.update_post(&post).await.map_err(|e| {
            if e.is_conflict() {
                title_conflict(&post.title)
            } else {
                e
            }
        })?;
        tags.replace_tags(&write, request.tags.as_deref(), id).await?;
        write.commit().await?;

        Ok(post)
    }

    /// One page of an author's active posts, optionally within one category.
    pub async fn list_posts(&self, filter: &PostListFilter) -> Result<Page<Post>, AppError> {
        let conditions = "WHERE author_id = ?1 AND active = 1 AND (?2 IS NULL OR category_id = ?2)";

        let count_row = sqlx::query(&format!("SELECT COUNT(*) AS n FROM posts {}", conditions))
            .bind(&filter.author_id)
            .bind(&filter.category_id)
            .fetch_one(&self.pool)
            .await?;
        let total: i64 = count_row.get("n");

        let (limit, offset) = filter.sql_bounds();
        let rows = sqlx::query(&format!(
            "SELECT {} FROM posts {} ORDER BY {} LIMIT ?3 OFFSET ?4",
            POST_COLUMNS,
            conditions,
            filter.sort.order_by()
        ))
        .bind(&filter.author_id)
        .bind(&filter.category_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(Page {
            items: rows.iter().map(post_from_row).collect(),
            total_count: total.max(0) as usize,
        })
    }

    /// Soft-delete a post.
    pub async fn deactivate_post(&self, id: &str) -> Result<(), AppError> {
        let result =
            sqlx::query("UPDATE posts SET active = 0, updated_at = ? WHERE id = ? AND active = 1")
                .bind(timestamp(current_time()))
                .bind(id)
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Post {} not found", id)));
        }
        Ok(())
    }

    // ==================== REVIEW OPERATIONS ====================

    /// Get an active review by ID.
    pub async fn get_review(&self, id: &str) -> Result<Option<Review>, AppError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM reviews WHERE id = ? AND active = 1",
            REVIEW_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(review_from_row))
    }

    /// Create a new review.
    pub async fn create_review(&self, request: &CreateReviewRequest) -> Result<Review, AppError> {
        self.require_author_and_category(&request.author_id, &request.category_id)
            .await?;

        let id = new_id();
        let now = current_time();

        sqlx::query(
            "INSERT INTO reviews (id, title, content, category_id, author_id, rating, active, view_count, upvote_count, comment_count, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, 1, 0, 0, 0, ?, ?)"
        )
        .bind(&id)
        .bind(request.title.trim())
        .bind(&request.content)
        .bind(&request.category_id)
        .bind(&request.author_id)
        .bind(request.rating)
        .bind(timestamp(now))
        .bind(timestamp(now))
        .execute(&self.pool)
        .await?;

        Ok(Review {
            id,
            title: request.title.trim().to_string(),
            content: request.content.clone(),
            category_id: request.category_id.clone(),
            author_id: request.author_id.clone(),
            rating: request.rating,
            active: true,
            view_count: 0,
            upvote_count: 0,
            comment_count: 0,
            created_at: now,
            updated_at: now,
        })
    }

    // ==================== TAG OPERATIONS ====================

    /// List all tags.
    pub async fn list_tags(&self) -> Result<Vec<Tag>, AppError> {
        let rows = sqlx::query("SELECT id, name, created_at FROM tags ORDER BY name")
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.iter().map(tag_from_row).collect())
    }

    /// Names of the tags linked to a post, in link order.
    pub async fn list_post_tag_names(&self, post_id: &str) -> Result<Vec<String>, AppError> {
        let rows = sqlx::query(
            "SELECT t.name FROM post_tags pt JOIN tags t ON t.id = pt.tag_id WHERE pt.post_id = ? AND pt.active = 1 ORDER BY pt.rowid",
        )
        .bind(post_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(|row| row.get("name")).collect())
    }

    // ==================== COMMENT OPERATIONS ====================

    /// Get a comment by ID.
    pub async fn get_comment(&self, id: &str) -> Result<Option<Comment>, AppError> {
        let row = sqlx::query(
            "SELECT cm.id, cm.post_id, cm.author_id, u.display_name AS author_name, cm.body, cm.parent_id, cm.upvote_count, cm.created_at, cm.updated_at FROM comments cm JOIN users u ON u.id = cm.author_id WHERE cm.id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(comment_from_row))
    }

    /// Add a comment to an active post and bump its comment count.
    ///
    /// A reply's parent must be a comment on the same post.
    pub async fn create_comment(
        &self,
        post_id: &str,
        request: &CreateCommentRequest,
    ) -> Result<Comment, AppError> {
        self.get_active_post(post_id).await?;
        let author = self
            .get_user(&request.author_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", request.author_id)))?;

        if let Some(parent_id) = &request.parent_id {
            let parent = self.get_comment(parent_id).await?;
            if parent.map(|p| p.post_id != post_id).unwrap_or(true) {
                return Err(AppError::NotFound(format!(
                    "Comment {} not found on post {}",
                    parent_id, post_id
                )));
            }
        }

        let id = new_id();
        let now = current_time();

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO comments (id, post_id, author_id, body, parent_id, upvote_count, created_at, updated_at) VALUES (?, ?, ?, ?, ?, 0, ?, ?)"
        )
        .bind(&id)
        .bind(post_id)
        .bind(&request.author_id)
        .bind(&request.body)
        .bind(&request.parent_id)
        .bind(timestamp(now))
        .bind(timestamp(now))
        .execute(&mut *tx)
        .await?;

        sqlx::query("UPDATE posts SET comment_count = comment_count + 1 WHERE id = ?")
            .bind(post_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(Comment {
            id,
            post_id: post_id.to_string(),
            author_id: author.id,
            author_name: author.display_name,
            body: request.body.clone(),
            parent_id: request.parent_id.clone(),
            upvote_count: 0,
            created_at: now,
            updated_at: now,
        })
    }

    /// Increment a comment's upvote count.
    pub async fn upvote_comment(&self, id: &str) -> Result<Comment, AppError> {
        let result = sqlx::query("UPDATE comments SET upvote_count = upvote_count + 1 WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Comment {} not found", id)));
        }

        self.get_comment(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Comment {} not found", id)))
    }
}

// Helper functions for row conversion

fn user_from_row(row: &sqlx::sqlite::SqliteRow) -> User {
    User {
        id: row.get("id"),
        display_name: row.get("display_name"),
        created_at: row.get("created_at"),
    }
}

pub(super) fn tag_from_row(row: &sqlx::sqlite::SqliteRow) -> Tag {
    Tag {
        id: row.get("id"),
        name: row.get("name"),
        created_at: row.get("created_at"),
    }
}

fn post_from_row(row: &sqlx::sqlite::SqliteRow) -> Post {
    let active: i32 = row.get("active");
    Post {
        id: row.get("id"),
        title: row.get("title"),
        content: row.get("content"),
        category_id: row.get("category_id"),
        author_id: row.get("author_id"),
        active: active != 0,
        view_count: row.get("view_count"),
        upvote_count: row.get("upvote_count"),
        comment_count: row.get("comment_count"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

fn review_from_row(row: &sqlx::sqlite::SqliteRow) -> Review {
    let active: i32 = row.get("active");
    Review {
        id: row.get("id"),
        title: row.get("title"),
        content: row.get("content"),
        category_id: row.get("category_id"),
        author_id: row.get("author_id"),
        rating: row.get("rating"),
        active: active != 0,
        view_count: row.get("view_count"),
        upvote_count: row.get("upvote_count"),
        comment_count: row.get("comment_count"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

pub(super) fn comment_from_row(row: &sqlx::sqlite::SqliteRow) -> Comment {
    Comment {
        id: row.get("id"),
        post_id: row.get("post_id"),
        author_id: row.get("author_id"),
        author_name: row.get("author_name"),
        body: row.get("body"),
        parent_id: row.get("parent_id"),
        upvote_count: row.get("upvote_count"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}
