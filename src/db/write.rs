//! Post writes that span several tables.
//!
//! A post row and its tag links are written through one SQLite transaction,
//! so a failed tag write leaves neither behind.

use sqlx::{Sqlite, SqliteConnection, SqlitePool, Transaction};
use tokio::sync::{Mutex, MutexGuard};

use super::repository::timestamp;
use crate::errors::AppError;
use crate::models::Post;

/// One open write transaction. Dropping it without [`PostWrite::commit`]
/// rolls every statement back.
pub struct PostWrite {
    tx: Mutex<Transaction<'static, Sqlite>>,
}

impl PostWrite {
    pub(super) async fn begin(pool: &SqlitePool) -> Result<Self, AppError> {
        Ok(Self {
            tx: Mutex::new(pool.begin().await?),
        })
    }

    pub async fn commit(self) -> Result<(), AppError> {
        self.tx.into_inner().commit().await?;
        Ok(())
    }

    /// Exclusive access to the transaction's connection.
    pub(super) async fn conn(&self) -> MutexGuard<'_, Transaction<'static, Sqlite>> {
        self.tx.lock().await
    }

    pub(super) async fn insert_post(&self, post: &Post) -> Result<(), AppError> {
        let mut tx = self.conn().await;
        let conn: &mut SqliteConnection = &mut tx;

        sqlx::query(
            "INSERT INTO posts (id, title, content, category_id, author_id, active, view_count, upvote_count, comment_count, created_at, updated_at) VALUES (?, ?, ?, ?, ?, 1, 0, 0, 0, ?, ?)"
        )
        .bind(&post.id)
        .bind(&post.title)
        .bind(&post.content)
        .bind(&post.category_id)
        .bind(&post.author_id)
        .bind(timestamp(post.created_at))
        .bind(timestamp(post.updated_at))
        .execute(conn)
        .await?;

        Ok(())
    }

    pub(super) async fn update_post(&self, post: &Post) -> Result<(), AppError> {
        let mut tx = self.conn().await;
        let conn: &mut SqliteConnection = &mut tx;

        let result = sqlx::query(
            "UPDATE posts SET title = ?, content = ?, category_id = ?, updated_at = ? WHERE id = ? AND active = 1",
        )
        .bind(&post.title)
        .bind(&post.content)
        .bind(&post.category_id)
        .bind(timestamp(post.updated_at))
        .bind(&post.id)
        .execute(conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Post {} not found", post.id)));
        }
        Ok(())
    }
}
