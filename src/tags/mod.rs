//! Tag reconciliation.
//!
//! Maps free-text tag names to stable tag records (get-or-create) and links
//! them to a post. Updates replace the post's whole link set.

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::{Arc, Mutex};

use crate::errors::AppError;
use crate::models::{PostTagLink, Tag};

/// Storage capabilities needed to reconcile tags.
pub trait TagStore: Send + Sync {
    fn find_tag_by_name(
        &self,
        name: &str,
    ) -> impl Future<Output = Result<Option<Tag>, AppError>> + Send;

    /// Must report a duplicate name as [`AppError::Conflict`].
    fn create_tag(&self, name: &str) -> impl Future<Output = Result<Tag, AppError>> + Send;

    /// Hard-deletes every link for the post, returning how many were removed.
    fn delete_all_post_tag_links(
        &self,
        post_id: &str,
    ) -> impl Future<Output = Result<u64, AppError>> + Send;

    fn create_post_tag_link(
        &self,
        post_id: &str,
        tag_id: &str,
    ) -> impl Future<Output = Result<PostTagLink, AppError>> + Send;
}

/// Trim names, drop blanks and repeated names. First occurrence keeps its position.
pub fn normalize_tag_names(names: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    names
        .iter()
        .map(|n| n.trim())
        .filter(|n| !n.is_empty())
        .filter(|n| seen.insert(n.to_string()))
        .map(str::to_string)
        .collect()
}

/// Reconciles tag names against a [`TagStore`], serializing writes per post.
///
/// The store is passed per call so the links can be written through the same
/// transaction as the post they belong to.
#[derive(Default)]
pub struct TagReconciler {
    post_locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl TagReconciler {
    /// Resolve each name to a tag and link all of them to the post.
    ///
    /// `None` means no change was requested and nothing is written.
    pub async fn reconcile_tags<S: TagStore>(
        &self,
        store: &S,
        names: Option<&[String]>,
        post_id: &str,
    ) -> Result<Vec<Tag>, AppError> {
        let Some(names) = names else {
            return Ok(Vec::new());
        };

        let lock = self.post_lock(post_id);
        let guard = lock.lock().await;
        let result = link_all(store, names, post_id).await;
        drop(guard);
        self.release_post_lock(post_id, lock);

        result
    }

    /// Delete every existing link for the post, then link the new names.
    ///
    /// Tags left without links are not removed.
    pub async fn replace_tags<S: TagStore>(
        &self,
        store: &S,
        names: Option<&[String]>,
        post_id: &str,
    ) -> Result<Vec<Tag>, AppError> {
        let lock = self.post_lock(post_id);
        let guard = lock.lock().await;

        let result = async {
            let removed = store.delete_all_post_tag_links(post_id).await?;
            tracing::debug!(post_id, removed, "Cleared tag links");
            match names {
                Some(names) => link_all(store, names, post_id).await,
                None => Ok(Vec::new()),
            }
        }
        .await;

        drop(guard);
        self.release_post_lock(post_id, lock);

        result
    }

    fn post_lock(&self, post_id: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.post_locks.lock().unwrap_or_else(|e| e.into_inner());
        locks.entry(post_id.to_string()).or_default().clone()
    }

    fn release_post_lock(&self, post_id: &str, lock: Arc<tokio::sync::Mutex<()>>) {
        let mut locks = self.post_locks.lock().unwrap_or_else(|e| e.into_inner());
        // The map and `lock` are the only holders: nobody else is waiting.
        if Arc::strong_count(&lock) == 2 {
            locks.remove(post_id);
        }
    }
}

async fn link_all<S: TagStore>(
    store: &S,
    names: &[String],
    post_id: &str,
) -> Result<Vec<Tag>, AppError> {
    let mut tags = Vec::new();
    for name in normalize_tag_names(names) {
        let tag = get_or_create(store, &name).await?;
        if !tags.iter().any(|t: &Tag| t.id == tag.id) {
            tags.push(tag);
        }
    }

    for tag in &tags {
        store.create_post_tag_link(post_id, &tag.id).await?;
    }

    tracing::debug!(post_id, count = tags.len(), "Linked tags to post");
    Ok(tags)
}

/// Look the name up; create it if missing. A concurrent creator winning the
/// unique constraint is resolved by one more lookup.
async fn get_or_create<S: TagStore>(store: &S, name: &str) -> Result<Tag, AppError> {
    if let Some(tag) = store.find_tag_by_name(name).await? {
        tracing::debug!(tag = name, "Reusing existing tag");
        return Ok(tag);
    }

    match store.create_tag(name).await {
        Ok(tag) => {
            tracing::debug!(tag = name, id = %tag.id, "Created tag");
            Ok(tag)
        }
        Err(e) if e.is_conflict() => {
            tracing::warn!(tag = name, "Tag created concurrently, retrying lookup");
            store.find_tag_by_name(name).await?.ok_or_else(|| {
                AppError::Conflict(format!("Tag '{}' could not be created or found", name))
            })
        }
        Err(e) => Err(e),
    }
}
