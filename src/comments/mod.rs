//! Comment thread reconstruction.
//!
//! Turns the flat comment rows of a post into a forest of nested nodes.
//! The arena is indexed once and walked with an explicit stack, so the
//! depth of a reply chain never touches the call stack.

use std::collections::HashMap;
use std::future::Future;

use crate::errors::AppError;
use crate::models::{Comment, CommentNode};

/// Storage capability for reading a post's comments.
pub trait CommentSource: Send + Sync {
    fn find_comments_for_post(
        &self,
        post_id: &str,
    ) -> impl Future<Output = Result<Vec<Comment>, AppError>> + Send;
}

/// Build the nested thread for a flat set of comments.
///
/// Roots and siblings keep input order. Comments whose parent is missing,
/// belongs to another post, or is only reachable through a cycle are left out.
/// When ids repeat, the first occurrence wins.
pub fn build_tree(comments: &[Comment]) -> Vec<CommentNode> {
    let n = comments.len();

    let mut index: HashMap<&str, usize> = HashMap::with_capacity(n);
    for (i, comment) in comments.iter().enumerate() {
        index.entry(comment.id.as_str()).or_insert(i);
    }

    let mut roots = Vec::new();
    let mut children: Vec<Vec<usize>> = vec![Vec::new(); n];
    for (i, comment) in comments.iter().enumerate() {
        if index[comment.id.as_str()] != i {
            continue;
        }
        match comment.parent_id.as_deref() {
            None => roots.push(i),
            Some(parent_id) => {
                if let Some(&p) = index.get(parent_id) {
                    if p != i && comments[p].post_id == comment.post_id {
                        children[p].push(i);
                    }
                }
            }
        }
    }

    // Pre-order walk from the roots; anything not reached is an orphan.
    let mut order = Vec::with_capacity(n);
    let mut visited = vec![false; n];
    let mut stack: Vec<usize> = roots.iter().rev().copied().collect();
    while let Some(i) = stack.pop() {
        if std::mem::replace(&mut visited[i], true) {
            continue;
        }
        order.push(i);
        stack.extend(children[i].iter().rev().copied());
    }

    // Reverse pre-order finishes every child before its parent.
    let mut built: Vec<Option<CommentNode>> = (0..n).map(|_| None).collect();
    for &i in order.iter().rev() {
        let mut node = CommentNode::leaf(&comments[i]);
        node.children = children[i]
            .iter()
            .filter_map(|&c| built[c].take())
            .collect();
        built[i] = Some(node);
    }

    let tree: Vec<CommentNode> = roots.iter().filter_map(|&r| built[r].take()).collect();

    let orphaned = n - order.len();
    if orphaned > 0 {
        tracing::debug!(orphaned, "Comments unreachable from any root were skipped");
    }

    tree
}

/// Load a post's comments and assemble its thread.
pub async fn load_thread<S: CommentSource>(
    source: &S,
    post_id: &str,
) -> Result<Vec<CommentNode>, AppError> {
    let comments = source.find_comments_for_post(post_id).await?;
    let tree = build_tree(&comments);
    tracing::debug!(post_id, comments = comments.len(), roots = tree.len(), "Built comment thread");
    Ok(tree)
}
