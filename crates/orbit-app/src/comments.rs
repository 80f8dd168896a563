//! Comment trees: a post's reply forest, plus the comment mutations.

use std::collections::{HashMap, HashSet};

use chrono::Utc;
use tracing::warn;
use uuid::Uuid;

use orbit_store::{CommentRecord, Store};
use orbit_types::models::{Comment, Relation};
use orbit_types::views::{CommentNode, NewComment};

use crate::error::AppError;
use crate::session::ViewerSession;
use crate::toggle::{self, ToggleAck};

/// Fetch the ordered reply forest for a post.
///
/// One primary read (non-hidden comments, ascending by creation time, author
/// inline), then batched like counts and the viewer's liked subset — both
/// absorbed to defaults on failure, like the feed's secondary reads.
pub async fn fetch_tree<S: Store>(
    store: &S,
    post_id: Uuid,
    session: &dyn ViewerSession,
) -> Result<Vec<CommentNode>, AppError> {
    let records = store.select_comments(post_id).await?;
    let viewer = session.current_viewer();

    let ids: Vec<Uuid> = records.iter().map(|r| r.comment.id).collect();
    let like_counts = store
        .count_relations(Relation::CommentLike, &ids)
        .await
        .unwrap_or_else(|err| {
            warn!(error = %err, "comment like counts unavailable, rendering zeros");
            HashMap::new()
        });
    let liked = match viewer {
        Some(viewer) => store
            .relations_of(Relation::CommentLike, viewer, &ids)
            .await
            .unwrap_or_else(|err| {
                warn!(error = %err, "viewer comment likes unavailable");
                HashSet::new()
            }),
        None => HashSet::new(),
    };

    Ok(build_forest(records, &like_counts, &liked))
}

/// Assemble the forest from the flat ascending-by-creation list.
///
/// Two passes over an arena: every comment gets a node before any linking,
/// so a reply can reference a parent that appears later in the list. A
/// reply whose parent is not in the fetched set (deleted or hidden) is
/// promoted to a root in encounter order. Nesting depth is unbounded here;
/// flattening is a presentation decision.
fn build_forest(
    records: Vec<CommentRecord>,
    like_counts: &HashMap<Uuid, u64>,
    liked: &HashSet<Uuid>,
) -> Vec<CommentNode> {
    let index: HashMap<Uuid, usize> = records
        .iter()
        .enumerate()
        .map(|(i, r)| (r.comment.id, i))
        .collect();

    // Parent edge within the fetched set, if any.
    let parent_of: Vec<Option<usize>> = records
        .iter()
        .map(|r| {
            r.comment
                .parent_comment_id
                .and_then(|pid| index.get(&pid).copied())
        })
        .collect();

    let mut arena: Vec<Option<CommentNode>> = records
        .into_iter()
        .map(|record| {
            let id = record.comment.id;
            Some(CommentNode {
                comment: record.comment,
                author: record.author,
                like_count: like_counts.get(&id).copied().unwrap_or(0),
                viewer_has_liked: liked.contains(&id),
                replies: Vec::new(),
            })
        })
        .collect();

    let mut children: Vec<Vec<usize>> = vec![Vec::new(); arena.len()];
    for (i, parent) in parent_of.iter().enumerate() {
        if let Some(parent) = *parent {
            children[parent].push(i);
        }
    }

    // Link bottom-up, deepest nodes first, so every reply subtree is
    // complete before its parent consumes it. The sort is stable, which
    // keeps encounter order within each depth.
    let depth_of = |mut i: usize| {
        let mut depth = 0usize;
        while let Some(parent) = parent_of[i] {
            depth += 1;
            i = parent;
        }
        depth
    };
    let mut order: Vec<usize> = (0..arena.len()).collect();
    order.sort_by_key(|&i| std::cmp::Reverse(depth_of(i)));

    for i in order {
        let replies: Vec<CommentNode> = children[i]
            .iter()
            .filter_map(|&child| arena[child].take())
            .collect();
        if let Some(node) = arena[i].as_mut() {
            node.replies = replies;
        }
    }

    (0..arena.len())
        .filter(|&i| parent_of[i].is_none())
        .filter_map(|i| arena[i].take())
        .collect()
}

// -- Mutations --

pub async fn create_comment<S: Store>(
    store: &S,
    post_id: Uuid,
    session: &dyn ViewerSession,
    new: NewComment,
) -> Result<Comment, AppError> {
    let author_id = session.current_viewer().ok_or(AppError::NotAuthenticated)?;
    if new.body.trim().is_empty() {
        return Err(AppError::Validation("comment body cannot be empty".into()));
    }
    store
        .select_post(post_id)
        .await?
        .ok_or(AppError::NotFound("post"))?;

    if let Some(parent_id) = new.parent_comment_id {
        let parent = store
            .select_comment(parent_id)
            .await?
            .ok_or(AppError::NotFound("parent comment"))?;
        if parent.post_id != post_id {
            return Err(AppError::Validation(
                "parent comment belongs to a different post".into(),
            ));
        }
    }

    let comment = Comment {
        id: Uuid::new_v4(),
        post_id,
        author_id,
        parent_comment_id: new.parent_comment_id,
        body: new.body,
        is_hidden: false,
        created_at: Utc::now(),
    };
    store.insert_comment(&comment).await?;
    Ok(comment)
}

/// Delete a comment. Author only. Replies are not cascaded: they stay in
/// the store with a dangling parent reference and are promoted to roots on
/// the next fetch.
pub async fn delete_comment<S: Store>(
    store: &S,
    session: &dyn ViewerSession,
    comment_id: Uuid,
) -> Result<(), AppError> {
    let viewer = session.current_viewer().ok_or(AppError::NotAuthenticated)?;
    let comment = store
        .select_comment(comment_id)
        .await?
        .ok_or(AppError::NotFound("comment"))?;
    if comment.author_id != viewer {
        return Err(AppError::Forbidden);
    }
    store.delete_comment(comment_id).await?;
    Ok(())
}

pub async fn toggle_comment_like<S: Store>(
    store: &S,
    session: &dyn ViewerSession,
    comment_id: Uuid,
) -> Result<ToggleAck, AppError> {
    toggle::toggle(store, Relation::CommentLike, session, comment_id).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{Anonymous, SignedIn};
    use crate::testutil;
    use chrono::Duration;

    async fn comment(
        db: &orbit_store::Database,
        post_id: Uuid,
        author: Uuid,
        body: &str,
        parent: Option<Uuid>,
    ) -> Comment {
        create_comment(
            db,
            post_id,
            &SignedIn(author),
            NewComment {
                body: body.to_string(),
                parent_comment_id: parent,
            },
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn root_and_reply_form_a_tree() {
        let db = testutil::store();
        let ada = testutil::profile(&db, "ada").await;
        let space = testutil::space(&db, ada, "robotics").await;
        let post = testutil::post(&db, ada, space.id, "hello").await;

        let c1 = comment(&db, post.id, ada, "first", None).await;
        let c2 = comment(&db, post.id, ada, "reply", Some(c1.id)).await;

        let tree = fetch_tree(&db, post.id, &Anonymous).await.unwrap();
        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0].comment.id, c1.id);
        assert_eq!(tree[0].author.username, "ada");
        assert_eq!(tree[0].replies.len(), 1);
        assert_eq!(tree[0].replies[0].comment.id, c2.id);
    }

    #[tokio::test]
    async fn forest_is_complete_and_roots_ascend_by_creation() {
        let db = testutil::store();
        let ada = testutil::profile(&db, "ada").await;
        let brin = testutil::profile(&db, "brin").await;
        let space = testutil::space(&db, ada, "robotics").await;
        let post = testutil::post(&db, ada, space.id, "hello").await;

        let r1 = comment(&db, post.id, ada, "root one", None).await;
        let r2 = comment(&db, post.id, brin, "root two", None).await;
        let a = comment(&db, post.id, brin, "reply to one", Some(r1.id)).await;
        let b = comment(&db, post.id, ada, "another reply to one", Some(r1.id)).await;
        let nested = comment(&db, post.id, ada, "deeper", Some(a.id)).await;

        let tree = fetch_tree(&db, post.id, &Anonymous).await.unwrap();
        let root_ids: Vec<Uuid> = tree.iter().map(|n| n.comment.id).collect();
        assert_eq!(root_ids, [r1.id, r2.id]);

        let one = &tree[0];
        let child_ids: Vec<Uuid> = one.replies.iter().map(|n| n.comment.id).collect();
        assert_eq!(child_ids, [a.id, b.id]);
        assert_eq!(one.replies[0].replies[0].comment.id, nested.id);
        assert!(tree[1].replies.is_empty());
    }

    #[tokio::test]
    async fn replies_link_even_when_the_parent_sorts_later() {
        let db = testutil::store();
        let ada = testutil::profile(&db, "ada").await;
        let space = testutil::space(&db, ada, "robotics").await;
        let post = testutil::post(&db, ada, space.id, "hello").await;

        // Clock skew can order a reply before its parent in the ascending
        // scan; write the rows directly to model it.
        let parent_id = Uuid::new_v4();
        let reply_id = Uuid::new_v4();
        let now = Utc::now();
        db.insert_comment(&Comment {
            id: reply_id,
            post_id: post.id,
            author_id: ada,
            parent_comment_id: Some(parent_id),
            body: "reply, earlier timestamp".to_string(),
            is_hidden: false,
            created_at: now - Duration::seconds(5),
        })
        .await
        .unwrap();
        db.insert_comment(&Comment {
            id: parent_id,
            post_id: post.id,
            author_id: ada,
            parent_comment_id: None,
            body: "parent, later timestamp".to_string(),
            is_hidden: false,
            created_at: now,
        })
        .await
        .unwrap();

        let tree = fetch_tree(&db, post.id, &Anonymous).await.unwrap();
        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0].comment.id, parent_id);
        assert_eq!(tree[0].replies.len(), 1);
        assert_eq!(tree[0].replies[0].comment.id, reply_id);
    }

    #[tokio::test]
    async fn orphaned_replies_are_promoted_to_roots() {
        let db = testutil::store();
        let ada = testutil::profile(&db, "ada").await;
        let brin = testutil::profile(&db, "brin").await;
        let space = testutil::space(&db, ada, "robotics").await;
        let post = testutil::post(&db, ada, space.id, "hello").await;

        let parent = comment(&db, post.id, ada, "doomed", None).await;
        let reply = comment(&db, post.id, brin, "survives", Some(parent.id)).await;

        delete_comment(&db, &SignedIn(ada), parent.id).await.unwrap();

        let tree = fetch_tree(&db, post.id, &Anonymous).await.unwrap();
        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0].comment.id, reply.id);
        assert!(tree[0].replies.is_empty());
    }

    #[tokio::test]
    async fn comment_likes_aggregate_per_node() {
        let db = testutil::store();
        let ada = testutil::profile(&db, "ada").await;
        let brin = testutil::profile(&db, "brin").await;
        let space = testutil::space(&db, ada, "robotics").await;
        let post = testutil::post(&db, ada, space.id, "hello").await;
        let c1 = comment(&db, post.id, ada, "likeable", None).await;

        toggle_comment_like(&db, &SignedIn(brin), c1.id).await.unwrap();

        let tree = fetch_tree(&db, post.id, &SignedIn(brin)).await.unwrap();
        assert_eq!(tree[0].like_count, 1);
        assert!(tree[0].viewer_has_liked);

        let tree = fetch_tree(&db, post.id, &Anonymous).await.unwrap();
        assert_eq!(tree[0].like_count, 1);
        assert!(!tree[0].viewer_has_liked);

        toggle_comment_like(&db, &SignedIn(brin), c1.id).await.unwrap();
        let tree = fetch_tree(&db, post.id, &SignedIn(brin)).await.unwrap();
        assert_eq!(tree[0].like_count, 0);
        assert!(!tree[0].viewer_has_liked);
    }

    #[tokio::test]
    async fn comment_creation_is_validated() {
        let db = testutil::store();
        let ada = testutil::profile(&db, "ada").await;
        let space = testutil::space(&db, ada, "robotics").await;
        let post = testutil::post(&db, ada, space.id, "hello").await;
        let other_post = testutil::post(&db, ada, space.id, "other").await;
        let parent = comment(&db, post.id, ada, "root", None).await;

        let err = create_comment(
            &db,
            post.id,
            &Anonymous,
            NewComment {
                body: "hi".into(),
                parent_comment_id: None,
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::NotAuthenticated));

        let err = create_comment(
            &db,
            post.id,
            &SignedIn(ada),
            NewComment {
                body: "  ".into(),
                parent_comment_id: None,
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        // A parent from another post violates the same-post invariant.
        let err = create_comment(
            &db,
            other_post.id,
            &SignedIn(ada),
            NewComment {
                body: "hi".into(),
                parent_comment_id: Some(parent.id),
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let err = create_comment(
            &db,
            post.id,
            &SignedIn(ada),
            NewComment {
                body: "hi".into(),
                parent_comment_id: Some(Uuid::new_v4()),
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::NotFound("parent comment")));
    }

    #[tokio::test]
    async fn only_the_author_deletes_a_comment() {
        let db = testutil::store();
        let ada = testutil::profile(&db, "ada").await;
        let brin = testutil::profile(&db, "brin").await;
        let space = testutil::space(&db, ada, "robotics").await;
        let post = testutil::post(&db, ada, space.id, "hello").await;
        let c1 = comment(&db, post.id, ada, "mine", None).await;

        let err = delete_comment(&db, &SignedIn(brin), c1.id).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden));

        delete_comment(&db, &SignedIn(ada), c1.id).await.unwrap();
        let err = delete_comment(&db, &SignedIn(ada), c1.id).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound("comment")));
    }
}
