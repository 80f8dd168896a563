//! Feed assembly: one page of posts with live counts and viewer flags.
//!
//! Every fetch is one primary read plus batched secondary reads keyed by
//! the page's post ids. A failed primary read aborts the fetch; a failed
//! secondary read degrades its fields to defaults and the feed still
//! renders.

use std::collections::{HashMap, HashSet};

use chrono::Utc;
use serde::Deserialize;
use tracing::warn;
use uuid::Uuid;

use orbit_store::{PostFilter, PostRecord, Store};
use orbit_types::models::{Post, Relation};
use orbit_types::views::{NewPost, PostView};

use crate::error::AppError;
use crate::session::ViewerSession;
use crate::toggle::{self, ToggleAck};

/// Fixed page size for all feed reads.
pub const FEED_PAGE_SIZE: u32 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedSort {
    /// Newest first.
    #[default]
    Chronological,
    /// Most-liked first; ties keep the chronological order.
    Trending,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct FeedQuery {
    pub space_id: Option<Uuid>,
    pub author_id: Option<Uuid>,
    #[serde(default)]
    pub sort: FeedSort,
}

pub async fn fetch_feed<S: Store>(
    store: &S,
    query: &FeedQuery,
    session: &dyn ViewerSession,
) -> Result<Vec<PostView>, AppError> {
    let filter = PostFilter {
        space_id: query.space_id,
        author_id: query.author_id,
    };
    let records = store.select_posts(&filter, FEED_PAGE_SIZE).await?;
    let mut views = assemble_post_views(store, records, session.current_viewer()).await;

    if query.sort == FeedSort::Trending {
        // Stable sort: equal like counts keep the newest-first page order.
        views.sort_by(|a, b| b.like_count.cmp(&a.like_count));
    }

    Ok(views)
}

/// Posts a user has liked, newest first.
pub async fn fetch_liked_posts<S: Store>(
    store: &S,
    user_id: Uuid,
    session: &dyn ViewerSession,
) -> Result<Vec<PostView>, AppError> {
    fetch_posts_for_relation(store, Relation::PostLike, user_id, session).await
}

/// Posts a user has saved, newest first.
pub async fn fetch_saved_posts<S: Store>(
    store: &S,
    user_id: Uuid,
    session: &dyn ViewerSession,
) -> Result<Vec<PostView>, AppError> {
    fetch_posts_for_relation(store, Relation::SavedPost, user_id, session).await
}

async fn fetch_posts_for_relation<S: Store>(
    store: &S,
    relation: Relation,
    user_id: Uuid,
    session: &dyn ViewerSession,
) -> Result<Vec<PostView>, AppError> {
    let ids = store.objects_of(relation, user_id).await?;
    let records = store.select_posts_by_ids(&ids).await?;
    Ok(assemble_post_views(store, records, session.current_viewer()).await)
}

/// Attach counts and viewer flags to a page of post records. Secondary
/// reads are absorbed on failure: the affected fields default to 0/false
/// and the page still renders.
async fn assemble_post_views<S: Store>(
    store: &S,
    records: Vec<PostRecord>,
    viewer: Option<Uuid>,
) -> Vec<PostView> {
    if records.is_empty() {
        return vec![];
    }

    let ids: Vec<Uuid> = records.iter().map(|r| r.post.id).collect();

    let like_counts = store
        .count_relations(Relation::PostLike, &ids)
        .await
        .unwrap_or_else(|err| {
            warn!(error = %err, "like counts unavailable, rendering zeros");
            HashMap::new()
        });
    let comment_counts = store.count_comments(&ids).await.unwrap_or_else(|err| {
        warn!(error = %err, "comment counts unavailable, rendering zeros");
        HashMap::new()
    });

    let (liked, saved) = match viewer {
        Some(viewer) => (
            store
                .relations_of(Relation::PostLike, viewer, &ids)
                .await
                .unwrap_or_else(|err| {
                    warn!(error = %err, "viewer likes unavailable");
                    HashSet::new()
                }),
            store
                .relations_of(Relation::SavedPost, viewer, &ids)
                .await
                .unwrap_or_else(|err| {
                    warn!(error = %err, "viewer saves unavailable");
                    HashSet::new()
                }),
        ),
        None => (HashSet::new(), HashSet::new()),
    };

    records
        .into_iter()
        .map(|record| {
            let id = record.post.id;
            PostView {
                like_count: like_counts.get(&id).copied().unwrap_or(0),
                comment_count: comment_counts.get(&id).copied().unwrap_or(0),
                viewer_has_liked: liked.contains(&id),
                viewer_has_saved: saved.contains(&id),
                post: record.post,
                author: record.author,
                space: record.space,
            }
        })
        .collect()
}

// -- Mutations --
//
// All fire-and-refetch: nothing below updates a view-model in place.

pub async fn create_post<S: Store>(
    store: &S,
    session: &dyn ViewerSession,
    new: NewPost,
) -> Result<Post, AppError> {
    let author_id = session.current_viewer().ok_or(AppError::NotAuthenticated)?;
    if new.title.trim().is_empty() {
        return Err(AppError::Validation("post title cannot be empty".into()));
    }
    let space = store
        .select_space(new.space_id)
        .await?
        .ok_or(AppError::NotFound("space"))?;

    let post = Post {
        id: Uuid::new_v4(),
        space_id: space.id,
        author_id,
        title: new.title,
        body: new.body,
        media_url: new.media_url,
        is_hidden: false,
        created_at: Utc::now(),
    };
    store.insert_post(&post).await?;
    Ok(post)
}

/// Delete a post. Allowed for the post's author and for the creator of the
/// space it was posted in.
pub async fn delete_post<S: Store>(
    store: &S,
    session: &dyn ViewerSession,
    post_id: Uuid,
) -> Result<(), AppError> {
    let viewer = session.current_viewer().ok_or(AppError::NotAuthenticated)?;
    let post = store
        .select_post(post_id)
        .await?
        .ok_or(AppError::NotFound("post"))?;

    if post.author_id != viewer {
        let space_creator = store
            .select_space(post.space_id)
            .await?
            .map(|space| space.creator_id);
        if space_creator != Some(viewer) {
            return Err(AppError::Forbidden);
        }
    }

    store.delete_post(post_id).await?;
    Ok(())
}

pub async fn toggle_post_like<S: Store>(
    store: &S,
    session: &dyn ViewerSession,
    post_id: Uuid,
) -> Result<ToggleAck, AppError> {
    toggle::toggle(store, Relation::PostLike, session, post_id).await
}

pub async fn toggle_post_save<S: Store>(
    store: &S,
    session: &dyn ViewerSession,
    post_id: Uuid,
) -> Result<ToggleAck, AppError> {
    toggle::toggle(store, Relation::SavedPost, session, post_id).await
}
