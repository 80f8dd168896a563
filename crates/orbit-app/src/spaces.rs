//! The space registry: listing, creation, membership, and creator edits.

use std::collections::{HashMap, HashSet};

use chrono::Utc;
use tracing::warn;
use uuid::Uuid;

use orbit_store::{Store, StoreError};
use orbit_types::models::{Relation, Space};
use orbit_types::views::{NewSpace, SpaceUpdate, SpaceView};

use crate::error::AppError;
use crate::session::ViewerSession;
use crate::toggle::{self, ToggleAck};

pub async fn list_spaces<S: Store>(
    store: &S,
    session: &dyn ViewerSession,
) -> Result<Vec<SpaceView>, AppError> {
    let spaces = store.select_spaces().await?;
    Ok(assemble_space_views(store, spaces, session.current_viewer()).await)
}

pub async fn get_space<S: Store>(
    store: &S,
    space_id: Uuid,
    session: &dyn ViewerSession,
) -> Result<SpaceView, AppError> {
    let space = store
        .select_space(space_id)
        .await?
        .ok_or(AppError::NotFound("space"))?;
    let mut views = assemble_space_views(store, vec![space], session.current_viewer()).await;
    Ok(views.remove(0))
}

/// Member/post counts and the viewer's joined flag, batched over the
/// listing's ids and absorbed to defaults on failure, like the feed.
async fn assemble_space_views<S: Store>(
    store: &S,
    spaces: Vec<Space>,
    viewer: Option<Uuid>,
) -> Vec<SpaceView> {
    if spaces.is_empty() {
        return vec![];
    }

    let ids: Vec<Uuid> = spaces.iter().map(|s| s.id).collect();

    let member_counts = store
        .count_relations(Relation::SpaceMember, &ids)
        .await
        .unwrap_or_else(|err| {
            warn!(error = %err, "member counts unavailable, rendering zeros");
            HashMap::new()
        });
    let post_counts = store
        .count_posts_in_spaces(&ids)
        .await
        .unwrap_or_else(|err| {
            warn!(error = %err, "post counts unavailable, rendering zeros");
            HashMap::new()
        });
    let joined = match viewer {
        Some(viewer) => store
            .relations_of(Relation::SpaceMember, viewer, &ids)
            .await
            .unwrap_or_else(|err| {
                warn!(error = %err, "viewer memberships unavailable");
                HashSet::new()
            }),
        None => HashSet::new(),
    };

    spaces
        .into_iter()
        .map(|space| {
            let id = space.id;
            SpaceView {
                member_count: member_counts.get(&id).copied().unwrap_or(0),
                post_count: post_counts.get(&id).copied().unwrap_or(0),
                viewer_is_member: joined.contains(&id),
                space,
            }
        })
        .collect()
}

fn valid_slug(slug: &str) -> bool {
    !slug.is_empty()
        && !slug.starts_with('-')
        && !slug.ends_with('-')
        && slug
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

pub async fn create_space<S: Store>(
    store: &S,
    session: &dyn ViewerSession,
    new: NewSpace,
) -> Result<Space, AppError> {
    let creator_id = session.current_viewer().ok_or(AppError::NotAuthenticated)?;
    if new.name.trim().is_empty() {
        return Err(AppError::Validation("space name cannot be empty".into()));
    }
    if !valid_slug(&new.slug) {
        return Err(AppError::Validation(
            "slug must be lowercase letters, digits and hyphens".into(),
        ));
    }

    let space = Space {
        id: Uuid::new_v4(),
        name: new.name,
        slug: new.slug,
        description: new.description,
        banner_url: None,
        icon_url: None,
        creator_id,
        nsfw: new.nsfw,
        created_at: Utc::now(),
    };

    match store.insert_space(&space).await {
        Ok(()) => {}
        Err(StoreError::UniqueViolation) => {
            return Err(AppError::Validation(format!(
                "a space with the slug '{}' already exists",
                space.slug
            )));
        }
        Err(err) => return Err(AppError::Storage(err)),
    }

    // The creator joins their own space. The pair cannot exist yet, so
    // this is a plain insert, not a toggle.
    store
        .insert_relation(Relation::SpaceMember, creator_id, space.id)
        .await?;

    Ok(space)
}

pub async fn join_space<S: Store>(
    store: &S,
    session: &dyn ViewerSession,
    space_id: Uuid,
) -> Result<ToggleAck, AppError> {
    toggle_membership(store, session, space_id).await
}

pub async fn leave_space<S: Store>(
    store: &S,
    session: &dyn ViewerSession,
    space_id: Uuid,
) -> Result<ToggleAck, AppError> {
    toggle_membership(store, session, space_id).await
}

/// Membership is a toggle: joining an already-joined space leaves it, and
/// vice versa. The next fetch tells the caller which way it went.
async fn toggle_membership<S: Store>(
    store: &S,
    session: &dyn ViewerSession,
    space_id: Uuid,
) -> Result<ToggleAck, AppError> {
    store
        .select_space(space_id)
        .await?
        .ok_or(AppError::NotFound("space"))?;
    toggle::toggle(store, Relation::SpaceMember, session, space_id).await
}

/// Creator-only edits. `None` fields are left untouched.
pub async fn update_space<S: Store>(
    store: &S,
    session: &dyn ViewerSession,
    space_id: Uuid,
    update: SpaceUpdate,
) -> Result<Space, AppError> {
    let viewer = session.current_viewer().ok_or(AppError::NotAuthenticated)?;
    let mut space = store
        .select_space(space_id)
        .await?
        .ok_or(AppError::NotFound("space"))?;
    if space.creator_id != viewer {
        return Err(AppError::Forbidden);
    }

    if let Some(name) = update.name {
        if name.trim().is_empty() {
            return Err(AppError::Validation("space name cannot be empty".into()));
        }
        space.name = name;
    }
    if let Some(description) = update.description {
        space.description = Some(description);
    }
    if let Some(banner_url) = update.banner_url {
        space.banner_url = Some(banner_url);
    }
    if let Some(icon_url) = update.icon_url {
        space.icon_url = Some(icon_url);
    }
    if let Some(nsfw) = update.nsfw {
        space.nsfw = nsfw;
    }

    store.update_space(&space).await?;
    Ok(space)
}

pub async fn delete_space<S: Store>(
    store: &S,
    session: &dyn ViewerSession,
    space_id: Uuid,
) -> Result<(), AppError> {
    let viewer = session.current_viewer().ok_or(AppError::NotAuthenticated)?;
    let space = store
        .select_space(space_id)
        .await?
        .ok_or(AppError::NotFound("space"))?;
    if space.creator_id != viewer {
        return Err(AppError::Forbidden);
    }
    store.delete_space(space_id).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::{self, FeedQuery};
    use crate::session::{Anonymous, SignedIn};
    use crate::testutil;

    #[tokio::test]
    async fn creating_a_space_auto_joins_the_creator() {
        let db = testutil::store();
        let ada = testutil::profile(&db, "ada").await;

        let space = testutil::space(&db, ada, "robotics").await;

        let view = get_space(&db, space.id, &SignedIn(ada)).await.unwrap();
        assert_eq!(view.space.slug, "robotics");
        assert_eq!(view.member_count, 1);
        assert!(view.viewer_is_member);

        let view = get_space(&db, space.id, &Anonymous).await.unwrap();
        assert_eq!(view.member_count, 1);
        assert!(!view.viewer_is_member);
    }

    #[tokio::test]
    async fn duplicate_slug_is_a_validation_error() {
        let db = testutil::store();
        let ada = testutil::profile(&db, "ada").await;
        let brin = testutil::profile(&db, "brin").await;
        testutil::space(&db, ada, "robotics").await;

        let err = create_space(
            &db,
            &SignedIn(brin),
            NewSpace {
                name: "Robotics Again".into(),
                slug: "robotics".into(),
                description: None,
                nsfw: false,
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn slugs_must_be_url_safe() {
        let db = testutil::store();
        let ada = testutil::profile(&db, "ada").await;

        for bad in ["", "Robotics", "has space", "trailing-", "-leading", "ümlaut"] {
            let err = create_space(
                &db,
                &SignedIn(ada),
                NewSpace {
                    name: "name".into(),
                    slug: bad.into(),
                    description: None,
                    nsfw: false,
                },
            )
            .await
            .unwrap_err();
            assert!(matches!(err, AppError::Validation(_)), "slug {bad:?}");
        }
    }

    #[tokio::test]
    async fn membership_toggles_through_join_and_leave() {
        let db = testutil::store();
        let ada = testutil::profile(&db, "ada").await;
        let brin = testutil::profile(&db, "brin").await;
        let space = testutil::space(&db, ada, "robotics").await;

        join_space(&db, &SignedIn(brin), space.id).await.unwrap();
        let view = get_space(&db, space.id, &SignedIn(brin)).await.unwrap();
        assert_eq!(view.member_count, 2);
        assert!(view.viewer_is_member);

        leave_space(&db, &SignedIn(brin), space.id).await.unwrap();
        let view = get_space(&db, space.id, &SignedIn(brin)).await.unwrap();
        assert_eq!(view.member_count, 1);
        assert!(!view.viewer_is_member);

        let err = join_space(&db, &SignedIn(brin), Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound("space")));
    }

    #[tokio::test]
    async fn listing_carries_counts_per_space() {
        let db = testutil::store();
        let ada = testutil::profile(&db, "ada").await;
        let brin = testutil::profile(&db, "brin").await;
        let robotics = testutil::space(&db, ada, "robotics").await;
        let baking = testutil::space(&db, brin, "baking").await;

        join_space(&db, &SignedIn(brin), robotics.id).await.unwrap();
        testutil::post(&db, ada, robotics.id, "one").await;
        testutil::post(&db, brin, robotics.id, "two").await;

        let listing = list_spaces(&db, &SignedIn(brin)).await.unwrap();
        assert_eq!(listing.len(), 2);

        let robotics_view = listing
            .iter()
            .find(|v| v.space.id == robotics.id)
            .unwrap();
        assert_eq!(robotics_view.member_count, 2);
        assert_eq!(robotics_view.post_count, 2);
        assert!(robotics_view.viewer_is_member);

        let baking_view = listing.iter().find(|v| v.space.id == baking.id).unwrap();
        assert_eq!(baking_view.member_count, 1);
        assert_eq!(baking_view.post_count, 0);
        assert!(baking_view.viewer_is_member);
    }

    #[tokio::test]
    async fn only_the_creator_edits_or_deletes() {
        let db = testutil::store();
        let ada = testutil::profile(&db, "ada").await;
        let brin = testutil::profile(&db, "brin").await;
        let space = testutil::space(&db, ada, "robotics").await;

        let err = update_space(
            &db,
            &SignedIn(brin),
            space.id,
            SpaceUpdate {
                name: Some("Taken Over".into()),
                ..SpaceUpdate::default()
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Forbidden));

        let updated = update_space(
            &db,
            &SignedIn(ada),
            space.id,
            SpaceUpdate {
                name: Some("Robotics Lab".into()),
                nsfw: Some(true),
                ..SpaceUpdate::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(updated.name, "Robotics Lab");
        assert!(updated.nsfw);
        // Untouched fields survive the update.
        assert_eq!(updated.slug, "robotics");

        let err = delete_space(&db, &SignedIn(brin), space.id).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden));
        delete_space(&db, &SignedIn(ada), space.id).await.unwrap();
        let err = get_space(&db, space.id, &Anonymous).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound("space")));
    }

    #[tokio::test]
    async fn deleting_a_space_takes_its_posts_with_it() {
        let db = testutil::store();
        let ada = testutil::profile(&db, "ada").await;
        let space = testutil::space(&db, ada, "robotics").await;
        testutil::post(&db, ada, space.id, "doomed").await;

        delete_space(&db, &SignedIn(ada), space.id).await.unwrap();

        let feed = feed::fetch_feed(&db, &FeedQuery::default(), &Anonymous)
            .await
            .unwrap();
        assert!(feed.is_empty());
    }
}
