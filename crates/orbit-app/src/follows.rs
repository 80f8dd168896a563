//! The follow graph between profiles.

use std::collections::HashSet;

use uuid::Uuid;

use orbit_store::Store;
use orbit_types::models::{Profile, Relation};
use orbit_types::views::FollowStats;

use crate::error::AppError;
use crate::session::ViewerSession;
use crate::toggle::{self, ToggleAck};

/// Follow or unfollow a profile. Following yourself is rejected here —
/// the toggle engine itself is relation-agnostic.
pub async fn toggle_follow<S: Store>(
    store: &S,
    session: &dyn ViewerSession,
    target: Uuid,
) -> Result<ToggleAck, AppError> {
    let viewer = session.current_viewer().ok_or(AppError::NotAuthenticated)?;
    if viewer == target {
        return Err(AppError::Validation("you cannot follow yourself".into()));
    }
    store
        .select_profile(target)
        .await?
        .ok_or(AppError::NotFound("profile"))?;
    toggle::toggle(store, Relation::Follow, session, target).await
}

pub async fn follow_stats<S: Store>(store: &S, user_id: Uuid) -> Result<FollowStats, AppError> {
    let followers = store.count_relations(Relation::Follow, &[user_id]).await?;
    let following = store
        .count_relations_by_subject(Relation::Follow, &[user_id])
        .await?;
    Ok(FollowStats {
        followers: followers.get(&user_id).copied().unwrap_or(0),
        following: following.get(&user_id).copied().unwrap_or(0),
    })
}

pub async fn is_following<S: Store>(
    store: &S,
    session: &dyn ViewerSession,
    target: Uuid,
) -> Result<bool, AppError> {
    let Some(viewer) = session.current_viewer() else {
        return Ok(false);
    };
    Ok(store
        .relations_of(Relation::Follow, viewer, &[target])
        .await?
        .contains(&target))
}

/// Profiles the viewer might follow: everyone they do not already follow,
/// themselves excluded. Anonymous viewers get no suggestions.
pub async fn follow_suggestions<S: Store>(
    store: &S,
    session: &dyn ViewerSession,
    limit: u32,
) -> Result<Vec<Profile>, AppError> {
    let Some(viewer) = session.current_viewer() else {
        return Ok(vec![]);
    };

    let following: HashSet<Uuid> = store
        .objects_of(Relation::Follow, viewer)
        .await?
        .into_iter()
        .collect();

    // Overfetch so the post-filter can still fill the page.
    let candidates = store.select_profiles(limit.saturating_mul(3)).await?;
    Ok(candidates
        .into_iter()
        .filter(|p| p.id != viewer && !following.contains(&p.id))
        .take(limit as usize)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{Anonymous, SignedIn};
    use crate::testutil;

    #[tokio::test]
    async fn following_yourself_is_rejected() {
        let db = testutil::store();
        let ada = testutil::profile(&db, "ada").await;

        let err = toggle_follow(&db, &SignedIn(ada), ada).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let stats = follow_stats(&db, ada).await.unwrap();
        assert_eq!(stats.followers, 0);
        assert_eq!(stats.following, 0);
    }

    #[tokio::test]
    async fn follow_toggles_and_counts_both_directions() {
        let db = testutil::store();
        let ada = testutil::profile(&db, "ada").await;
        let brin = testutil::profile(&db, "brin").await;

        toggle_follow(&db, &SignedIn(ada), brin).await.unwrap();
        assert!(is_following(&db, &SignedIn(ada), brin).await.unwrap());
        assert!(!is_following(&db, &SignedIn(brin), ada).await.unwrap());

        let brin_stats = follow_stats(&db, brin).await.unwrap();
        assert_eq!(brin_stats.followers, 1);
        assert_eq!(brin_stats.following, 0);
        let ada_stats = follow_stats(&db, ada).await.unwrap();
        assert_eq!(ada_stats.followers, 0);
        assert_eq!(ada_stats.following, 1);

        toggle_follow(&db, &SignedIn(ada), brin).await.unwrap();
        assert!(!is_following(&db, &SignedIn(ada), brin).await.unwrap());
        let brin_stats = follow_stats(&db, brin).await.unwrap();
        assert_eq!(brin_stats.followers, 0);
    }

    #[tokio::test]
    async fn following_a_missing_profile_is_not_found() {
        let db = testutil::store();
        let ada = testutil::profile(&db, "ada").await;

        let err = toggle_follow(&db, &SignedIn(ada), Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound("profile")));
    }

    #[tokio::test]
    async fn suggestions_exclude_self_and_already_followed() {
        let db = testutil::store();
        let ada = testutil::profile(&db, "ada").await;
        let brin = testutil::profile(&db, "brin").await;
        let cass = testutil::profile(&db, "cass").await;

        toggle_follow(&db, &SignedIn(ada), brin).await.unwrap();

        let suggestions = follow_suggestions(&db, &SignedIn(ada), 10).await.unwrap();
        let ids: Vec<Uuid> = suggestions.iter().map(|p| p.id).collect();
        assert_eq!(ids, [cass]);

        assert!(
            follow_suggestions(&db, &Anonymous, 10)
                .await
                .unwrap()
                .is_empty()
        );
    }
}
