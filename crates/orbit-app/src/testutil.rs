//! Shared seeding helpers for the module tests. Everything goes through
//! the public mutation paths where one exists; profiles are seeded directly
//! because signup belongs to the external session layer.

use chrono::Utc;
use uuid::Uuid;

use orbit_store::{Database, Store};
use orbit_types::models::{Post, Profile, Space};
use orbit_types::views::{NewPost, NewSpace};

use crate::feed;
use crate::session::SignedIn;
use crate::spaces;

pub(crate) fn store() -> Database {
    Database::open_in_memory().expect("in-memory store")
}

pub(crate) async fn profile(db: &Database, username: &str) -> Uuid {
    let id = Uuid::new_v4();
    db.insert_profile(&Profile {
        id,
        username: username.to_string(),
        avatar_url: None,
        bio: None,
        created_at: Utc::now(),
    })
    .await
    .expect("seed profile");
    id
}

pub(crate) async fn space(db: &Database, creator: Uuid, slug: &str) -> Space {
    spaces::create_space(
        db,
        &SignedIn(creator),
        NewSpace {
            name: slug.to_string(),
            slug: slug.to_string(),
            description: None,
            nsfw: false,
        },
    )
    .await
    .expect("seed space")
}

pub(crate) async fn post(db: &Database, author: Uuid, space_id: Uuid, title: &str) -> Post {
    feed::create_post(
        db,
        &SignedIn(author),
        NewPost {
            space_id,
            title: title.to_string(),
            body: Some("hello".to_string()),
            media_url: None,
        },
    )
    .await
    .expect("seed post")
}
