//! The store seam: everything durable sits behind the [`Store`] trait.
//!
//! The backing store only offers filtered selects, grouped counts, inserts,
//! and deletes — no joins across calls, no transactions. Inserts into the
//! relation collections are rejected with [`StoreError::UniqueViolation`]
//! when the (subject, object) pair already exists; that error being
//! distinguishable is what the toggle machinery in `orbit-app` is built on.

pub mod migrations;
pub mod queries;
mod rows;
pub mod sqlite;

use std::collections::{HashMap, HashSet};

use thiserror::Error;
use uuid::Uuid;

use orbit_types::models::{Author, Comment, Post, Profile, Relation, Report, Space, SpaceRef};

pub use sqlite::{Database, StoreConfig};

#[derive(Debug, Error)]
pub enum StoreError {
    /// A uniqueness constraint rejected the insert: the relation pair is
    /// already present, or a unique column (e.g. a space slug) is taken.
    #[error("uniqueness constraint violated")]
    UniqueViolation,
    #[error("storage backend failure: {0}")]
    Backend(#[from] anyhow::Error),
}

/// A post with its 1:1 identity references resolved inline.
#[derive(Debug, Clone)]
pub struct PostRecord {
    pub post: Post,
    pub author: Author,
    pub space: SpaceRef,
}

/// A comment with its author resolved inline.
#[derive(Debug, Clone)]
pub struct CommentRecord {
    pub comment: Comment,
    pub author: Author,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PostFilter {
    pub space_id: Option<Uuid>,
    pub author_id: Option<Uuid>,
}

#[allow(async_fn_in_trait)]
pub trait Store: Send + Sync {
    // -- Posts --

    async fn insert_post(&self, post: &Post) -> Result<(), StoreError>;
    async fn select_post(&self, id: Uuid) -> Result<Option<Post>, StoreError>;
    /// Non-hidden posts matching the filter, newest first, capped at `limit`.
    async fn select_posts(
        &self,
        filter: &PostFilter,
        limit: u32,
    ) -> Result<Vec<PostRecord>, StoreError>;
    /// Non-hidden posts from an explicit id set, newest first.
    async fn select_posts_by_ids(&self, ids: &[Uuid]) -> Result<Vec<PostRecord>, StoreError>;
    async fn delete_post(&self, id: Uuid) -> Result<(), StoreError>;

    // -- Comments --

    async fn insert_comment(&self, comment: &Comment) -> Result<(), StoreError>;
    async fn select_comment(&self, id: Uuid) -> Result<Option<Comment>, StoreError>;
    /// Non-hidden comments of a post, ascending by creation time.
    async fn select_comments(&self, post_id: Uuid) -> Result<Vec<CommentRecord>, StoreError>;
    /// Non-hidden comment count per post id.
    async fn count_comments(&self, post_ids: &[Uuid]) -> Result<HashMap<Uuid, u64>, StoreError>;
    async fn delete_comment(&self, id: Uuid) -> Result<(), StoreError>;

    // -- Spaces --

    async fn insert_space(&self, space: &Space) -> Result<(), StoreError>;
    async fn select_space(&self, id: Uuid) -> Result<Option<Space>, StoreError>;
    async fn select_spaces(&self) -> Result<Vec<Space>, StoreError>;
    /// Full-row update keyed by `space.id`.
    async fn update_space(&self, space: &Space) -> Result<(), StoreError>;
    async fn delete_space(&self, id: Uuid) -> Result<(), StoreError>;
    async fn count_posts_in_spaces(
        &self,
        space_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, u64>, StoreError>;

    // -- Profiles --

    async fn insert_profile(&self, profile: &Profile) -> Result<(), StoreError>;
    async fn select_profile(&self, id: Uuid) -> Result<Option<Profile>, StoreError>;
    async fn select_profiles(&self, limit: u32) -> Result<Vec<Profile>, StoreError>;

    // -- Relations --

    async fn insert_relation(
        &self,
        relation: Relation,
        subject: Uuid,
        object: Uuid,
    ) -> Result<(), StoreError>;
    async fn delete_relation(
        &self,
        relation: Relation,
        subject: Uuid,
        object: Uuid,
    ) -> Result<(), StoreError>;
    /// Row count per object id.
    async fn count_relations(
        &self,
        relation: Relation,
        object_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, u64>, StoreError>;
    /// Row count per subject id.
    async fn count_relations_by_subject(
        &self,
        relation: Relation,
        subject_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, u64>, StoreError>;
    /// The subset of `object_ids` the subject has a row for.
    async fn relations_of(
        &self,
        relation: Relation,
        subject: Uuid,
        object_ids: &[Uuid],
    ) -> Result<HashSet<Uuid>, StoreError>;
    /// Every object id the subject has a row for, most recent first.
    async fn objects_of(
        &self,
        relation: Relation,
        subject: Uuid,
    ) -> Result<Vec<Uuid>, StoreError>;

    // -- Reports --

    async fn insert_report(&self, report: &Report) -> Result<(), StoreError>;
}
