use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Author, Comment, Post, Space, SpaceRef};

// -- View-models --
//
// Composite read-only structures assembled by the aggregation layer for
// presentation. Every derived field is explicit and has a defined default;
// none of them are ever persisted.

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostView {
    #[serde(flatten)]
    pub post: Post,
    pub author: Author,
    pub space: SpaceRef,
    /// Live cardinality of the post's like rows; 0 when the count read failed.
    pub like_count: u64,
    /// Live cardinality of the post's non-hidden comments.
    pub comment_count: u64,
    pub viewer_has_liked: bool,
    pub viewer_has_saved: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentNode {
    #[serde(flatten)]
    pub comment: Comment,
    pub author: Author,
    pub like_count: u64,
    pub viewer_has_liked: bool,
    /// Child comments in ascending creation order.
    pub replies: Vec<CommentNode>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpaceView {
    #[serde(flatten)]
    pub space: Space,
    pub member_count: u64,
    pub post_count: u64,
    pub viewer_is_member: bool,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct FollowStats {
    pub followers: u64,
    pub following: u64,
}

// -- Mutation inputs --

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NewPost {
    pub space_id: Uuid,
    pub title: String,
    pub body: Option<String>,
    pub media_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NewComment {
    pub body: String,
    pub parent_comment_id: Option<Uuid>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NewSpace {
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    #[serde(default)]
    pub nsfw: bool,
}

/// Creator-only edits. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SpaceUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub banner_url: Option<String>,
    pub icon_url: Option<String>,
    pub nsfw: Option<bool>,
}
