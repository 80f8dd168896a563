use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub id: Uuid,
    pub username: String,
    pub avatar_url: Option<String>,
    pub bio: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A topic-scoped community. Posts live inside exactly one space.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Space {
    pub id: Uuid,
    pub name: String,
    /// URL-safe, unique across all spaces.
    pub slug: String,
    pub description: Option<String>,
    pub banner_url: Option<String>,
    pub icon_url: Option<String>,
    pub creator_id: Uuid,
    pub nsfw: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: Uuid,
    pub space_id: Uuid,
    pub author_id: Uuid,
    pub title: String,
    pub body: Option<String>,
    /// Already-uploaded media URL; uploading itself happens outside this layer.
    pub media_url: Option<String>,
    pub is_hidden: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: Uuid,
    pub post_id: Uuid,
    pub author_id: Uuid,
    /// Replies reference their parent comment. The relation is
    /// unbounded-depth; any flattening is a presentation decision.
    pub parent_comment_id: Option<Uuid>,
    pub body: String,
    pub is_hidden: bool,
    pub created_at: DateTime<Utc>,
}

/// Author identity pulled inline with posts and comments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Author {
    pub id: Uuid,
    pub username: String,
    pub avatar_url: Option<String>,
}

/// Space identity pulled inline with posts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpaceRef {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
}

/// The uniquely-keyed (subject, object) relations. A row's existence is the
/// entire state: no row means the relation is absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Relation {
    /// user likes post
    PostLike,
    /// user likes comment
    CommentLike,
    /// user saved post
    SavedPost,
    /// user follows user
    Follow,
    /// user joined space
    SpaceMember,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportTarget {
    Post,
    Comment,
    User,
    Space,
}

impl ReportTarget {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportTarget::Post => "post",
            ReportTarget::Comment => "comment",
            ReportTarget::User => "user",
            ReportTarget::Space => "space",
        }
    }
}

/// Append-only moderation report. This layer only writes them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub id: Uuid,
    pub target_type: ReportTarget,
    pub target_id: Uuid,
    pub reporter_id: Uuid,
    pub reason: String,
    pub created_at: DateTime<Utc>,
}
