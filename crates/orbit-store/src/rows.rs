//! Raw SQLite row shapes and their decoding into the typed records.
//!
//! Rows come back as TEXT ids and timestamps; decoding is lenient — a
//! corrupt field is logged and replaced with a default rather than failing
//! the whole read.

use chrono::{DateTime, Utc};
use tracing::warn;
use uuid::Uuid;

use orbit_types::models::{Author, Comment, Post, Profile, Space, SpaceRef};

use crate::{CommentRecord, PostRecord};

pub(crate) struct PostSqlRow {
    pub id: String,
    pub space_id: String,
    pub author_id: String,
    pub title: String,
    pub body: Option<String>,
    pub media_url: Option<String>,
    pub is_hidden: bool,
    pub created_at: String,
    // join profiles
    pub author_username: Option<String>,
    pub author_avatar_url: Option<String>,
    // join spaces
    pub space_name: Option<String>,
    pub space_slug: Option<String>,
}

pub(crate) struct CommentSqlRow {
    pub id: String,
    pub post_id: String,
    pub author_id: String,
    pub parent_comment_id: Option<String>,
    pub body: String,
    pub is_hidden: bool,
    pub created_at: String,
    // join profiles
    pub author_username: Option<String>,
    pub author_avatar_url: Option<String>,
}

pub(crate) struct SpaceSqlRow {
    pub id: String,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub banner_url: Option<String>,
    pub icon_url: Option<String>,
    pub creator_id: String,
    pub nsfw: bool,
    pub created_at: String,
}

pub(crate) struct ProfileSqlRow {
    pub id: String,
    pub username: String,
    pub avatar_url: Option<String>,
    pub bio: Option<String>,
    pub created_at: String,
}

pub(crate) fn parse_id(raw: &str, table: &str) -> Uuid {
    raw.parse().unwrap_or_else(|e| {
        warn!("Corrupt id '{}' in {}: {}", raw, table, e);
        Uuid::default()
    })
}

pub(crate) fn parse_timestamp(raw: &str, table: &str) -> DateTime<Utc> {
    raw.parse::<DateTime<Utc>>()
        .or_else(|_| {
            // SQLite stores default timestamps as "YYYY-MM-DD HH:MM:SS"
            // without timezone. Parse as naive UTC and convert.
            chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            warn!("Corrupt created_at '{}' in {}: {}", raw, table, e);
            DateTime::default()
        })
}

impl PostSqlRow {
    pub(crate) fn decode(self) -> PostRecord {
        let author_id = parse_id(&self.author_id, "posts");
        let space_id = parse_id(&self.space_id, "posts");
        PostRecord {
            post: Post {
                id: parse_id(&self.id, "posts"),
                space_id,
                author_id,
                title: self.title,
                body: self.body,
                media_url: self.media_url,
                is_hidden: self.is_hidden,
                created_at: parse_timestamp(&self.created_at, "posts"),
            },
            author: Author {
                id: author_id,
                username: self.author_username.unwrap_or_else(|| "unknown".to_string()),
                avatar_url: self.author_avatar_url,
            },
            space: SpaceRef {
                id: space_id,
                name: self.space_name.unwrap_or_else(|| "unknown".to_string()),
                slug: self.space_slug.unwrap_or_default(),
            },
        }
    }
}

impl CommentSqlRow {
    pub(crate) fn decode(self) -> CommentRecord {
        let author_id = parse_id(&self.author_id, "comments");
        CommentRecord {
            comment: Comment {
                id: parse_id(&self.id, "comments"),
                post_id: parse_id(&self.post_id, "comments"),
                author_id,
                parent_comment_id: self
                    .parent_comment_id
                    .as_deref()
                    .map(|raw| parse_id(raw, "comments")),
                body: self.body,
                is_hidden: self.is_hidden,
                created_at: parse_timestamp(&self.created_at, "comments"),
            },
            author: Author {
                id: author_id,
                username: self.author_username.unwrap_or_else(|| "unknown".to_string()),
                avatar_url: self.author_avatar_url,
            },
        }
    }
}

impl SpaceSqlRow {
    pub(crate) fn decode(self) -> Space {
        Space {
            id: parse_id(&self.id, "spaces"),
            name: self.name,
            slug: self.slug,
            description: self.description,
            banner_url: self.banner_url,
            icon_url: self.icon_url,
            creator_id: parse_id(&self.creator_id, "spaces"),
            nsfw: self.nsfw,
            created_at: parse_timestamp(&self.created_at, "spaces"),
        }
    }
}

impl ProfileSqlRow {
    pub(crate) fn decode(self) -> Profile {
        Profile {
            id: parse_id(&self.id, "profiles"),
            username: self.username,
            avatar_url: self.avatar_url,
            bio: self.bio,
            created_at: parse_timestamp(&self.created_at, "profiles"),
        }
    }
}
