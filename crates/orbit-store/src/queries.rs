use std::collections::{HashMap, HashSet};

use rusqlite::OptionalExtension;
use uuid::Uuid;

use orbit_types::models::{Comment, Post, Profile, Relation, Report, Space};

use crate::rows::{CommentSqlRow, PostSqlRow, ProfileSqlRow, SpaceSqlRow, parse_id};
use crate::sqlite::Database;
use crate::{CommentRecord, PostFilter, PostRecord, Store, StoreError};

/// `?N` placeholder list for an IN clause, numbered from `start`.
fn placeholders(start: usize, count: usize) -> String {
    (start..start + count)
        .map(|i| format!("?{i}"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// (table, subject column, object column) for each relation collection.
fn relation_table(relation: Relation) -> (&'static str, &'static str, &'static str) {
    match relation {
        Relation::PostLike => ("post_likes", "user_id", "post_id"),
        Relation::CommentLike => ("comment_likes", "user_id", "comment_id"),
        Relation::SavedPost => ("saved_posts", "user_id", "post_id"),
        Relation::Follow => ("follows", "follower_id", "following_id"),
        Relation::SpaceMember => ("space_members", "user_id", "space_id"),
    }
}

const POST_SELECT: &str = "SELECT p.id, p.space_id, p.author_id, p.title, p.body, p.media_url,
            p.is_hidden, p.created_at, u.username, u.avatar_url, s.name, s.slug
     FROM posts p
     LEFT JOIN profiles u ON p.author_id = u.id
     LEFT JOIN spaces s ON p.space_id = s.id";

fn post_sql_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<PostSqlRow> {
    Ok(PostSqlRow {
        id: row.get(0)?,
        space_id: row.get(1)?,
        author_id: row.get(2)?,
        title: row.get(3)?,
        body: row.get(4)?,
        media_url: row.get(5)?,
        is_hidden: row.get(6)?,
        created_at: row.get(7)?,
        author_username: row.get(8)?,
        author_avatar_url: row.get(9)?,
        space_name: row.get(10)?,
        space_slug: row.get(11)?,
    })
}

fn space_sql_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<SpaceSqlRow> {
    Ok(SpaceSqlRow {
        id: row.get(0)?,
        name: row.get(1)?,
        slug: row.get(2)?,
        description: row.get(3)?,
        banner_url: row.get(4)?,
        icon_url: row.get(5)?,
        creator_id: row.get(6)?,
        nsfw: row.get(7)?,
        created_at: row.get(8)?,
    })
}

impl Store for Database {
    // -- Posts --

    async fn insert_post(&self, post: &Post) -> Result<(), StoreError> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO posts (id, space_id, author_id, title, body, media_url, is_hidden, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                rusqlite::params![
                    post.id.to_string(),
                    post.space_id.to_string(),
                    post.author_id.to_string(),
                    post.title,
                    post.body,
                    post.media_url,
                    post.is_hidden,
                    post.created_at.to_rfc3339(),
                ],
            )?;
            Ok(())
        })
    }

    async fn select_post(&self, id: Uuid) -> Result<Option<Post>, StoreError> {
        let sql = format!("{POST_SELECT} WHERE p.id = ?1");
        let row = self.with_conn(|conn| {
            conn.query_row(&sql, [id.to_string()], post_sql_row).optional()
        })?;
        Ok(row.map(|r| r.decode().post))
    }

    async fn select_posts(
        &self,
        filter: &PostFilter,
        limit: u32,
    ) -> Result<Vec<PostRecord>, StoreError> {
        let mut sql = format!("{POST_SELECT} WHERE p.is_hidden = 0");
        let mut params: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();

        if let Some(space_id) = filter.space_id {
            params.push(Box::new(space_id.to_string()));
            sql.push_str(&format!(" AND p.space_id = ?{}", params.len()));
        }
        if let Some(author_id) = filter.author_id {
            params.push(Box::new(author_id.to_string()));
            sql.push_str(&format!(" AND p.author_id = ?{}", params.len()));
        }

        params.push(Box::new(limit));
        sql.push_str(&format!(" ORDER BY p.created_at DESC LIMIT ?{}", params.len()));

        let rows = self.with_conn(|conn| {
            let mut stmt = conn.prepare(&sql)?;
            let param_refs: Vec<&dyn rusqlite::types::ToSql> =
                params.iter().map(|p| p.as_ref()).collect();
            stmt.query_map(param_refs.as_slice(), post_sql_row)?
                .collect::<rusqlite::Result<Vec<_>>>()
        })?;

        Ok(rows.into_iter().map(PostSqlRow::decode).collect())
    }

    async fn select_posts_by_ids(&self, ids: &[Uuid]) -> Result<Vec<PostRecord>, StoreError> {
        if ids.is_empty() {
            return Ok(vec![]);
        }

        let sql = format!(
            "{POST_SELECT} WHERE p.is_hidden = 0 AND p.id IN ({})
             ORDER BY p.created_at DESC",
            placeholders(1, ids.len())
        );
        let id_strings: Vec<String> = ids.iter().map(Uuid::to_string).collect();

        let rows = self.with_conn(|conn| {
            let mut stmt = conn.prepare(&sql)?;
            let params: Vec<&dyn rusqlite::types::ToSql> = id_strings
                .iter()
                .map(|id| id as &dyn rusqlite::types::ToSql)
                .collect();
            stmt.query_map(params.as_slice(), post_sql_row)?
                .collect::<rusqlite::Result<Vec<_>>>()
        })?;

        Ok(rows.into_iter().map(PostSqlRow::decode).collect())
    }

    async fn delete_post(&self, id: Uuid) -> Result<(), StoreError> {
        self.with_conn(|conn| {
            conn.execute("DELETE FROM posts WHERE id = ?1", [id.to_string()])?;
            Ok(())
        })
    }

    // -- Comments --

    async fn insert_comment(&self, comment: &Comment) -> Result<(), StoreError> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO comments (id, post_id, author_id, parent_comment_id, body, is_hidden, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                rusqlite::params![
                    comment.id.to_string(),
                    comment.post_id.to_string(),
                    comment.author_id.to_string(),
                    comment.parent_comment_id.map(|id| id.to_string()),
                    comment.body,
                    comment.is_hidden,
                    comment.created_at.to_rfc3339(),
                ],
            )?;
            Ok(())
        })
    }

    async fn select_comment(&self, id: Uuid) -> Result<Option<Comment>, StoreError> {
        let row = self.with_conn(|conn| {
            conn.query_row(
                "SELECT c.id, c.post_id, c.author_id, c.parent_comment_id, c.body, c.is_hidden,
                        c.created_at, u.username, u.avatar_url
                 FROM comments c
                 LEFT JOIN profiles u ON c.author_id = u.id
                 WHERE c.id = ?1",
                [id.to_string()],
                comment_sql_row,
            )
            .optional()
        })?;
        Ok(row.map(|r| r.decode().comment))
    }

    async fn select_comments(&self, post_id: Uuid) -> Result<Vec<CommentRecord>, StoreError> {
        let rows = self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT c.id, c.post_id, c.author_id, c.parent_comment_id, c.body, c.is_hidden,
                        c.created_at, u.username, u.avatar_url
                 FROM comments c
                 LEFT JOIN profiles u ON c.author_id = u.id
                 WHERE c.post_id = ?1 AND c.is_hidden = 0
                 ORDER BY c.created_at ASC",
            )?;
            stmt.query_map([post_id.to_string()], comment_sql_row)?
                .collect::<rusqlite::Result<Vec<_>>>()
        })?;

        Ok(rows.into_iter().map(CommentSqlRow::decode).collect())
    }

    async fn count_comments(&self, post_ids: &[Uuid]) -> Result<HashMap<Uuid, u64>, StoreError> {
        if post_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let sql = format!(
            "SELECT post_id, COUNT(*) FROM comments
             WHERE is_hidden = 0 AND post_id IN ({})
             GROUP BY post_id",
            placeholders(1, post_ids.len())
        );
        grouped_count(self, &sql, post_ids, "comments")
    }

    async fn delete_comment(&self, id: Uuid) -> Result<(), StoreError> {
        self.with_conn(|conn| {
            conn.execute("DELETE FROM comments WHERE id = ?1", [id.to_string()])?;
            Ok(())
        })
    }

    // -- Spaces --

    async fn insert_space(&self, space: &Space) -> Result<(), StoreError> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO spaces (id, name, slug, description, banner_url, icon_url, creator_id, nsfw, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                rusqlite::params![
                    space.id.to_string(),
                    space.name,
                    space.slug,
                    space.description,
                    space.banner_url,
                    space.icon_url,
                    space.creator_id.to_string(),
                    space.nsfw,
                    space.created_at.to_rfc3339(),
                ],
            )?;
            Ok(())
        })
    }

    async fn select_space(&self, id: Uuid) -> Result<Option<Space>, StoreError> {
        let row = self.with_conn(|conn| {
            conn.query_row(
                "SELECT id, name, slug, description, banner_url, icon_url, creator_id, nsfw, created_at
                 FROM spaces WHERE id = ?1",
                [id.to_string()],
                space_sql_row,
            )
            .optional()
        })?;
        Ok(row.map(SpaceSqlRow::decode))
    }

    async fn select_spaces(&self) -> Result<Vec<Space>, StoreError> {
        let rows = self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, name, slug, description, banner_url, icon_url, creator_id, nsfw, created_at
                 FROM spaces ORDER BY created_at DESC",
            )?;
            stmt.query_map([], space_sql_row)?
                .collect::<rusqlite::Result<Vec<_>>>()
        })?;
        Ok(rows.into_iter().map(SpaceSqlRow::decode).collect())
    }

    async fn update_space(&self, space: &Space) -> Result<(), StoreError> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE spaces
                 SET name = ?2, slug = ?3, description = ?4, banner_url = ?5, icon_url = ?6, nsfw = ?7
                 WHERE id = ?1",
                rusqlite::params![
                    space.id.to_string(),
                    space.name,
                    space.slug,
                    space.description,
                    space.banner_url,
                    space.icon_url,
                    space.nsfw,
                ],
            )?;
            Ok(())
        })
    }

    async fn delete_space(&self, id: Uuid) -> Result<(), StoreError> {
        self.with_conn(|conn| {
            conn.execute("DELETE FROM spaces WHERE id = ?1", [id.to_string()])?;
            Ok(())
        })
    }

    async fn count_posts_in_spaces(
        &self,
        space_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, u64>, StoreError> {
        if space_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let sql = format!(
            "SELECT space_id, COUNT(*) FROM posts
             WHERE is_hidden = 0 AND space_id IN ({})
             GROUP BY space_id",
            placeholders(1, space_ids.len())
        );
        grouped_count(self, &sql, space_ids, "posts")
    }

    // -- Profiles --

    async fn insert_profile(&self, profile: &Profile) -> Result<(), StoreError> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO profiles (id, username, avatar_url, bio, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![
                    profile.id.to_string(),
                    profile.username,
                    profile.avatar_url,
                    profile.bio,
                    profile.created_at.to_rfc3339(),
                ],
            )?;
            Ok(())
        })
    }

    async fn select_profile(&self, id: Uuid) -> Result<Option<Profile>, StoreError> {
        let row = self.with_conn(|conn| {
            conn.query_row(
                "SELECT id, username, avatar_url, bio, created_at FROM profiles WHERE id = ?1",
                [id.to_string()],
                profile_sql_row,
            )
            .optional()
        })?;
        Ok(row.map(ProfileSqlRow::decode))
    }

    async fn select_profiles(&self, limit: u32) -> Result<Vec<Profile>, StoreError> {
        let rows = self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, username, avatar_url, bio, created_at FROM profiles
                 ORDER BY created_at DESC LIMIT ?1",
            )?;
            stmt.query_map([limit], profile_sql_row)?
                .collect::<rusqlite::Result<Vec<_>>>()
        })?;
        Ok(rows.into_iter().map(ProfileSqlRow::decode).collect())
    }

    // -- Relations --

    async fn insert_relation(
        &self,
        relation: Relation,
        subject: Uuid,
        object: Uuid,
    ) -> Result<(), StoreError> {
        let (table, subject_col, object_col) = relation_table(relation);
        let sql = format!(
            "INSERT INTO {table} ({subject_col}, {object_col}, created_at) VALUES (?1, ?2, ?3)"
        );
        self.with_conn(|conn| {
            conn.execute(
                &sql,
                rusqlite::params![
                    subject.to_string(),
                    object.to_string(),
                    chrono::Utc::now().to_rfc3339(),
                ],
            )?;
            Ok(())
        })
    }

    async fn delete_relation(
        &self,
        relation: Relation,
        subject: Uuid,
        object: Uuid,
    ) -> Result<(), StoreError> {
        let (table, subject_col, object_col) = relation_table(relation);
        let sql = format!("DELETE FROM {table} WHERE {subject_col} = ?1 AND {object_col} = ?2");
        self.with_conn(|conn| {
            conn.execute(&sql, [subject.to_string(), object.to_string()])?;
            Ok(())
        })
    }

    async fn count_relations(
        &self,
        relation: Relation,
        object_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, u64>, StoreError> {
        if object_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let (table, _, object_col) = relation_table(relation);
        let sql = format!(
            "SELECT {object_col}, COUNT(*) FROM {table}
             WHERE {object_col} IN ({})
             GROUP BY {object_col}",
            placeholders(1, object_ids.len())
        );
        grouped_count(self, &sql, object_ids, table)
    }

    async fn count_relations_by_subject(
        &self,
        relation: Relation,
        subject_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, u64>, StoreError> {
        if subject_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let (table, subject_col, _) = relation_table(relation);
        let sql = format!(
            "SELECT {subject_col}, COUNT(*) FROM {table}
             WHERE {subject_col} IN ({})
             GROUP BY {subject_col}",
            placeholders(1, subject_ids.len())
        );
        grouped_count(self, &sql, subject_ids, table)
    }

    async fn relations_of(
        &self,
        relation: Relation,
        subject: Uuid,
        object_ids: &[Uuid],
    ) -> Result<HashSet<Uuid>, StoreError> {
        if object_ids.is_empty() {
            return Ok(HashSet::new());
        }

        let (table, subject_col, object_col) = relation_table(relation);
        let sql = format!(
            "SELECT {object_col} FROM {table}
             WHERE {subject_col} = ?1 AND {object_col} IN ({})",
            placeholders(2, object_ids.len())
        );

        let mut strings = vec![subject.to_string()];
        strings.extend(object_ids.iter().map(Uuid::to_string));

        let found = self.with_conn(|conn| {
            let mut stmt = conn.prepare(&sql)?;
            let params: Vec<&dyn rusqlite::types::ToSql> = strings
                .iter()
                .map(|s| s as &dyn rusqlite::types::ToSql)
                .collect();
            stmt.query_map(params.as_slice(), |row| row.get::<_, String>(0))?
                .collect::<rusqlite::Result<Vec<_>>>()
        })?;

        Ok(found.iter().map(|raw| parse_id(raw, table)).collect())
    }

    async fn objects_of(
        &self,
        relation: Relation,
        subject: Uuid,
    ) -> Result<Vec<Uuid>, StoreError> {
        let (table, subject_col, object_col) = relation_table(relation);
        let sql = format!(
            "SELECT {object_col} FROM {table}
             WHERE {subject_col} = ?1
             ORDER BY created_at DESC"
        );

        let found = self.with_conn(|conn| {
            let mut stmt = conn.prepare(&sql)?;
            stmt.query_map([subject.to_string()], |row| row.get::<_, String>(0))?
                .collect::<rusqlite::Result<Vec<_>>>()
        })?;

        Ok(found.iter().map(|raw| parse_id(raw, table)).collect())
    }

    // -- Reports --

    async fn insert_report(&self, report: &Report) -> Result<(), StoreError> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO reports (id, target_type, target_id, reporter_id, reason, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![
                    report.id.to_string(),
                    report.target_type.as_str(),
                    report.target_id.to_string(),
                    report.reporter_id.to_string(),
                    report.reason,
                    report.created_at.to_rfc3339(),
                ],
            )?;
            Ok(())
        })
    }
}

fn comment_sql_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<CommentSqlRow> {
    Ok(CommentSqlRow {
        id: row.get(0)?,
        post_id: row.get(1)?,
        author_id: row.get(2)?,
        parent_comment_id: row.get(3)?,
        body: row.get(4)?,
        is_hidden: row.get(5)?,
        created_at: row.get(6)?,
        author_username: row.get(7)?,
        author_avatar_url: row.get(8)?,
    })
}

fn profile_sql_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ProfileSqlRow> {
    Ok(ProfileSqlRow {
        id: row.get(0)?,
        username: row.get(1)?,
        avatar_url: row.get(2)?,
        bio: row.get(3)?,
        created_at: row.get(4)?,
    })
}

/// Run a two-column (group key, COUNT) query over a batched id set.
fn grouped_count(
    db: &Database,
    sql: &str,
    ids: &[Uuid],
    table: &str,
) -> Result<HashMap<Uuid, u64>, StoreError> {
    let id_strings: Vec<String> = ids.iter().map(Uuid::to_string).collect();

    let rows = db.with_conn(|conn| {
        let mut stmt = conn.prepare(sql)?;
        let params: Vec<&dyn rusqlite::types::ToSql> = id_strings
            .iter()
            .map(|id| id as &dyn rusqlite::types::ToSql)
            .collect();
        stmt.query_map(params.as_slice(), |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?
        .collect::<rusqlite::Result<Vec<_>>>()
    })?;

    Ok(rows
        .into_iter()
        .map(|(key, count)| (parse_id(&key, table), count.max(0) as u64))
        .collect())
}
