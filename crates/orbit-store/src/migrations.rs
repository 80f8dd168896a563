use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS profiles (
            id          TEXT PRIMARY KEY,
            username    TEXT NOT NULL UNIQUE,
            avatar_url  TEXT,
            bio         TEXT,
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS spaces (
            id          TEXT PRIMARY KEY,
            name        TEXT NOT NULL,
            slug        TEXT NOT NULL UNIQUE,
            description TEXT,
            banner_url  TEXT,
            icon_url    TEXT,
            creator_id  TEXT NOT NULL REFERENCES profiles(id),
            nsfw        INTEGER NOT NULL DEFAULT 0,
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS posts (
            id          TEXT PRIMARY KEY,
            space_id    TEXT NOT NULL REFERENCES spaces(id) ON DELETE CASCADE,
            author_id   TEXT NOT NULL REFERENCES profiles(id),
            title       TEXT NOT NULL,
            body        TEXT,
            media_url   TEXT,
            is_hidden   INTEGER NOT NULL DEFAULT 0,
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_posts_space
            ON posts(space_id, created_at);
        CREATE INDEX IF NOT EXISTS idx_posts_author
            ON posts(author_id, created_at);

        CREATE TABLE IF NOT EXISTS comments (
            id                TEXT PRIMARY KEY,
            post_id           TEXT NOT NULL REFERENCES posts(id) ON DELETE CASCADE,
            author_id         TEXT NOT NULL REFERENCES profiles(id),
            -- no FK: replies keep their parent reference after the
            -- parent row is deleted
            parent_comment_id TEXT,
            body              TEXT NOT NULL,
            is_hidden         INTEGER NOT NULL DEFAULT 0,
            created_at        TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_comments_post
            ON comments(post_id, created_at);

        CREATE TABLE IF NOT EXISTS post_likes (
            user_id     TEXT NOT NULL REFERENCES profiles(id),
            post_id     TEXT NOT NULL REFERENCES posts(id) ON DELETE CASCADE,
            created_at  TEXT NOT NULL DEFAULT (datetime('now')),
            UNIQUE(user_id, post_id)
        );

        CREATE INDEX IF NOT EXISTS idx_post_likes_post
            ON post_likes(post_id);

        CREATE TABLE IF NOT EXISTS comment_likes (
            user_id     TEXT NOT NULL REFERENCES profiles(id),
            comment_id  TEXT NOT NULL REFERENCES comments(id) ON DELETE CASCADE,
            created_at  TEXT NOT NULL DEFAULT (datetime('now')),
            UNIQUE(user_id, comment_id)
        );

        CREATE INDEX IF NOT EXISTS idx_comment_likes_comment
            ON comment_likes(comment_id);

        CREATE TABLE IF NOT EXISTS saved_posts (
            user_id     TEXT NOT NULL REFERENCES profiles(id),
            post_id     TEXT NOT NULL REFERENCES posts(id) ON DELETE CASCADE,
            created_at  TEXT NOT NULL DEFAULT (datetime('now')),
            UNIQUE(user_id, post_id)
        );

        CREATE TABLE IF NOT EXISTS follows (
            follower_id  TEXT NOT NULL REFERENCES profiles(id),
            following_id TEXT NOT NULL REFERENCES profiles(id),
            created_at   TEXT NOT NULL DEFAULT (datetime('now')),
            UNIQUE(follower_id, following_id)
        );

        CREATE INDEX IF NOT EXISTS idx_follows_following
            ON follows(following_id);

        CREATE TABLE IF NOT EXISTS space_members (
            user_id     TEXT NOT NULL REFERENCES profiles(id),
            space_id    TEXT NOT NULL REFERENCES spaces(id) ON DELETE CASCADE,
            created_at  TEXT NOT NULL DEFAULT (datetime('now')),
            UNIQUE(user_id, space_id)
        );

        CREATE INDEX IF NOT EXISTS idx_space_members_space
            ON space_members(space_id);

        CREATE TABLE IF NOT EXISTS reports (
            id           TEXT PRIMARY KEY,
            target_type  TEXT NOT NULL,
            target_id    TEXT NOT NULL,
            reporter_id  TEXT NOT NULL REFERENCES profiles(id),
            reason       TEXT NOT NULL,
            created_at   TEXT NOT NULL DEFAULT (datetime('now'))
        );
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
