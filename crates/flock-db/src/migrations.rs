use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            username     TEXT PRIMARY KEY,
            password     TEXT NOT NULL,
            email        TEXT NOT NULL UNIQUE,
            name         TEXT NOT NULL,
            birth_year   INTEGER NOT NULL,
            birth_month  INTEGER NOT NULL,
            birth_day    INTEGER NOT NULL,
            bio          TEXT,
            location     TEXT,
            website      TEXT,
            avatar       TEXT NOT NULL,
            cover_image  TEXT,
            is_verified  INTEGER NOT NULL DEFAULT 0,
            created_at   TEXT NOT NULL,
            updated_at   TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS sessions (
            session_id   TEXT PRIMARY KEY,
            username     TEXT NOT NULL,
            expiry_date  TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS follows (
            following_user  TEXT NOT NULL,
            followed_user   TEXT NOT NULL,
            follow_date     TEXT NOT NULL,
            UNIQUE(following_user, followed_user)
        );

        CREATE INDEX IF NOT EXISTS idx_follows_followed
            ON follows(followed_user);

        CREATE TABLE IF NOT EXISTS visual_contents (
            id              TEXT PRIMARY KEY,
            content         TEXT NOT NULL,
            mime_type       TEXT NOT NULL,
            media_type      TEXT NOT NULL
                CHECK (media_type IN ('image', 'video', 'audio', 'document', 'other')),
            file_name       TEXT,
            file_size_bytes INTEGER CHECK (file_size_bytes >= 0),
            width           INTEGER CHECK (width >= 1),
            height          INTEGER CHECK (height >= 1),
            duration_sec    REAL CHECK (duration_sec >= 0),
            checksum        TEXT,
            created_at      TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS posts (
            id                 TEXT PRIMARY KEY,
            date               TEXT NOT NULL,
            username           TEXT NOT NULL,
            text_content       TEXT NOT NULL,
            visual_content_id  TEXT,
            group_id           TEXT,
            post_type          TEXT NOT NULL DEFAULT 'personal'
                CHECK (post_type IN ('personal', 'group')),
            tags               TEXT NOT NULL DEFAULT '[]',
            location_address   TEXT,
            location_lat       REAL,
            location_lng       REAL
        );

        CREATE INDEX IF NOT EXISTS idx_posts_author
            ON posts(username, date);

        CREATE INDEX IF NOT EXISTS idx_posts_group
            ON posts(group_id, date);

        CREATE TABLE IF NOT EXISTS likes (
            id          TEXT PRIMARY KEY,
            post_id     TEXT NOT NULL,
            username    TEXT NOT NULL,
            created_at  TEXT NOT NULL,
            UNIQUE(post_id, username)
        );

        CREATE INDEX IF NOT EXISTS idx_likes_post
            ON likes(post_id);

        CREATE TABLE IF NOT EXISTS user_groups (
            id           TEXT PRIMARY KEY,
            name         TEXT NOT NULL,
            description  TEXT NOT NULL,
            creator      TEXT NOT NULL,
            is_private   INTEGER NOT NULL DEFAULT 0,
            tags         TEXT NOT NULL DEFAULT '[]',
            created_at   TEXT NOT NULL,
            updated_at   TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS group_members (
            group_id   TEXT NOT NULL REFERENCES user_groups(id) ON DELETE CASCADE,
            username   TEXT NOT NULL,
            joined_at  TEXT NOT NULL,
            PRIMARY KEY (group_id, username)
        );

        CREATE INDEX IF NOT EXISTS idx_group_members_user
            ON group_members(username);
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
