use anyhow::Result;
use flock_types::models::Like;
use rusqlite::Connection;

use crate::models::{LikeRow, map_like};
use crate::{Database, format_timestamp};

const LIKE_COLUMNS: &str = "id, post_id, username, created_at";

impl Database {
    /// A second like by the same user on the same post fails with a UNIQUE
    /// constraint violation.
    pub fn insert_like(&self, like: &Like) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO likes (id, post_id, username, created_at) VALUES (?1, ?2, ?3, ?4)",
                (
                    like.id.to_string(),
                    like.post_id.to_string(),
                    &like.username,
                    format_timestamp(&like.created_at),
                ),
            )?;
            Ok(())
        })
    }

    /// Returns how many likes were removed (0 or 1).
    pub fn delete_like(&self, post_id: &str, username: &str) -> Result<usize> {
        self.with_conn_mut(|conn| {
            let n = conn.execute(
                "DELETE FROM likes WHERE post_id = ?1 AND username = ?2",
                (post_id, username),
            )?;
            Ok(n)
        })
    }

    /// Likes on one post, oldest first.
    pub fn likes_for_post(&self, post_id: &str) -> Result<Vec<Like>> {
        let sql = format!(
            "SELECT {} FROM likes WHERE post_id = ?1 ORDER BY created_at, rowid",
            LIKE_COLUMNS
        );
        self.with_conn(|conn| query_likes(conn, &sql, post_id))
    }

    /// Likes on every post in `viewer`'s feed (see `feed_posts`), oldest
    /// first.
    pub fn feed_likes(&self, viewer: &str) -> Result<Vec<Like>> {
        let sql = format!(
            "SELECT {} FROM likes
             WHERE post_id IN (
                SELECT id FROM posts
                WHERE username = ?1
                   OR username IN (SELECT followed_user FROM follows WHERE following_user = ?1)
             )
             ORDER BY created_at, rowid",
            LIKE_COLUMNS
        );
        self.with_conn(|conn| query_likes(conn, &sql, viewer))
    }
}

fn query_likes(conn: &Connection, sql: &str, key: &str) -> Result<Vec<Like>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map([key], map_like)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows.into_iter().map(LikeRow::into_model).collect())
}
