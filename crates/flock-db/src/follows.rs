use anyhow::Result;
use chrono::{DateTime, Utc};
use flock_types::models::Follow;
use rusqlite::Connection;

use crate::models::FollowRow;
use crate::{Database, format_timestamp};

impl Database {
    /// Inserts the edge `follower -> followed`. A repeated pair fails with a
    /// UNIQUE constraint violation.
    pub fn create_follow(
        &self,
        follower: &str,
        followed: &str,
        now: DateTime<Utc>,
    ) -> Result<Follow> {
        let row = FollowRow {
            following_user: follower.to_string(),
            followed_user: followed.to_string(),
            follow_date: format_timestamp(&now),
        };

        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO follows (following_user, followed_user, follow_date) VALUES (?1, ?2, ?3)",
                (&row.following_user, &row.followed_user, &row.follow_date),
            )?;
            Ok(())
        })?;

        Ok(row.into_model())
    }

    /// Returns false when there was no such edge.
    pub fn delete_follow(&self, follower: &str, followed: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let n = conn.execute(
                "DELETE FROM follows WHERE following_user = ?1 AND followed_user = ?2",
                (follower, followed),
            )?;
            Ok(n > 0)
        })
    }

    /// Usernames `username` follows.
    pub fn following_of(&self, username: &str) -> Result<Vec<String>> {
        self.with_conn(|conn| {
            query_usernames(
                conn,
                "SELECT followed_user FROM follows WHERE following_user = ?1 ORDER BY follow_date, rowid",
                username,
            )
        })
    }

    /// Usernames following `username`.
    pub fn followers_of(&self, username: &str) -> Result<Vec<String>> {
        self.with_conn(|conn| {
            query_usernames(
                conn,
                "SELECT following_user FROM follows WHERE followed_user = ?1 ORDER BY follow_date, rowid",
                username,
            )
        })
    }

    pub fn is_following(&self, follower: &str, followed: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let exists: bool = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM follows WHERE following_user = ?1 AND followed_user = ?2)",
                (follower, followed),
                |row| row.get(0),
            )?;
            Ok(exists)
        })
    }
}

fn query_usernames(conn: &Connection, sql: &str, username: &str) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(sql)?;
    let names = stmt
        .query_map([username], |row| row.get::<_, String>(0))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(names)
}
