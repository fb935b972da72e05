use anyhow::Result;
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use flock_types::api::{DailyPostCount, GroupPostCount, MediaTypePostCount, UserPostCount};
use flock_types::models::{Post, PostType};
use rusqlite::types::Value;
use rusqlite::{Connection, params_from_iter};
use tracing::warn;

use crate::models::{POST_COLUMNS, PostRow, encode_tags, map_post};
use crate::{Database, OptionalExt, format_timestamp, like_pattern};

/// Resolved post search: substring `query` over text or tags, ANDed with
/// every filter that is set.
#[derive(Debug, Default)]
pub struct PostSearch {
    pub query: String,
    pub username: Option<String>,
    pub group_id: Option<String>,
    pub post_type: Option<PostType>,
    pub date_from: Option<DateTime<Utc>>,
    pub date_to: Option<DateTime<Utc>>,
    pub has_media: bool,
}

impl Database {
    pub fn insert_post(&self, post: &Post) -> Result<()> {
        let tags = encode_tags(&post.tags)?;
        let address = post.location.as_ref().and_then(|l| l.address.clone());
        let coordinates = post.location.as_ref().and_then(|l| l.coordinates);

        self.with_conn_mut(|conn| {
            conn.execute(
                &format!(
                    "INSERT INTO posts ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                    POST_COLUMNS
                ),
                rusqlite::params![
                    post.id.to_string(),
                    format_timestamp(&post.date),
                    post.username,
                    post.text_content,
                    post.visual_content.map(|id| id.to_string()),
                    post.group_id.map(|id| id.to_string()),
                    post.post_type.as_str(),
                    tags,
                    address,
                    coordinates.map(|c| c.lat),
                    coordinates.map(|c| c.lng),
                ],
            )?;
            Ok(())
        })
    }

    pub fn get_post(&self, id: &str) -> Result<Option<Post>> {
        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare(&format!("SELECT {} FROM posts WHERE id = ?1", POST_COLUMNS))?;
            stmt.query_row([id], map_post).optional()
        })
        .map(|row| row.map(PostRow::into_model))
    }

    pub fn post_exists(&self, id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let exists: bool = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM posts WHERE id = ?1)",
                [id],
                |row| row.get(0),
            )?;
            Ok(exists)
        })
    }

    /// The feed of `viewer`: their own posts plus those of everyone they
    /// follow, newest first. The follow set stays inside SQLite, so the
    /// query binds one parameter however large the graph grows.
    pub fn feed_posts(&self, viewer: &str) -> Result<Vec<Post>> {
        let sql = format!(
            "SELECT {} FROM posts
             WHERE username = ?1
                OR username IN (SELECT followed_user FROM follows WHERE following_user = ?1)
             ORDER BY date DESC, rowid DESC",
            POST_COLUMNS
        );
        self.with_conn(|conn| query_posts(conn, &sql, [viewer]))
    }

    pub fn posts_by_user(&self, username: &str) -> Result<Vec<Post>> {
        let sql = format!(
            "SELECT {} FROM posts WHERE username = ?1 ORDER BY date DESC, rowid DESC",
            POST_COLUMNS
        );
        self.with_conn(|conn| query_posts(conn, &sql, [username]))
    }

    pub fn posts_by_group(&self, group_id: &str) -> Result<Vec<Post>> {
        let sql = format!(
            "SELECT {} FROM posts WHERE group_id = ?1 ORDER BY date DESC, rowid DESC",
            POST_COLUMNS
        );
        self.with_conn(|conn| query_posts(conn, &sql, [group_id]))
    }

    pub fn search_posts(&self, search: &PostSearch) -> Result<Vec<Post>> {
        let mut sql = format!(
            "SELECT {} FROM posts p
             WHERE (p.text_content LIKE ?1 ESCAPE '\\'
                OR EXISTS (SELECT 1 FROM json_each(p.tags) t WHERE t.value LIKE ?1 ESCAPE '\\'))",
            POST_COLUMNS
        );
        let mut params: Vec<Value> = vec![Value::Text(like_pattern(&search.query))];

        if let Some(username) = &search.username {
            params.push(Value::Text(username.clone()));
            sql.push_str(&format!(" AND p.username = ?{}", params.len()));
        }
        if let Some(group_id) = &search.group_id {
            params.push(Value::Text(group_id.clone()));
            sql.push_str(&format!(" AND p.group_id = ?{}", params.len()));
        }
        if let Some(post_type) = search.post_type {
            params.push(Value::Text(post_type.as_str().to_string()));
            sql.push_str(&format!(" AND p.post_type = ?{}", params.len()));
        }
        if let Some(from) = &search.date_from {
            params.push(Value::Text(format_timestamp(from)));
            sql.push_str(&format!(" AND p.date >= ?{}", params.len()));
        }
        if let Some(to) = &search.date_to {
            params.push(Value::Text(format_timestamp(to)));
            sql.push_str(&format!(" AND p.date <= ?{}", params.len()));
        }
        if search.has_media {
            sql.push_str(" AND p.visual_content_id IS NOT NULL");
        }
        sql.push_str(" ORDER BY p.date DESC, p.rowid DESC");

        self.with_conn(|conn| query_posts(conn, &sql, params.iter()))
    }

    // -- Statistics --

    pub fn post_counts_by_user(&self) -> Result<Vec<UserPostCount>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT username, COUNT(*) AS n FROM posts
                 GROUP BY username ORDER BY n DESC, username",
            )?;
            let rows = stmt
                .query_map([], |row| {
                    Ok(UserPostCount {
                        username: row.get(0)?,
                        count: row.get::<_, i64>(1)? as u64,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn post_counts_by_group(&self) -> Result<Vec<GroupPostCount>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT group_id, COUNT(*) AS n FROM posts
                 WHERE group_id IS NOT NULL
                 GROUP BY group_id ORDER BY n DESC, group_id",
            )?;
            let rows = stmt
                .query_map([], |row| {
                    Ok(GroupPostCount {
                        group_id: row.get(0)?,
                        count: row.get::<_, i64>(1)? as u64,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Posts per UTC calendar day, newest day first.
    pub fn post_counts_by_day(&self) -> Result<Vec<DailyPostCount>> {
        let days: Vec<(String, i64)> = self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT substr(date, 1, 10) AS day, COUNT(*) FROM posts
                 GROUP BY day ORDER BY day DESC",
            )?;
            let rows = stmt
                .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })?;

        Ok(days
            .into_iter()
            .filter_map(|(day, count)| {
                match NaiveDate::parse_from_str(&day, "%Y-%m-%d") {
                    Ok(date) => Some(DailyPostCount {
                        year: date.year(),
                        month: date.month(),
                        day: date.day(),
                        count: count as u64,
                    }),
                    Err(e) => {
                        warn!("Skipping corrupt post date bucket '{}': {}", day, e);
                        None
                    }
                }
            })
            .collect())
    }

    /// Posts per attached media category. Posts without media (or pointing
    /// at missing media) are counted under `None`.
    pub fn post_counts_by_media_type(&self) -> Result<Vec<MediaTypePostCount>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT v.media_type, COUNT(*) AS n FROM posts p
                 LEFT JOIN visual_contents v ON v.id = p.visual_content_id
                 GROUP BY v.media_type ORDER BY n DESC",
            )?;
            let rows = stmt
                .query_map([], |row| {
                    Ok(MediaTypePostCount {
                        media_type: row.get(0)?,
                        count: row.get::<_, i64>(1)? as u64,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

fn query_posts<P>(conn: &Connection, sql: &str, params: P) -> Result<Vec<Post>>
where
    P: IntoIterator,
    P::Item: rusqlite::ToSql,
{
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params_from_iter(params), map_post)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows.into_iter().map(PostRow::into_model).collect())
}
