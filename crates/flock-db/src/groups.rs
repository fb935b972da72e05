use std::collections::HashMap;

use anyhow::Result;
use chrono::{DateTime, Utc};
use flock_types::api::{CreatorGroupCount, GroupMemberCount};
use flock_types::models::{Group, GroupMember};
use rusqlite::types::Value;
use rusqlite::{Connection, params_from_iter};

use crate::models::{
    GROUP_COLUMNS, GroupMemberRow, GroupRow, decode_tags, encode_tags, map_group,
    parse_timestamp, parse_uuid,
};
use crate::{Database, MAX_BATCH_PARAMS, OptionalExt, format_timestamp, like_pattern, placeholders};

/// Partial group update. `None` keeps the stored value.
#[derive(Debug, Default)]
pub struct GroupChanges {
    pub name: Option<String>,
    pub description: Option<String>,
    pub is_private: Option<bool>,
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Default)]
pub struct GroupSearch {
    pub query: String,
    pub creator: Option<String>,
    pub is_private: Option<bool>,
    pub date_from: Option<DateTime<Utc>>,
    pub date_to: Option<DateTime<Utc>>,
}

impl Database {
    /// Inserts the group row and its initial members.
    pub fn insert_group(&self, group: &Group) -> Result<()> {
        let tags = encode_tags(&group.tags)?;
        let id = group.id.to_string();

        self.with_conn_mut(|conn| {
            conn.execute(
                &format!(
                    "INSERT INTO user_groups ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                    GROUP_COLUMNS
                ),
                rusqlite::params![
                    id,
                    group.name,
                    group.description,
                    group.creator,
                    group.is_private,
                    tags,
                    format_timestamp(&group.created_at),
                    format_timestamp(&group.updated_at),
                ],
            )?;
            for member in &group.members {
                conn.execute(
                    "INSERT OR IGNORE INTO group_members (group_id, username, joined_at)
                     VALUES (?1, ?2, ?3)",
                    (&id, &member.username, format_timestamp(&member.joined_at)),
                )?;
            }
            Ok(())
        })
    }

    pub fn get_group(&self, id: &str) -> Result<Option<Group>> {
        self.with_conn(|conn| load_group(conn, id))
    }

    /// All groups, newest first.
    pub fn list_groups(&self) -> Result<Vec<Group>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM user_groups ORDER BY created_at DESC, rowid DESC",
                GROUP_COLUMNS
            );
            query_groups(conn, &sql, Vec::<Value>::new())
        })
    }

    pub fn groups_by_creator(&self, creator: &str) -> Result<Vec<Group>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM user_groups WHERE creator = ?1 ORDER BY created_at DESC, rowid DESC",
                GROUP_COLUMNS
            );
            query_groups(conn, &sql, vec![Value::Text(creator.to_string())])
        })
    }

    pub fn groups_by_member(&self, username: &str) -> Result<Vec<Group>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM user_groups
                 WHERE id IN (SELECT group_id FROM group_members WHERE username = ?1)
                 ORDER BY created_at DESC, rowid DESC",
                GROUP_COLUMNS
            );
            query_groups(conn, &sql, vec![Value::Text(username.to_string())])
        })
    }

    pub fn update_group(
        &self,
        id: &str,
        changes: &GroupChanges,
        now: DateTime<Utc>,
    ) -> Result<Option<Group>> {
        let tags = changes.tags.as_deref().map(encode_tags).transpose()?;

        self.with_conn_mut(|conn| {
            let n = conn.execute(
                "UPDATE user_groups SET
                    name        = COALESCE(?2, name),
                    description = COALESCE(?3, description),
                    is_private  = COALESCE(?4, is_private),
                    tags        = COALESCE(?5, tags),
                    updated_at  = ?6
                 WHERE id = ?1",
                rusqlite::params![
                    id,
                    changes.name,
                    changes.description,
                    changes.is_private,
                    tags,
                    format_timestamp(&now),
                ],
            )?;
            if n == 0 {
                return Ok(None);
            }
            load_group(conn, id)
        })
    }

    /// Membership rows go with the group via ON DELETE CASCADE.
    pub fn delete_group(&self, id: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let n = conn.execute("DELETE FROM user_groups WHERE id = ?1", [id])?;
            Ok(n > 0)
        })
    }

    /// Adds `username` to the group. Joining twice keeps the first
    /// membership. Returns `None` for an unknown group.
    pub fn add_member(
        &self,
        group_id: &str,
        username: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Group>> {
        self.with_conn_mut(|conn| {
            if !group_exists(conn, group_id)? {
                return Ok(None);
            }
            let ts = format_timestamp(&now);
            let added = conn.execute(
                "INSERT OR IGNORE INTO group_members (group_id, username, joined_at)
                 VALUES (?1, ?2, ?3)",
                (group_id, username, &ts),
            )?;
            if added > 0 {
                touch_group(conn, group_id, &ts)?;
            }
            load_group(conn, group_id)
        })
    }

    /// Removes `username` from the group if present. Returns `None` for an
    /// unknown group.
    pub fn remove_member(
        &self,
        group_id: &str,
        username: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Group>> {
        self.with_conn_mut(|conn| {
            if !group_exists(conn, group_id)? {
                return Ok(None);
            }
            let removed = conn.execute(
                "DELETE FROM group_members WHERE group_id = ?1 AND username = ?2",
                (group_id, username),
            )?;
            if removed > 0 {
                touch_group(conn, group_id, &format_timestamp(&now))?;
            }
            load_group(conn, group_id)
        })
    }

    /// Substring match of `query` against name, description or any tag,
    /// ANDed with the filters that are set. Newest first.
    pub fn search_groups(&self, search: &GroupSearch) -> Result<Vec<Group>> {
        let mut sql = format!(
            "SELECT {} FROM user_groups g
             WHERE (g.name LIKE ?1 ESCAPE '\\'
                OR g.description LIKE ?1 ESCAPE '\\'
                OR EXISTS (SELECT 1 FROM json_each(g.tags) t WHERE t.value LIKE ?1 ESCAPE '\\'))",
            GROUP_COLUMNS
        );
        let mut params: Vec<Value> = vec![Value::Text(like_pattern(&search.query))];

        if let Some(creator) = &search.creator {
            params.push(Value::Text(creator.clone()));
            sql.push_str(&format!(" AND g.creator = ?{}", params.len()));
        }
        if let Some(is_private) = search.is_private {
            params.push(Value::Integer(is_private as i64));
            sql.push_str(&format!(" AND g.is_private = ?{}", params.len()));
        }
        if let Some(from) = &search.date_from {
            params.push(Value::Text(format_timestamp(from)));
            sql.push_str(&format!(" AND g.created_at >= ?{}", params.len()));
        }
        if let Some(to) = &search.date_to {
            params.push(Value::Text(format_timestamp(to)));
            sql.push_str(&format!(" AND g.created_at <= ?{}", params.len()));
        }
        sql.push_str(" ORDER BY g.created_at DESC, g.rowid DESC");

        self.with_conn(|conn| query_groups(conn, &sql, params))
    }

    pub fn group_counts_by_creator(&self) -> Result<Vec<CreatorGroupCount>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT creator, COUNT(*) AS n FROM user_groups
                 GROUP BY creator ORDER BY n DESC, creator",
            )?;
            let rows = stmt
                .query_map([], |row| {
                    Ok(CreatorGroupCount {
                        creator: row.get(0)?,
                        count: row.get::<_, i64>(1)? as u64,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Member counts per group. Groups without members are left out.
    pub fn member_counts(&self) -> Result<Vec<GroupMemberCount>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT g.id, g.name, COUNT(m.username) AS n
                 FROM user_groups g
                 JOIN group_members m ON m.group_id = g.id
                 GROUP BY g.id ORDER BY n DESC, g.name",
            )?;
            let rows = stmt
                .query_map([], |row| {
                    Ok(GroupMemberCount {
                        group_id: row.get(0)?,
                        name: row.get(1)?,
                        member_count: row.get::<_, i64>(2)? as u64,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

fn group_exists(conn: &Connection, id: &str) -> Result<bool> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM user_groups WHERE id = ?1)",
        [id],
        |row| row.get(0),
    )?;
    Ok(exists)
}

fn touch_group(conn: &Connection, id: &str, ts: &str) -> Result<()> {
    conn.execute(
        "UPDATE user_groups SET updated_at = ?2 WHERE id = ?1",
        (id, ts),
    )?;
    Ok(())
}

fn load_group(conn: &Connection, id: &str) -> Result<Option<Group>> {
    let row = {
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM user_groups WHERE id = ?1",
            GROUP_COLUMNS
        ))?;
        stmt.query_row([id], map_group).optional()?
    };

    match row {
        Some(row) => Ok(hydrate(conn, vec![row])?.pop()),
        None => Ok(None),
    }
}

fn query_groups(conn: &Connection, sql: &str, params: Vec<Value>) -> Result<Vec<Group>> {
    let rows = {
        let mut stmt = conn.prepare(sql)?;
        stmt.query_map(params_from_iter(params.iter()), map_group)?
            .collect::<std::result::Result<Vec<_>, _>>()?
    };
    hydrate(conn, rows)
}

/// Attaches members and post ids to group rows. Ids are bound in chunks of
/// `MAX_BATCH_PARAMS`, so a listing of any size stays under SQLite's
/// parameter limit while costing two queries per chunk.
fn hydrate(conn: &Connection, rows: Vec<GroupRow>) -> Result<Vec<Group>> {
    if rows.is_empty() {
        return Ok(vec![]);
    }

    let ids: Vec<&str> = rows.iter().map(|r| r.id.as_str()).collect();
    let mut members: HashMap<String, Vec<GroupMember>> = HashMap::new();
    let mut posts: HashMap<String, Vec<String>> = HashMap::new();

    for chunk in ids.chunks(MAX_BATCH_PARAMS) {
        let marks = placeholders(1, chunk.len());

        let mut stmt = conn.prepare(&format!(
            "SELECT group_id, username, joined_at FROM group_members
             WHERE group_id IN ({}) ORDER BY joined_at, rowid",
            marks
        ))?;
        let member_rows = stmt
            .query_map(params_from_iter(chunk.iter()), |row| {
                Ok(GroupMemberRow {
                    group_id: row.get(0)?,
                    username: row.get(1)?,
                    joined_at: row.get(2)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        for row in member_rows {
            members
                .entry(row.group_id.clone())
                .or_default()
                .push(row.into_model());
        }

        let mut stmt = conn.prepare(&format!(
            "SELECT group_id, id FROM posts WHERE group_id IN ({}) ORDER BY date, rowid",
            marks
        ))?;
        let post_rows = stmt
            .query_map(params_from_iter(chunk.iter()), |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        for (group_id, post_id) in post_rows {
            posts.entry(group_id).or_default().push(post_id);
        }
    }

    Ok(rows
        .into_iter()
        .map(|row| {
            let post_ids = posts
                .remove(&row.id)
                .unwrap_or_default()
                .iter()
                .map(|raw| parse_uuid(raw, "post id", &row.id))
                .collect();
            Group {
                id: parse_uuid(&row.id, "id", "group"),
                members: members.remove(&row.id).unwrap_or_default(),
                posts: post_ids,
                tags: decode_tags(&row.tags, &row.id),
                created_at: parse_timestamp(&row.created_at, "created_at", &row.id),
                updated_at: parse_timestamp(&row.updated_at, "updated_at", &row.id),
                name: row.name,
                description: row.description,
                creator: row.creator,
                is_private: row.is_private,
            }
        })
        .collect())
}
