use anyhow::Result;
use chrono::{DateTime, Utc};
use flock_types::models::User;
use rusqlite::Connection;
use rusqlite::types::Value;

use crate::models::{USER_COLUMNS, UserRow, map_user};
use crate::{Database, OptionalExt, format_timestamp, like_pattern};

/// Column changes for a profile update. `None` keeps the stored value.
#[derive(Debug, Default)]
pub struct UserChanges {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password_hash: Option<String>,
    pub birth_year: Option<i32>,
    pub birth_month: Option<u32>,
    pub birth_day: Option<u32>,
    pub bio: Option<String>,
    pub location: Option<String>,
    pub website: Option<String>,
    pub avatar: Option<String>,
    pub cover_image: Option<String>,
    pub is_verified: Option<bool>,
}

impl Database {
    pub fn create_user(&self, user: &User, password_hash: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                &format!(
                    "INSERT INTO users ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
                    USER_COLUMNS
                ),
                rusqlite::params![
                    user.username,
                    password_hash,
                    user.email,
                    user.name,
                    user.birth_year,
                    user.birth_month,
                    user.birth_day,
                    user.bio,
                    user.location,
                    user.website,
                    user.avatar,
                    user.cover_image,
                    user.is_verified,
                    format_timestamp(&user.created_at),
                    format_timestamp(&user.updated_at),
                ],
            )?;
            Ok(())
        })
    }

    /// Raw row including the password hash, for credential checks.
    pub fn get_user_row(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, username))
    }

    pub fn get_user(&self, username: &str) -> Result<Option<User>> {
        Ok(self.get_user_row(username)?.map(UserRow::into_model))
    }

    pub fn list_users(&self) -> Result<Vec<User>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM users ORDER BY created_at",
                USER_COLUMNS
            ))?;
            let rows = stmt
                .query_map([], map_user)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows.into_iter().map(UserRow::into_model).collect())
        })
    }

    /// Applies `changes` and returns the updated user, or `None` if no such user.
    pub fn update_user(
        &self,
        username: &str,
        changes: &UserChanges,
        now: DateTime<Utc>,
    ) -> Result<Option<User>> {
        let updated = self.with_conn_mut(|conn| {
            let n = conn.execute(
                "UPDATE users SET
                    name        = COALESCE(?2, name),
                    email       = COALESCE(?3, email),
                    password    = COALESCE(?4, password),
                    birth_year  = COALESCE(?5, birth_year),
                    birth_month = COALESCE(?6, birth_month),
                    birth_day   = COALESCE(?7, birth_day),
                    bio         = COALESCE(?8, bio),
                    location    = COALESCE(?9, location),
                    website     = COALESCE(?10, website),
                    avatar      = COALESCE(?11, avatar),
                    cover_image = COALESCE(?12, cover_image),
                    is_verified = COALESCE(?13, is_verified),
                    updated_at  = ?14
                 WHERE username = ?1",
                rusqlite::params![
                    username,
                    changes.name,
                    changes.email,
                    changes.password_hash,
                    changes.birth_year,
                    changes.birth_month,
                    changes.birth_day,
                    changes.bio,
                    changes.location,
                    changes.website,
                    changes.avatar,
                    changes.cover_image,
                    changes.is_verified,
                    format_timestamp(&now),
                ],
            )?;
            Ok(n > 0)
        })?;

        if !updated {
            return Ok(None);
        }
        self.with_conn_mut(|conn| query_user(conn, username))
            .map(|row| row.map(UserRow::into_model))
    }

    pub fn delete_user(&self, username: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let n = conn.execute("DELETE FROM users WHERE username = ?1", [username])?;
            Ok(n > 0)
        })
    }

    /// Case-insensitive substring search over username, name and bio.
    pub fn search_users(
        &self,
        query: &str,
        is_verified: Option<bool>,
        location: Option<&str>,
    ) -> Result<Vec<User>> {
        let mut sql = format!(
            "SELECT {} FROM users
             WHERE (username LIKE ?1 ESCAPE '\\'
                OR name LIKE ?1 ESCAPE '\\'
                OR bio LIKE ?1 ESCAPE '\\')",
            USER_COLUMNS
        );
        let mut params: Vec<Value> = vec![Value::Text(like_pattern(query))];

        if let Some(verified) = is_verified {
            params.push(Value::Integer(verified as i64));
            sql.push_str(&format!(" AND is_verified = ?{}", params.len()));
        }
        if let Some(location) = location {
            params.push(Value::Text(like_pattern(location)));
            sql.push_str(&format!(" AND location LIKE ?{} ESCAPE '\\'", params.len()));
        }
        sql.push_str(" ORDER BY username");

        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(rusqlite::params_from_iter(params.iter()), map_user)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows.into_iter().map(UserRow::into_model).collect())
        })
    }
}

fn query_user(conn: &Connection, username: &str) -> Result<Option<UserRow>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM users WHERE username = ?1",
        USER_COLUMNS
    ))?;

    stmt.query_row([username], map_user).optional()
}

#[cfg(test)]
mod tests {
    use super::*;
    use flock_types::models::DEFAULT_AVATAR_URL;

    fn sample_user(username: &str) -> User {
        let now = Utc::now();
        User {
            username: username.to_string(),
            email: format!("{}@example.com", username),
            name: username.to_uppercase(),
            birth_year: 1995,
            birth_month: 6,
            birth_day: 15,
            bio: Some(format!("hi, I am {}", username)),
            location: Some("Lisbon".into()),
            website: None,
            avatar: DEFAULT_AVATAR_URL.to_string(),
            cover_image: None,
            is_verified: false,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn create_and_fetch_user() {
        let db = Database::open_in_memory().unwrap();
        db.create_user(&sample_user("alice"), "hash").unwrap();

        let row = db.get_user_row("alice").unwrap().unwrap();
        assert_eq!(row.password, "hash");

        let user = db.get_user("alice").unwrap().unwrap();
        assert_eq!(user.email, "alice@example.com");
        assert!(db.get_user("nobody").unwrap().is_none());
    }

    #[test]
    fn duplicate_username_or_email_violates_constraint() {
        let db = Database::open_in_memory().unwrap();
        db.create_user(&sample_user("alice"), "hash").unwrap();

        let err = db.create_user(&sample_user("alice"), "hash").unwrap_err();
        assert!(crate::is_constraint_violation(&err));

        let mut other = sample_user("bob");
        other.email = "alice@example.com".into();
        let err = db.create_user(&other, "hash").unwrap_err();
        assert!(crate::is_constraint_violation(&err));
    }

    #[test]
    fn update_keeps_unspecified_fields() {
        let db = Database::open_in_memory().unwrap();
        db.create_user(&sample_user("alice"), "hash").unwrap();

        let changes = UserChanges {
            bio: Some("new bio".into()),
            ..Default::default()
        };
        let user = db.update_user("alice", &changes, Utc::now()).unwrap().unwrap();
        assert_eq!(user.bio.as_deref(), Some("new bio"));
        assert_eq!(user.name, "ALICE");

        assert!(db.update_user("ghost", &changes, Utc::now()).unwrap().is_none());
    }

    #[test]
    fn search_matches_case_insensitively() {
        let db = Database::open_in_memory().unwrap();
        db.create_user(&sample_user("alice"), "h").unwrap();
        db.create_user(&sample_user("bob"), "h").unwrap();

        let found = db.search_users("ALI", None, None).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].username, "alice");

        assert_eq!(db.search_users("", Some(true), None).unwrap().len(), 0);
        assert_eq!(db.search_users("", None, Some("lis")).unwrap().len(), 2);
    }

    #[test]
    fn delete_reports_missing_user() {
        let db = Database::open_in_memory().unwrap();
        db.create_user(&sample_user("alice"), "h").unwrap();
        assert!(db.delete_user("alice").unwrap());
        assert!(!db.delete_user("alice").unwrap());
    }
}
