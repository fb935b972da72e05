use anyhow::Result;
use chrono::{DateTime, Utc};
use flock_types::models::Session;

use crate::models::SessionRow;
use crate::{Database, OptionalExt, format_timestamp};

impl Database {
    pub fn create_session(
        &self,
        session_id: &str,
        username: &str,
        expiry_date: DateTime<Utc>,
    ) -> Result<Session> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO sessions (session_id, username, expiry_date) VALUES (?1, ?2, ?3)",
                (session_id, username, format_timestamp(&expiry_date)),
            )?;
            Ok(())
        })?;

        Ok(Session {
            session_id: session_id.to_string(),
            user: username.to_string(),
            expiry_date,
        })
    }

    /// Looks a session up by id. Expired sessions are returned as-is; the
    /// caller decides what expiry means.
    pub fn get_session(&self, session_id: &str) -> Result<Option<Session>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT session_id, username, expiry_date FROM sessions WHERE session_id = ?1",
                [session_id],
                |row| {
                    Ok(SessionRow {
                        session_id: row.get(0)?,
                        username: row.get(1)?,
                        expiry_date: row.get(2)?,
                    })
                },
            )
            .optional()
        })
        .map(|row| row.map(SessionRow::into_model))
    }
}
