use anyhow::Result;
use flock_types::models::VisualContent;

use crate::models::{MEDIA_COLUMNS, VisualContentRow, map_media};
use crate::{Database, OptionalExt, format_timestamp};

impl Database {
    pub fn insert_visual_content(&self, media: &VisualContent) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                &format!(
                    "INSERT INTO visual_contents ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                    MEDIA_COLUMNS
                ),
                rusqlite::params![
                    media.id.to_string(),
                    media.content,
                    media.mime_type,
                    media.media_type.as_str(),
                    media.file_name,
                    media.file_size_bytes.map(|n| n as i64),
                    media.width,
                    media.height,
                    media.duration_sec,
                    media.checksum,
                    format_timestamp(&media.created_at),
                ],
            )?;
            Ok(())
        })
    }

    pub fn get_visual_content(&self, id: &str) -> Result<Option<VisualContent>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM visual_contents WHERE id = ?1",
                MEDIA_COLUMNS
            ))?;
            stmt.query_row([id], map_media).optional()
        })
        .map(|row| row.map(VisualContentRow::into_model))
    }
}
