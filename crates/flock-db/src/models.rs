//! Database row types. These map directly to SQLite rows and are converted
//! into `flock-types` models before leaving the crate.

use chrono::{DateTime, Utc};
use flock_types::models::{
    Coordinates, Follow, GroupMember, Like, Location, MediaType, Post, PostType, Session, User,
    VisualContent,
};
use rusqlite::Row;
use tracing::warn;
use uuid::Uuid;

pub(crate) const USER_COLUMNS: &str = "username, password, email, name, birth_year, birth_month, birth_day, \
     bio, location, website, avatar, cover_image, is_verified, created_at, updated_at";

pub(crate) const POST_COLUMNS: &str = "id, date, username, text_content, visual_content_id, group_id, \
     post_type, tags, location_address, location_lat, location_lng";

pub(crate) const GROUP_COLUMNS: &str =
    "id, name, description, creator, is_private, tags, created_at, updated_at";

pub(crate) const MEDIA_COLUMNS: &str = "id, content, mime_type, media_type, file_name, file_size_bytes, \
     width, height, duration_sec, checksum, created_at";

pub struct UserRow {
    pub username: String,
    pub password: String,
    pub email: String,
    pub name: String,
    pub birth_year: i32,
    pub birth_month: u32,
    pub birth_day: u32,
    pub bio: Option<String>,
    pub location: Option<String>,
    pub website: Option<String>,
    pub avatar: String,
    pub cover_image: Option<String>,
    pub is_verified: bool,
    pub created_at: String,
    pub updated_at: String,
}

pub struct SessionRow {
    pub session_id: String,
    pub username: String,
    pub expiry_date: String,
}

pub struct FollowRow {
    pub following_user: String,
    pub followed_user: String,
    pub follow_date: String,
}

pub struct PostRow {
    pub id: String,
    pub date: String,
    pub username: String,
    pub text_content: String,
    pub visual_content_id: Option<String>,
    pub group_id: Option<String>,
    pub post_type: String,
    pub tags: String,
    pub location_address: Option<String>,
    pub location_lat: Option<f64>,
    pub location_lng: Option<f64>,
}

pub struct LikeRow {
    pub id: String,
    pub post_id: String,
    pub username: String,
    pub created_at: String,
}

pub struct GroupRow {
    pub id: String,
    pub name: String,
    pub description: String,
    pub creator: String,
    pub is_private: bool,
    pub tags: String,
    pub created_at: String,
    pub updated_at: String,
}

pub struct GroupMemberRow {
    pub group_id: String,
    pub username: String,
    pub joined_at: String,
}

pub struct VisualContentRow {
    pub id: String,
    pub content: String,
    pub mime_type: String,
    pub media_type: String,
    pub file_name: Option<String>,
    pub file_size_bytes: Option<i64>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub duration_sec: Option<f64>,
    pub checksum: Option<String>,
    pub created_at: String,
}

// -- Row mappers (column order matches the *_COLUMNS constants) --

pub(crate) fn map_user(row: &Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        username: row.get(0)?,
        password: row.get(1)?,
        email: row.get(2)?,
        name: row.get(3)?,
        birth_year: row.get(4)?,
        birth_month: row.get(5)?,
        birth_day: row.get(6)?,
        bio: row.get(7)?,
        location: row.get(8)?,
        website: row.get(9)?,
        avatar: row.get(10)?,
        cover_image: row.get(11)?,
        is_verified: row.get(12)?,
        created_at: row.get(13)?,
        updated_at: row.get(14)?,
    })
}

pub(crate) fn map_post(row: &Row<'_>) -> rusqlite::Result<PostRow> {
    Ok(PostRow {
        id: row.get(0)?,
        date: row.get(1)?,
        username: row.get(2)?,
        text_content: row.get(3)?,
        visual_content_id: row.get(4)?,
        group_id: row.get(5)?,
        post_type: row.get(6)?,
        tags: row.get(7)?,
        location_address: row.get(8)?,
        location_lat: row.get(9)?,
        location_lng: row.get(10)?,
    })
}

pub(crate) fn map_like(row: &Row<'_>) -> rusqlite::Result<LikeRow> {
    Ok(LikeRow {
        id: row.get(0)?,
        post_id: row.get(1)?,
        username: row.get(2)?,
        created_at: row.get(3)?,
    })
}

pub(crate) fn map_group(row: &Row<'_>) -> rusqlite::Result<GroupRow> {
    Ok(GroupRow {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        creator: row.get(3)?,
        is_private: row.get(4)?,
        tags: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

pub(crate) fn map_media(row: &Row<'_>) -> rusqlite::Result<VisualContentRow> {
    Ok(VisualContentRow {
        id: row.get(0)?,
        content: row.get(1)?,
        mime_type: row.get(2)?,
        media_type: row.get(3)?,
        file_name: row.get(4)?,
        file_size_bytes: row.get(5)?,
        width: row.get(6)?,
        height: row.get(7)?,
        duration_sec: row.get(8)?,
        checksum: row.get(9)?,
        created_at: row.get(10)?,
    })
}

// -- Decoding helpers --
//
// Stored values are written by this crate, so a parse failure means a
// corrupt row. Log it and fall back to a default instead of failing the
// whole listing.

pub(crate) fn parse_timestamp(raw: &str, what: &str, owner: &str) -> DateTime<Utc> {
    raw.parse::<DateTime<Utc>>().unwrap_or_else(|e| {
        warn!("Corrupt {} '{}' on '{}': {}", what, raw, owner, e);
        DateTime::default()
    })
}

pub(crate) fn parse_uuid(raw: &str, what: &str, owner: &str) -> Uuid {
    raw.parse().unwrap_or_else(|e| {
        warn!("Corrupt {} '{}' on '{}': {}", what, raw, owner, e);
        Uuid::default()
    })
}

pub(crate) fn decode_tags(raw: &str, owner: &str) -> Vec<String> {
    serde_json::from_str(raw).unwrap_or_else(|e| {
        warn!("Corrupt tags '{}' on '{}': {}", raw, owner, e);
        Vec::new()
    })
}

pub(crate) fn encode_tags(tags: &[String]) -> anyhow::Result<String> {
    let trimmed: Vec<&str> = tags
        .iter()
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .collect();
    Ok(serde_json::to_string(&trimmed)?)
}

// -- Conversions --

impl UserRow {
    pub fn into_model(self) -> User {
        User {
            created_at: parse_timestamp(&self.created_at, "created_at", &self.username),
            updated_at: parse_timestamp(&self.updated_at, "updated_at", &self.username),
            username: self.username,
            email: self.email,
            name: self.name,
            birth_year: self.birth_year,
            birth_month: self.birth_month,
            birth_day: self.birth_day,
            bio: self.bio,
            location: self.location,
            website: self.website,
            avatar: self.avatar,
            cover_image: self.cover_image,
            is_verified: self.is_verified,
        }
    }
}

impl SessionRow {
    pub fn into_model(self) -> Session {
        Session {
            expiry_date: parse_timestamp(&self.expiry_date, "expiry_date", &self.session_id),
            session_id: self.session_id,
            user: self.username,
        }
    }
}

impl FollowRow {
    pub fn into_model(self) -> Follow {
        Follow {
            follow_date: parse_timestamp(&self.follow_date, "follow_date", &self.following_user),
            following_user: self.following_user,
            followed_user: self.followed_user,
        }
    }
}

impl PostRow {
    pub fn into_model(self) -> Post {
        let post_type = self.post_type.parse::<PostType>().unwrap_or_else(|e| {
            warn!("Corrupt post_type on post '{}': {}", self.id, e);
            PostType::default()
        });

        let coordinates = match (self.location_lat, self.location_lng) {
            (Some(lat), Some(lng)) => Some(Coordinates { lat, lng }),
            _ => None,
        };
        let location = Location {
            address: self.location_address,
            coordinates,
        };

        Post {
            id: parse_uuid(&self.id, "id", "post"),
            date: parse_timestamp(&self.date, "date", &self.id),
            text_content: self.text_content,
            visual_content: self
                .visual_content_id
                .as_deref()
                .map(|raw| parse_uuid(raw, "visual_content_id", &self.id)),
            group_id: self
                .group_id
                .as_deref()
                .map(|raw| parse_uuid(raw, "group_id", &self.id)),
            post_type,
            tags: decode_tags(&self.tags, &self.id),
            location: (!location.is_empty()).then_some(location),
            username: self.username,
        }
    }
}

impl LikeRow {
    pub fn into_model(self) -> Like {
        Like {
            id: parse_uuid(&self.id, "id", "like"),
            post_id: parse_uuid(&self.post_id, "post_id", &self.id),
            created_at: parse_timestamp(&self.created_at, "created_at", &self.id),
            username: self.username,
        }
    }
}

impl GroupMemberRow {
    pub fn into_model(self) -> GroupMember {
        GroupMember {
            joined_at: parse_timestamp(&self.joined_at, "joined_at", &self.group_id),
            username: self.username,
        }
    }
}

impl VisualContentRow {
    pub fn into_model(self) -> VisualContent {
        let media_type = self.media_type.parse::<MediaType>().unwrap_or_else(|e| {
            warn!("Corrupt media_type on visual content '{}': {}", self.id, e);
            MediaType::Other
        });

        VisualContent {
            id: parse_uuid(&self.id, "id", "visual content"),
            created_at: parse_timestamp(&self.created_at, "created_at", &self.id),
            content: self.content,
            mime_type: self.mime_type,
            media_type,
            file_name: self.file_name,
            file_size_bytes: self.file_size_bytes.map(|n| n.max(0) as u64),
            width: self.width,
            height: self.height,
            duration_sec: self.duration_sec,
            checksum: self.checksum,
        }
    }
}
