use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Location, MediaType, Post, PostType};

// -- Users --

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    pub name: String,
    pub email: String,
    pub username: String,
    pub password: String,
    pub birth_year: i32,
    pub birth_month: u32,
    pub birth_day: u32,
    pub bio: Option<String>,
    pub location: Option<String>,
    pub website: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AuthenticateRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthenticateResponse {
    pub success: bool,
    pub message: String,
    pub username: String,
}

/// Partial profile update. Absent fields keep their stored value.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
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

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSearchFilters {
    pub is_verified: Option<bool>,
    pub location: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UserSearchRequest {
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub filters: UserSearchFilters,
}

// -- Posts --

/// Body of `POST /api/posts`. Any `username` sent by the client is ignored;
/// the author always comes from the session.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePostRequest {
    pub text_content: String,
    pub visual_content: Option<Uuid>,
    pub group_id: Option<Uuid>,
    pub post_type: Option<PostType>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub location: Option<Location>,
}

/// A post as seen by a specific viewer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedPost {
    #[serde(flatten)]
    pub post: Post,
    pub like_count: usize,
    pub is_liked_by_user: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostSearchFilters {
    pub username: Option<String>,
    pub group_id: Option<String>,
    pub post_type: Option<PostType>,
    pub date_from: Option<String>,
    pub date_to: Option<String>,
    #[serde(default)]
    pub has_media: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct PostSearchRequest {
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub filters: PostSearchFilters,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserPostCount {
    pub username: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupPostCount {
    pub group_id: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyPostCount {
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaTypePostCount {
    /// `None` counts posts without attached media.
    pub media_type: Option<String>,
    pub count: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostStats {
    pub by_user: Vec<UserPostCount>,
    pub by_group: Vec<GroupPostCount>,
    pub by_date: Vec<DailyPostCount>,
    pub by_media_type: Vec<MediaTypePostCount>,
}

// -- Follows --

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowRequest {
    pub followed_user: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnfollowRequest {
    pub following_user: Option<String>,
    pub followed_user: String,
}

#[derive(Debug, Deserialize)]
pub struct FollowStatusQuery {
    pub follower: String,
    pub followed: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowStatus {
    pub is_following: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowStats {
    pub username: String,
    pub following_count: usize,
    pub followers_count: usize,
    pub following: Vec<String>,
    pub followers: Vec<String>,
}

// -- Likes --

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LikeRequest {
    #[serde(default)]
    pub post_id: String,
}

// -- Groups --

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateGroupRequest {
    pub name: String,
    pub description: String,
    pub creator: String,
    #[serde(default)]
    pub is_private: bool,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Initial members. The creator is added when missing.
    #[serde(default)]
    pub members: Vec<NewGroupMember>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewGroupMember {
    pub username: String,
    /// Defaults to the creation time.
    pub joined_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateGroupRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub is_private: Option<bool>,
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MembershipRequest {
    pub group_id: String,
    pub username: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupSearchFilters {
    pub creator: Option<String>,
    pub is_private: Option<bool>,
    pub date_from: Option<String>,
    pub date_to: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct GroupSearchRequest {
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub filters: GroupSearchFilters,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreatorGroupCount {
    pub creator: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupMemberCount {
    pub group_id: String,
    pub name: String,
    pub member_count: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupStats {
    pub creator_stats: Vec<CreatorGroupCount>,
    pub member_stats: Vec<GroupMemberCount>,
}

// -- Visual content --

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateVisualContentRequest {
    pub content: String,
    pub mime_type: String,
    pub media_type: Option<MediaType>,
    pub file_name: Option<String>,
    pub file_size_bytes: Option<u64>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub duration_sec: Option<f64>,
    pub checksum: Option<String>,
}

// -- Shared --

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
