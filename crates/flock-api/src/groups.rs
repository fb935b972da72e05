use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::{DateTime, Utc};
use tracing::info;
use uuid::Uuid;

use flock_db::groups::{GroupChanges, GroupSearch};
use flock_types::api::{
    CreateGroupRequest, GroupSearchRequest, GroupStats, MembershipRequest, MessageResponse,
    UpdateGroupRequest,
};
use flock_types::models::{Group, GroupMember};
use flock_types::validation::{ValidationError, parse_date_bound};

use crate::error::ApiError;
use crate::extract::JsonBody;
use crate::state::AppState;

/// Members listed in the request join in the order given, each username
/// once. The creator is always a member and joins first when not listed.
fn initial_members(
    req: &CreateGroupRequest,
    creator: &str,
    now: DateTime<Utc>,
) -> Vec<GroupMember> {
    let mut members: Vec<GroupMember> = Vec::with_capacity(req.members.len() + 1);
    for listed in &req.members {
        let username = listed.username.trim();
        if members.iter().any(|m| m.username == username) {
            continue;
        }
        members.push(GroupMember {
            username: username.to_string(),
            joined_at: listed.joined_at.unwrap_or(now),
        });
    }
    if !members.iter().any(|m| m.username == creator) {
        members.insert(
            0,
            GroupMember {
                username: creator.to_string(),
                joined_at: now,
            },
        );
    }
    members
}

pub async fn create_group(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<CreateGroupRequest>,
) -> Result<impl IntoResponse, ApiError> {
    req.validate()?;

    let now = Utc::now();
    let creator = req.creator.trim().to_string();
    let group = Group {
        id: Uuid::new_v4(),
        name: req.name.trim().to_string(),
        description: req.description.trim().to_string(),
        members: initial_members(&req, &creator, now),
        creator,
        posts: vec![],
        is_private: req.is_private,
        tags: req.tags.iter().map(|t| t.trim().to_string()).filter(|t| !t.is_empty()).collect(),
        created_at: now,
        updated_at: now,
    };

    let record = group.clone();
    state.db_call(move |db| db.insert_group(&record)).await?;
    info!("Group '{}' ({}) created by '{}'", group.name, group.id, group.creator);

    Ok((StatusCode::CREATED, Json(group)))
}

pub async fn list_groups(State(state): State<AppState>) -> Result<Json<Vec<Group>>, ApiError> {
    let groups = state.db_call(|db| db.list_groups()).await?;
    Ok(Json(groups))
}

pub async fn get_group(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Group>, ApiError> {
    state
        .db_call(move |db| db.get_group(&id))
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Group"))
}

pub async fn update_group(
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonBody(req): JsonBody<UpdateGroupRequest>,
) -> Result<Json<Group>, ApiError> {
    req.validate()?;

    let changes = GroupChanges {
        name: req.name.map(|s| s.trim().to_string()),
        description: req.description.map(|s| s.trim().to_string()),
        is_private: req.is_private,
        tags: req.tags,
    };

    state
        .db_call(move |db| db.update_group(&id, &changes, Utc::now()))
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Group"))
}

pub async fn delete_group(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let target = id.clone();
    if !state.db_call(move |db| db.delete_group(&target)).await? {
        return Err(ApiError::not_found("Group"));
    }

    info!("Group {} deleted", id);
    Ok(Json(MessageResponse::new("Group deleted successfully")))
}

fn membership(req: MembershipRequest) -> Result<(String, String), ApiError> {
    let group_id = req.group_id.trim().to_string();
    let username = req.username.trim().to_string();
    if group_id.is_empty() {
        return Err(ValidationError::Required("groupId").into());
    }
    if username.is_empty() {
        return Err(ValidationError::Required("username").into());
    }
    Ok((group_id, username))
}

/// Joining is idempotent: a second join keeps the first membership.
pub async fn join_group(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<MembershipRequest>,
) -> Result<Json<Group>, ApiError> {
    let (group_id, username) = membership(req)?;
    let who = username.clone();
    let group = state
        .db_call(move |db| db.add_member(&group_id, &who, Utc::now()))
        .await?
        .ok_or_else(|| ApiError::not_found("Group"))?;

    info!("'{}' joined group {}", username, group.id);
    Ok(Json(group))
}

pub async fn leave_group(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<MembershipRequest>,
) -> Result<Json<Group>, ApiError> {
    let (group_id, username) = membership(req)?;
    let who = username.clone();
    let group = state
        .db_call(move |db| db.remove_member(&group_id, &who, Utc::now()))
        .await?
        .ok_or_else(|| ApiError::not_found("Group"))?;

    info!("'{}' left group {}", username, group.id);
    Ok(Json(group))
}

pub async fn search_groups(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<GroupSearchRequest>,
) -> Result<Json<Vec<Group>>, ApiError> {
    let filters = req.filters;
    let search = GroupSearch {
        query: req.query.trim().to_string(),
        creator: filters.creator,
        is_private: filters.is_private,
        date_from: filters
            .date_from
            .as_deref()
            .map(|raw| parse_date_bound("dateFrom", raw))
            .transpose()?,
        date_to: filters
            .date_to
            .as_deref()
            .map(|raw| parse_date_bound("dateTo", raw))
            .transpose()?,
    };

    let groups = state.db_call(move |db| db.search_groups(&search)).await?;
    Ok(Json(groups))
}

pub async fn groups_by_creator(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<Json<Vec<Group>>, ApiError> {
    let groups = state.db_call(move |db| db.groups_by_creator(&username)).await?;
    Ok(Json(groups))
}

pub async fn groups_by_member(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<Json<Vec<Group>>, ApiError> {
    let groups = state.db_call(move |db| db.groups_by_member(&username)).await?;
    Ok(Json(groups))
}

pub async fn group_stats(State(state): State<AppState>) -> Result<Json<GroupStats>, ApiError> {
    let (creator_stats, member_stats) = tokio::try_join!(
        state.db_call(|db| db.group_counts_by_creator()),
        state.db_call(|db| db.member_counts()),
    )?;

    Ok(Json(GroupStats {
        creator_stats,
        member_stats,
    }))
}
