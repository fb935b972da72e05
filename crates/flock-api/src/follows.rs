use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use tracing::info;

use flock_types::api::{
    FollowRequest, FollowStats, FollowStatus, FollowStatusQuery, MessageResponse, UnfollowRequest,
};
use flock_types::validation::ValidationError;

use crate::auth::SessionUser;
use crate::error::ApiError;
use crate::extract::JsonBody;
use crate::state::AppState;

/// The follower is the session user.
pub async fn follow(
    State(state): State<AppState>,
    Extension(user): Extension<SessionUser>,
    JsonBody(req): JsonBody<FollowRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let followed = req.followed_user.trim().to_string();
    if followed.is_empty() {
        return Err(ValidationError::Required("followedUser").into());
    }

    let follower = user.username;
    let edge = state
        .db_call(move |db| db.create_follow(&follower, &followed, Utc::now()))
        .await?;
    info!("'{}' now follows '{}'", edge.following_user, edge.followed_user);

    Ok((StatusCode::CREATED, Json(edge)))
}

/// Removes the session user's edge. Acting for somebody else is refused.
pub async fn unfollow(
    State(state): State<AppState>,
    Extension(user): Extension<SessionUser>,
    JsonBody(req): JsonBody<UnfollowRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let followed = req.followed_user.trim().to_string();
    if followed.is_empty() {
        return Err(ValidationError::Required("followedUser").into());
    }
    if let Some(other) = req.following_user.as_deref().map(str::trim) {
        if other != user.username {
            return Err(ApiError::Forbidden(
                "Cannot unfollow on behalf of another user".into(),
            ));
        }
    }

    let follower = user.username.clone();
    let target = followed.clone();
    let removed = state
        .db_call(move |db| db.delete_follow(&follower, &target))
        .await?;
    if !removed {
        return Err(ApiError::not_found("Follow relationship"));
    }

    info!("'{}' unfollowed '{}'", user.username, followed);
    Ok(Json(MessageResponse::new("Unfollowed successfully")))
}

/// Usernames the session user follows.
pub async fn my_following(
    State(state): State<AppState>,
    Extension(user): Extension<SessionUser>,
) -> Result<Json<Vec<String>>, ApiError> {
    let names = state
        .db_call(move |db| db.following_of(&user.username))
        .await?;
    Ok(Json(names))
}

pub async fn following_of(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<Json<Vec<String>>, ApiError> {
    let names = state.db_call(move |db| db.following_of(&username)).await?;
    Ok(Json(names))
}

pub async fn followers_of(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<Json<Vec<String>>, ApiError> {
    let names = state.db_call(move |db| db.followers_of(&username)).await?;
    Ok(Json(names))
}

pub async fn follow_status(
    State(state): State<AppState>,
    Query(query): Query<FollowStatusQuery>,
) -> Result<Json<FollowStatus>, ApiError> {
    let is_following = state
        .db_call(move |db| db.is_following(&query.follower, &query.followed))
        .await?;
    Ok(Json(FollowStatus { is_following }))
}

pub async fn follow_stats(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<Json<FollowStats>, ApiError> {
    let (a, b) = (username.clone(), username.clone());
    let (following, followers) = tokio::try_join!(
        state.db_call(move |db| db.following_of(&a)),
        state.db_call(move |db| db.followers_of(&b)),
    )?;

    Ok(Json(FollowStats {
        username,
        following_count: following.len(),
        followers_count: followers.len(),
        following,
        followers,
    }))
}
