use axum::{
    Extension, Json,
    extract::{Path, State},
};
use chrono::Utc;
use tracing::{debug, info};
use uuid::Uuid;

use flock_types::api::{LikeRequest, MessageResponse};
use flock_types::models::Like;
use flock_types::validation::ValidationError;

use crate::auth::SessionUser;
use crate::error::ApiError;
use crate::extract::JsonBody;
use crate::state::AppState;

/// `None` when the id is present but not a UUID. Parsed ids are compared in
/// their stored hyphenated lowercase form, whatever casing the client sent.
fn parse_post_id(req: &LikeRequest) -> Result<Option<Uuid>, ApiError> {
    let post_id = req.post_id.trim();
    if post_id.is_empty() {
        return Err(ValidationError::Required("postId").into());
    }
    Ok(post_id.parse::<Uuid>().ok())
}

/// Like a post once. The post has to exist; a repeat like is a 409.
pub async fn like_post(
    State(state): State<AppState>,
    Extension(user): Extension<SessionUser>,
    JsonBody(req): JsonBody<LikeRequest>,
) -> Result<Json<Like>, ApiError> {
    // Post ids are UUIDs; anything else cannot name an existing post.
    let Some(post_uuid) = parse_post_id(&req)? else {
        return Err(ApiError::not_found("Post"));
    };
    let canonical = post_uuid.to_string();
    if !state.db_call(move |db| db.post_exists(&canonical)).await? {
        return Err(ApiError::not_found("Post"));
    }

    let like = Like {
        id: Uuid::new_v4(),
        post_id: post_uuid,
        username: user.username,
        created_at: Utc::now(),
    };

    let record = like.clone();
    state
        .db_call(move |db| db.insert_like(&record))
        .await
        .map_err(|e| match e {
            ApiError::Validation(_) => ApiError::Conflict("Post already liked".into()),
            other => other,
        })?;

    info!("'{}' liked post {}", like.username, like.post_id);
    Ok(Json(like))
}

/// Removing a like that does not exist is not an error.
pub async fn unlike_post(
    State(state): State<AppState>,
    Extension(user): Extension<SessionUser>,
    JsonBody(req): JsonBody<LikeRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    if let Some(post_uuid) = parse_post_id(&req)? {
        let (id, username) = (post_uuid.to_string(), user.username.clone());
        let removed = state
            .db_call(move |db| db.delete_like(&id, &username))
            .await?;
        debug!("'{}' unliked post {} ({} removed)", user.username, post_uuid, removed);
    }

    Ok(Json(MessageResponse::new("Like removed successfully")))
}

pub async fn likes_for_post(
    State(state): State<AppState>,
    Path(post_id): Path<String>,
) -> Result<Json<Vec<Like>>, ApiError> {
    let Ok(post_uuid) = post_id.parse::<Uuid>() else {
        return Ok(Json(vec![]));
    };
    let likes = state
        .db_call(move |db| db.likes_for_post(&post_uuid.to_string()))
        .await?;
    Ok(Json(likes))
}
