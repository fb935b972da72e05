use axum::{
    Json,
    extract::{Path, State},
};
use chrono::Utc;
use tracing::info;

use flock_db::users::UserChanges;
use flock_types::api::{MessageResponse, UpdateUserRequest, UserSearchRequest};
use flock_types::models::User;

use crate::auth::hash_password;
use crate::error::ApiError;
use crate::extract::JsonBody;
use crate::state::AppState;

pub async fn list_users(State(state): State<AppState>) -> Result<Json<Vec<User>>, ApiError> {
    let users = state.db_call(|db| db.list_users()).await?;
    Ok(Json(users))
}

pub async fn search_users(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<UserSearchRequest>,
) -> Result<Json<Vec<User>>, ApiError> {
    let users = state
        .db_call(move |db| {
            db.search_users(
                req.query.trim(),
                req.filters.is_verified,
                req.filters.location.as_deref(),
            )
        })
        .await?;
    Ok(Json(users))
}

pub async fn get_user(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<Json<User>, ApiError> {
    state
        .db_call(move |db| db.get_user(&username))
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("User"))
}

pub async fn update_user(
    State(state): State<AppState>,
    Path(username): Path<String>,
    JsonBody(req): JsonBody<UpdateUserRequest>,
) -> Result<Json<User>, ApiError> {
    req.validate()?;

    let password_hash = req.password.as_deref().map(hash_password).transpose()?;
    let changes = UserChanges {
        name: req.name.map(|s| s.trim().to_string()),
        email: req.email.map(|s| s.trim().to_string()),
        password_hash,
        birth_year: req.birth_year,
        birth_month: req.birth_month,
        birth_day: req.birth_day,
        bio: req.bio,
        location: req.location,
        website: req.website,
        avatar: req.avatar,
        cover_image: req.cover_image,
        is_verified: req.is_verified,
    };

    let user = state
        .db_call(move |db| db.update_user(&username, &changes, Utc::now()))
        .await?
        .ok_or_else(|| ApiError::not_found("User"))?;

    info!("Profile of '{}' updated", user.username);
    Ok(Json(user))
}

pub async fn delete_user(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let name = username.clone();
    if !state.db_call(move |db| db.delete_user(&name)).await? {
        return Err(ApiError::not_found("User"));
    }

    info!("User '{}' deleted", username);
    Ok(Json(MessageResponse::new("User deleted")))
}
