use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use tracing::{debug, info};
use uuid::Uuid;

use flock_db::posts::PostSearch;
use flock_types::api::{CreatePostRequest, FeedPost, PostSearchRequest, PostStats};
use flock_types::models::{Location, Post};
use flock_types::validation::parse_date_bound;

use crate::auth::SessionUser;
use crate::error::ApiError;
use crate::extract::JsonBody;
use crate::feed::assemble_feed;
use crate::state::AppState;

/// The author is always the session user.
pub async fn create_post(
    State(state): State<AppState>,
    Extension(user): Extension<SessionUser>,
    JsonBody(req): JsonBody<CreatePostRequest>,
) -> Result<impl IntoResponse, ApiError> {
    req.validate()?;

    let post = Post {
        id: Uuid::new_v4(),
        date: Utc::now(),
        username: user.username,
        text_content: req.text_content.trim().to_string(),
        visual_content: req.visual_content,
        group_id: req.group_id,
        post_type: req.post_type.unwrap_or_default(),
        tags: req.tags.iter().map(|t| t.trim().to_string()).filter(|t| !t.is_empty()).collect(),
        location: req.location.filter(|l| !Location::is_empty(l)),
    };

    let record = post.clone();
    state.db_call(move |db| db.insert_post(&record)).await?;
    info!("Post {} created by '{}'", post.id, post.username);

    Ok((StatusCode::CREATED, Json(post)))
}

pub async fn get_feed(
    State(state): State<AppState>,
    Extension(user): Extension<SessionUser>,
) -> Result<Json<Vec<FeedPost>>, ApiError> {
    let feed = assemble_feed(&state, &user.username).await?;
    debug!("Feed for '{}': {} posts", user.username, feed.len());
    Ok(Json(feed))
}

pub async fn get_post(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Post>, ApiError> {
    state
        .db_call(move |db| db.get_post(&id))
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Post"))
}

pub async fn posts_by_user(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<Json<Vec<Post>>, ApiError> {
    let posts = state.db_call(move |db| db.posts_by_user(&username)).await?;
    Ok(Json(posts))
}

pub async fn posts_by_group(
    State(state): State<AppState>,
    Path(group_id): Path<String>,
) -> Result<Json<Vec<Post>>, ApiError> {
    let posts = state.db_call(move |db| db.posts_by_group(&group_id)).await?;
    Ok(Json(posts))
}

pub async fn search_posts(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<PostSearchRequest>,
) -> Result<Json<Vec<Post>>, ApiError> {
    let filters = req.filters;
    let search = PostSearch {
        query: req.query.trim().to_string(),
        username: filters.username,
        group_id: filters.group_id,
        post_type: filters.post_type,
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
        has_media: filters.has_media,
    };

    let posts = state.db_call(move |db| db.search_posts(&search)).await?;
    Ok(Json(posts))
}

pub async fn post_stats(State(state): State<AppState>) -> Result<Json<PostStats>, ApiError> {
    let (by_user, by_group, by_date, by_media_type) = tokio::try_join!(
        state.db_call(|db| db.post_counts_by_user()),
        state.db_call(|db| db.post_counts_by_group()),
        state.db_call(|db| db.post_counts_by_day()),
        state.db_call(|db| db.post_counts_by_media_type()),
    )?;

    Ok(Json(PostStats {
        by_user,
        by_group,
        by_date,
        by_media_type,
    }))
}
