use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use sha2::{Digest, Sha256};
use tracing::info;
use uuid::Uuid;

use flock_types::api::CreateVisualContentRequest;
use flock_types::models::VisualContent;

use crate::error::ApiError;
use crate::extract::JsonBody;
use crate::state::AppState;

/// SHA-256 of the stored content, hex encoded.
pub fn content_checksum(content: &str) -> String {
    hex::encode(Sha256::digest(content.as_bytes()))
}

pub async fn create_visual_content(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<CreateVisualContentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let media_type = req.validate()?;

    let content = req.content.trim().to_string();
    let checksum = req
        .checksum
        .filter(|c| !c.trim().is_empty())
        .unwrap_or_else(|| content_checksum(&content));

    let media = VisualContent {
        id: Uuid::new_v4(),
        content,
        mime_type: req.mime_type.trim().to_ascii_lowercase(),
        media_type,
        file_name: req.file_name,
        file_size_bytes: req.file_size_bytes,
        width: req.width,
        height: req.height,
        duration_sec: req.duration_sec,
        checksum: Some(checksum),
        created_at: Utc::now(),
    };

    let record = media.clone();
    state
        .db_call(move |db| db.insert_visual_content(&record))
        .await?;
    info!("Visual content {} stored ({})", media.id, media.mime_type);

    Ok((StatusCode::CREATED, Json(media)))
}

pub async fn get_visual_content(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<VisualContent>, ApiError> {
    state
        .db_call(move |db| db.get_visual_content(&id))
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Visual content"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checksum_is_sha256_hex() {
        assert_eq!(
            content_checksum("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
