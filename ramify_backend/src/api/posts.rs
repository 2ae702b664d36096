use super::{ApiError, ApiResult, AppState, Caller};
use crate::collaborators::{CreatePostInput, CreateUserInput};
use crate::database::models::{PostRecord, UserRecord};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub(crate) struct AddModeratorRequest {
    user_id: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct ModeratorResponse {
    community_id: String,
    user_id: String,
}

pub(crate) async fn create_post(
    State(state): State<AppState>,
    Caller(author_id): Caller,
    Json(payload): Json<CreatePostInput>,
) -> Result<(StatusCode, Json<PostRecord>), ApiError> {
    if payload.title.trim().is_empty() {
        return Err(ApiError::BadRequest("post title may not be empty".into()));
    }
    let post = state.directory.create_post(&author_id, payload)?;
    Ok((StatusCode::CREATED, Json(post)))
}

pub(crate) async fn get_post(
    State(state): State<AppState>,
    Path(post_id): Path<String>,
) -> ApiResult<PostRecord> {
    let post = state
        .directory
        .get_post(&post_id)?
        .ok_or_else(|| ApiError::NotFound(format!("post {post_id} not found")))?;
    Ok(Json(post))
}

pub(crate) async fn register_user(
    State(state): State<AppState>,
    Json(payload): Json<CreateUserInput>,
) -> Result<(StatusCode, Json<UserRecord>), ApiError> {
    if payload.username.trim().is_empty() {
        return Err(ApiError::BadRequest("username may not be empty".into()));
    }
    let user = state.directory.register_user(payload)?;
    Ok((StatusCode::CREATED, Json(user)))
}

pub(crate) async fn add_moderator(
    State(state): State<AppState>,
    Path(community_id): Path<String>,
    Json(payload): Json<AddModeratorRequest>,
) -> ApiResult<ModeratorResponse> {
    let user_id = payload.user_id.trim();
    if user_id.is_empty() {
        return Err(ApiError::BadRequest("user_id may not be empty".into()));
    }
    state.directory.add_moderator(&community_id, user_id)?;
    tracing::info!(community_id = %community_id, user_id = %user_id, "moderator added");
    Ok(Json(ModeratorResponse {
        community_id,
        user_id: user_id.to_string(),
    }))
}
