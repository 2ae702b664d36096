use super::{ApiError, ApiResult, AppState, Caller};
use crate::comments::{CommentView, CreateCommentInput};
use crate::database::models::CommentSort;
use crate::reader::{CommentDetails, Page, PageRequest, TreeNode};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub(crate) struct ListParams {
    #[serde(default)]
    parent_id: Option<String>,
    #[serde(default)]
    page: Option<usize>,
    #[serde(default)]
    limit: Option<usize>,
    #[serde(default)]
    sort: Option<CommentSort>,
}

impl ListParams {
    fn page_request(&self, state: &AppState) -> PageRequest {
        PageRequest {
            page: self.page.unwrap_or(1),
            limit: self
                .limit
                .unwrap_or(state.config.comments.default_page_limit),
            sort: self.sort.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct GetCommentParams {
    #[serde(default)]
    include_children: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CreateCommentRequest {
    #[serde(default)]
    parent_id: Option<String>,
    content: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct EditCommentRequest {
    content: String,
}

pub(crate) async fn list_comments(
    State(state): State<AppState>,
    Path(post_id): Path<String>,
    Query(params): Query<ListParams>,
) -> ApiResult<Page<CommentView>> {
    let request = params.page_request(&state);
    let page = state
        .reader
        .list_comments(&post_id, params.parent_id.as_deref(), request)?;
    Ok(Json(page))
}

pub(crate) async fn create_comment(
    State(state): State<AppState>,
    Path(post_id): Path<String>,
    Caller(author_id): Caller,
    Json(payload): Json<CreateCommentRequest>,
) -> Result<(StatusCode, Json<CommentView>), ApiError> {
    let view = state.comments.create_comment(CreateCommentInput {
        author_id,
        post_id,
        parent_id: payload.parent_id,
        content: payload.content,
    })?;
    Ok((StatusCode::CREATED, Json(view)))
}

pub(crate) async fn get_tree(
    State(state): State<AppState>,
    Path(post_id): Path<String>,
) -> ApiResult<Vec<TreeNode>> {
    Ok(Json(state.reader.build_full_tree(&post_id)?))
}

pub(crate) async fn get_comment(
    State(state): State<AppState>,
    Path(comment_id): Path<String>,
    caller: Option<Caller>,
    Query(params): Query<GetCommentParams>,
) -> ApiResult<CommentDetails> {
    let requester = caller.map(|Caller(id)| id);
    let details =
        state
            .reader
            .get_comment(&comment_id, requester.as_deref(), params.include_children)?;
    Ok(Json(details))
}

pub(crate) async fn edit_comment(
    State(state): State<AppState>,
    Path(comment_id): Path<String>,
    Caller(requester): Caller,
    Json(payload): Json<EditCommentRequest>,
) -> ApiResult<CommentView> {
    let view = state
        .comments
        .edit_comment(&comment_id, &requester, &payload.content)?;
    Ok(Json(view))
}

pub(crate) async fn delete_comment(
    State(state): State<AppState>,
    Path(comment_id): Path<String>,
    Caller(requester): Caller,
) -> ApiResult<CommentView> {
    Ok(Json(state.comments.delete_comment(&comment_id, &requester)?))
}

pub(crate) async fn list_replies(
    State(state): State<AppState>,
    Path(comment_id): Path<String>,
    Query(params): Query<ListParams>,
) -> ApiResult<Page<CommentView>> {
    let request = params.page_request(&state);
    Ok(Json(state.reader.list_direct_replies(&comment_id, request)?))
}
