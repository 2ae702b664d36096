use super::{ApiResult, AppState, Caller};
use crate::votes::{VoteTally, VoteTarget};
use axum::extract::{Path, State};
use axum::Json;

pub(crate) async fn upvote_comment(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Caller(user_id): Caller,
) -> ApiResult<VoteTally> {
    Ok(Json(state.votes.upvote(&VoteTarget::comment(id), &user_id)?))
}

pub(crate) async fn downvote_comment(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Caller(user_id): Caller,
) -> ApiResult<VoteTally> {
    Ok(Json(state.votes.downvote(&VoteTarget::comment(id), &user_id)?))
}

pub(crate) async fn remove_comment_vote(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Caller(user_id): Caller,
) -> ApiResult<VoteTally> {
    Ok(Json(state.votes.remove_vote(&VoteTarget::comment(id), &user_id)?))
}

pub(crate) async fn upvote_post(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Caller(user_id): Caller,
) -> ApiResult<VoteTally> {
    Ok(Json(state.votes.upvote(&VoteTarget::post(id), &user_id)?))
}

pub(crate) async fn downvote_post(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Caller(user_id): Caller,
) -> ApiResult<VoteTally> {
    Ok(Json(state.votes.downvote(&VoteTarget::post(id), &user_id)?))
}

pub(crate) async fn remove_post_vote(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Caller(user_id): Caller,
) -> ApiResult<VoteTally> {
    Ok(Json(state.votes.remove_vote(&VoteTarget::post(id), &user_id)?))
}
