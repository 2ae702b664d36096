mod comments;
mod posts;
mod votes;

use crate::error::CommentError;
use crate::node::NodeSnapshot;
use anyhow::Result;
use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Header carrying the caller's user id. Authentication happens upstream.
pub const USER_HEADER: &str = "x-user-id";

pub type AppState = NodeSnapshot;

pub(crate) type ApiResult<T> = Result<Json<T>, ApiError>;

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Forbidden(String),
    NotFound(String),
    Conflict(String),
    Unprocessable(String),
    Internal(anyhow::Error),
}

impl ApiError {
    fn into_response_parts(self) -> (StatusCode, ErrorResponse) {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            ApiError::Unprocessable(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg),
            ApiError::Internal(err) => {
                tracing::error!(error = ?err, "internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_string(),
                )
            }
        };
        (status, ErrorResponse { message })
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = self.into_response_parts();
        (status, Json(body)).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::Internal(err)
    }
}

impl From<CommentError> for ApiError {
    fn from(err: CommentError) -> Self {
        let message = err.to_string();
        match err {
            CommentError::Validation(_) => ApiError::BadRequest(message),
            CommentError::Forbidden(_) => ApiError::Forbidden(message),
            CommentError::NotFound(_) => ApiError::NotFound(message),
            CommentError::Conflict(_) => ApiError::Conflict(message),
            CommentError::InvalidState(_) => ApiError::Unprocessable(message),
            CommentError::Storage(err) => ApiError::Internal(err),
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    message: String,
}

/// Id of the user making the request, taken from [`USER_HEADER`].
#[derive(Debug, Clone)]
pub(crate) struct Caller(pub String);

#[async_trait]
impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let value = parts
            .headers
            .get(USER_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .ok_or_else(|| ApiError::BadRequest(format!("missing {USER_HEADER} header")))?;
        Ok(Caller(value.to_string()))
    }
}

#[derive(Serialize)]
pub(crate) struct HealthResponse {
    status: &'static str,
    version: &'static str,
    api_port: u16,
}

pub(crate) async fn health_handler(
    axum::extract::State(state): axum::extract::State<AppState>,
) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        api_port: state.config.api_port,
    })
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/posts", post(posts::create_post))
        .route("/posts/:id", get(posts::get_post))
        .route("/posts/:id/upvote", post(votes::upvote_post))
        .route("/posts/:id/downvote", post(votes::downvote_post))
        .route("/posts/:id/vote", axum::routing::delete(votes::remove_post_vote))
        .route(
            "/posts/:id/comments",
            get(comments::list_comments).post(comments::create_comment),
        )
        .route("/posts/:id/tree", get(comments::get_tree))
        .route(
            "/comments/:id",
            get(comments::get_comment)
                .patch(comments::edit_comment)
                .delete(comments::delete_comment),
        )
        .route("/comments/:id/replies", get(comments::list_replies))
        .route("/comments/:id/upvote", post(votes::upvote_comment))
        .route("/comments/:id/downvote", post(votes::downvote_comment))
        .route(
            "/comments/:id/vote",
            axum::routing::delete(votes::remove_comment_vote),
        )
        .route("/users", post(posts::register_user))
        .route("/communities/:id/moderators", post(posts::add_moderator))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// Tries to bind to the given port, or finds the next available port
async fn find_available_port(start_port: u16) -> Result<(TcpListener, u16)> {
    const MAX_PORT_ATTEMPTS: u16 = 100;

    for offset in 0..MAX_PORT_ATTEMPTS {
        let port = start_port.saturating_add(offset);
        let addr = SocketAddr::from(([0, 0, 0, 0], port));

        match TcpListener::bind(addr).await {
            Ok(listener) => return Ok((listener, port)),
            Err(e) => {
                if offset == 0 {
                    tracing::debug!(port, error = %e, "Port in use, trying next port");
                }
                continue;
            }
        }
    }

    anyhow::bail!(
        "Could not find available port in range {}-{}",
        start_port,
        start_port.saturating_add(MAX_PORT_ATTEMPTS - 1)
    )
}

pub async fn serve_http(state: AppState) -> Result<()> {
    let requested_port = state.config.api_port;
    let (listener, actual_port) = find_available_port(requested_port).await?;
    let addr = SocketAddr::from(([0, 0, 0, 0], actual_port));

    if actual_port != requested_port {
        tracing::warn!(
            requested_port,
            actual_port,
            "Configured port was in use, bound to next available port"
        );
    }

    tracing::info!(?addr, "HTTP server listening");
    axum::serve(listener, router(state).into_make_service()).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comment_errors_map_to_statuses() {
        let cases = [
            (CommentError::Validation("x".into()), StatusCode::BAD_REQUEST),
            (CommentError::Forbidden("x".into()), StatusCode::FORBIDDEN),
            (CommentError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (CommentError::Conflict("x".into()), StatusCode::CONFLICT),
            (
                CommentError::InvalidState("x".into()),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                CommentError::Storage(anyhow::anyhow!("disk on fire")),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, expected) in cases {
            let (status, body) = ApiError::from(err).into_response_parts();
            assert_eq!(status, expected);
            assert!(!body.message.contains("disk on fire"));
        }
    }
}
