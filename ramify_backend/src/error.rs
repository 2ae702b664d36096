use thiserror::Error;

/// Failures surfaced by the comment engine.
#[derive(Debug, Error)]
pub enum CommentError {
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("{0} not found")]
    NotFound(String),
    #[error("invalid state: {0}")]
    InvalidState(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("forbidden: {0}")]
    Forbidden(String),
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

impl CommentError {
    pub(crate) fn not_found(kind: &str, id: &str) -> Self {
        CommentError::NotFound(format!("{kind} {id}"))
    }
}

pub type CommentResult<T> = Result<T, CommentError>;
