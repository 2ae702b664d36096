use crate::collaborators::Collaborators;
use crate::config::CommentConfig;
use crate::database::models::CommentRecord;
use crate::database::repositories::CommentRepository;
use crate::database::Database;
use crate::error::{CommentError, CommentResult};
use crate::utils::{now_utc_iso, DELETED_PLACEHOLDER};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Creates, edits and tombstones comments and keeps `reply_count` in step.
#[derive(Clone)]
pub struct CommentService {
    database: Database,
    collaborators: Collaborators,
    config: CommentConfig,
}

impl CommentService {
    pub fn new(database: Database, collaborators: Collaborators, config: CommentConfig) -> Self {
        Self {
            database,
            collaborators,
            config,
        }
    }

    pub fn create_comment(&self, input: CreateCommentInput) -> CommentResult<CommentView> {
        let content = validate_content(&input.content, self.config.max_content_chars)?;
        if input.author_id.trim().is_empty() {
            return Err(CommentError::Validation("author id may not be empty".into()));
        }

        let post = self
            .collaborators
            .posts
            .find_post(&input.post_id)?
            .ok_or_else(|| CommentError::not_found("post", &input.post_id))?;
        if post.is_deleted {
            return Err(CommentError::InvalidState(format!(
                "post {} is deleted",
                post.id
            )));
        }

        let now = now_utc_iso();
        let record = CommentRecord {
            id: Uuid::new_v4().to_string(),
            post_id: input.post_id,
            parent_id: input.parent_id,
            author_id: input.author_id,
            content,
            vote_count: 0,
            reply_count: 0,
            is_deleted: false,
            is_edited: false,
            created_at: now.clone(),
            updated_at: now,
            edited_at: None,
        };

        // The parent checks, the node and its slot in the parent's child
        // list all land under one lock and one transaction.
        let outcome = self.database.with_repositories(|repos| {
            let tx = repos.conn().unchecked_transaction()?;
            let comments = repos.comments();
            if let Some(parent_id) = &record.parent_id {
                let Some(parent) = comments.get(parent_id)? else {
                    return Ok(Insert::ParentMissing);
                };
                if parent.post_id != record.post_id {
                    return Ok(Insert::ParentElsewhere(parent.post_id));
                }
                if parent.is_deleted {
                    return Ok(Insert::ParentDeleted);
                }
            }
            comments.create(&record)?;
            if let Some(parent_id) = &record.parent_id {
                comments.append_child(parent_id, &record.id)?;
            }
            tx.commit()?;
            Ok(Insert::Done)
        })?;

        let parent_id = record.parent_id.as_deref().unwrap_or_default();
        match outcome {
            Insert::Done => {}
            Insert::ParentMissing => {
                return Err(CommentError::not_found("parent comment", parent_id));
            }
            Insert::ParentElsewhere(other_post) => {
                return Err(CommentError::Conflict(format!(
                    "parent comment {parent_id} belongs to post {other_post}, not {}",
                    record.post_id
                )));
            }
            Insert::ParentDeleted => {
                return Err(CommentError::InvalidState(format!(
                    "parent comment {parent_id} is deleted"
                )));
            }
        }

        let ancestors = self.propagate_reply_count(&record);

        if let Err(err) = self
            .collaborators
            .posts
            .adjust_comment_count(&record.post_id, 1)
        {
            tracing::warn!(
                post_id = %record.post_id,
                comment_id = %record.id,
                error = ?err,
                "failed to bump post comment counter"
            );
        }

        tracing::info!(
            comment_id = %record.id,
            post_id = %record.post_id,
            parent_id = ?record.parent_id,
            ancestors,
            "comment created"
        );
        Ok(CommentView::from_record(record, Vec::new()))
    }

    pub fn edit_comment(
        &self,
        comment_id: &str,
        requester_id: &str,
        new_content: &str,
    ) -> CommentResult<CommentView> {
        let record = self.get_record(comment_id)?;
        if record.author_id != requester_id {
            return Err(CommentError::Forbidden(
                "only the author may edit a comment".into(),
            ));
        }
        if record.is_deleted {
            return Err(CommentError::InvalidState(format!(
                "comment {comment_id} is deleted"
            )));
        }
        let content = validate_content(new_content, self.config.max_content_chars)?;

        let edited_at = now_utc_iso();
        let updated = self.database.with_repositories(|repos| {
            repos
                .comments()
                .update_content(comment_id, &content, &edited_at)
        })?;
        if !updated {
            return Err(CommentError::InvalidState(format!(
                "comment {comment_id} is deleted"
            )));
        }
        tracing::info!(comment_id = %comment_id, "comment edited");
        self.view(comment_id)
    }

    /// Tombstones a comment. Children, ancestor counters and the post's
    /// comment counter are left untouched.
    pub fn delete_comment(&self, comment_id: &str, requester_id: &str) -> CommentResult<CommentView> {
        let record = self.get_record(comment_id)?;
        if !self.may_delete(&record, requester_id)? {
            return Err(CommentError::Forbidden(
                "only the author, the post author or a moderator may delete a comment".into(),
            ));
        }

        let updated_at = now_utc_iso();
        let tombstoned = !record.is_deleted
            && self.database.with_repositories(|repos| {
                repos
                    .comments()
                    .tombstone(comment_id, DELETED_PLACEHOLDER, &updated_at)
            })?;
        if !tombstoned {
            return Err(CommentError::InvalidState(format!(
                "comment {comment_id} is already deleted"
            )));
        }
        tracing::info!(
            comment_id = %comment_id,
            requester_id = %requester_id,
            "comment tombstoned"
        );
        self.view(comment_id)
    }

    pub fn get_record(&self, comment_id: &str) -> CommentResult<CommentRecord> {
        self.database
            .with_repositories(|repos| repos.comments().get(comment_id))?
            .ok_or_else(|| CommentError::not_found("comment", comment_id))
    }

    pub fn child_ids(&self, comment_id: &str) -> CommentResult<Vec<String>> {
        Ok(self
            .database
            .with_repositories(|repos| repos.comments().child_ids(comment_id))?)
    }

    /// Raw node view, tombstones included.
    pub fn view(&self, comment_id: &str) -> CommentResult<CommentView> {
        let record = self.get_record(comment_id)?;
        let child_ids = self.child_ids(comment_id)?;
        Ok(CommentView::from_record(record, child_ids))
    }

    fn may_delete(&self, record: &CommentRecord, requester_id: &str) -> CommentResult<bool> {
        if record.author_id == requester_id {
            return Ok(true);
        }
        let Some(post) = self.collaborators.posts.find_post(&record.post_id)? else {
            return Ok(false);
        };
        if post.author_id == requester_id {
            return Ok(true);
        }
        match &post.community_id {
            Some(community_id) => Ok(self
                .collaborators
                .identity
                .is_moderator(community_id, requester_id)?),
            None => Ok(false),
        }
    }

    /// Walks from the new comment's parent up to the root, one independent
    /// update per ancestor. A failure stops the walk and leaves the remaining
    /// ancestors under-counted until reconciliation runs; the creation itself
    /// still stands.
    fn propagate_reply_count(&self, comment: &CommentRecord) -> usize {
        let mut cursor = comment.parent_id.clone();
        let mut updated = 0;
        while let Some(ancestor_id) = cursor {
            let step = self
                .database
                .with_repositories(|repos| repos.comments().increment_reply_count(&ancestor_id));
            match step {
                Ok(Some(next)) => {
                    updated += 1;
                    cursor = next;
                }
                Ok(None) => {
                    tracing::warn!(
                        comment_id = %comment.id,
                        ancestor_id = %ancestor_id,
                        "ancestor vanished during reply count propagation"
                    );
                    break;
                }
                Err(err) => {
                    tracing::warn!(
                        comment_id = %comment.id,
                        ancestor_id = %ancestor_id,
                        error = ?err,
                        "reply count propagation interrupted"
                    );
                    break;
                }
            }
        }
        updated
    }
}

enum Insert {
    Done,
    ParentMissing,
    ParentElsewhere(String),
    ParentDeleted,
}

fn validate_content(raw: &str, max_chars: usize) -> CommentResult<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(CommentError::Validation("comment content may not be empty".into()));
    }
    let chars = trimmed.chars().count();
    if chars > max_chars {
        return Err(CommentError::Validation(format!(
            "comment content is {chars} characters, limit is {max_chars}"
        )));
    }
    Ok(trimmed.to_string())
}

/// Serialized comment node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentView {
    pub id: String,
    pub content: String,
    pub author_id: String,
    pub post_id: String,
    pub parent_id: Option<String>,
    pub child_ids: Vec<String>,
    pub vote_count: i64,
    pub reply_count: i64,
    pub is_deleted: bool,
    pub is_edited: bool,
    pub created_at: String,
    pub updated_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edited_at: Option<String>,
}

impl CommentView {
    pub fn from_record(record: CommentRecord, child_ids: Vec<String>) -> Self {
        let content = if record.is_deleted {
            DELETED_PLACEHOLDER.to_string()
        } else {
            record.content
        };
        Self {
            id: record.id,
            content,
            author_id: record.author_id,
            post_id: record.post_id,
            parent_id: record.parent_id,
            child_ids,
            vote_count: record.vote_count,
            reply_count: record.reply_count,
            is_deleted: record.is_deleted,
            is_edited: record.is_edited,
            created_at: record.created_at,
            updated_at: record.updated_at,
            edited_at: record.edited_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCommentInput {
    pub author_id: String,
    pub post_id: String,
    #[serde(default)]
    pub parent_id: Option<String>,
    pub content: String,
}
