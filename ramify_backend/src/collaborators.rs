//! Contracts the comment engine expects from the systems around it, plus the
//! SQLite-backed reference implementations used by the bundled server.

use crate::database::models::{PostRecord, UserRecord};
use crate::database::repositories::{ModeratorRepository, PostRepository, UserRepository};
use crate::database::Database;
use crate::utils::now_utc_iso;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// What the comment engine needs to know about a post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostSummary {
    pub id: String,
    pub author_id: String,
    pub community_id: Option<String>,
    pub is_deleted: bool,
}

/// Owner of posts and their comment counters.
pub trait PostDirectory: Send + Sync {
    fn find_post(&self, post_id: &str) -> Result<Option<PostSummary>>;
    fn adjust_comment_count(&self, post_id: &str, delta: i64) -> Result<()>;
}

/// Identity and authorization answers.
pub trait IdentityProvider: Send + Sync {
    fn is_moderator(&self, community_id: &str, user_id: &str) -> Result<bool>;
    /// Display name for an author; `None` when the user is unknown or deleted.
    fn display_name(&self, user_id: &str) -> Result<Option<String>>;
}

#[derive(Clone)]
pub struct Collaborators {
    pub posts: Arc<dyn PostDirectory>,
    pub identity: Arc<dyn IdentityProvider>,
}

impl Collaborators {
    /// Both contracts served from the engine's own database.
    pub fn local(database: Database) -> Self {
        let directory = Arc::new(LocalDirectory::new(database));
        Self {
            posts: directory.clone(),
            identity: directory,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePostInput {
    pub title: String,
    #[serde(default)]
    pub community_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUserInput {
    #[serde(default)]
    pub id: Option<String>,
    pub username: String,
}

/// Reference post store and identity provider on top of the local tables.
#[derive(Clone)]
pub struct LocalDirectory {
    database: Database,
}

impl LocalDirectory {
    pub fn new(database: Database) -> Self {
        Self { database }
    }

    pub fn create_post(&self, author_id: &str, input: CreatePostInput) -> Result<PostRecord> {
        if input.title.trim().is_empty() {
            anyhow::bail!("post title may not be empty");
        }
        let record = PostRecord {
            id: Uuid::new_v4().to_string(),
            author_id: author_id.to_string(),
            community_id: input.community_id,
            title: input.title.trim().to_string(),
            is_deleted: false,
            comment_count: 0,
            vote_count: 0,
            created_at: now_utc_iso(),
        };
        self.database
            .with_repositories(|repos| repos.posts().create(&record))?;
        tracing::info!(post_id = %record.id, author_id = %author_id, "post created");
        Ok(record)
    }

    pub fn get_post(&self, post_id: &str) -> Result<Option<PostRecord>> {
        self.database
            .with_repositories(|repos| repos.posts().get(post_id))
    }

    pub fn set_post_deleted(&self, post_id: &str, deleted: bool) -> Result<()> {
        self.database.with_repositories(|repos| {
            repos
                .posts()
                .get(post_id)?
                .with_context(|| format!("post {post_id} not found"))?;
            repos.posts().set_deleted(post_id, deleted)
        })
    }

    pub fn register_user(&self, input: CreateUserInput) -> Result<UserRecord> {
        if input.username.trim().is_empty() {
            anyhow::bail!("username may not be empty");
        }
        let record = UserRecord {
            id: input.id.unwrap_or_else(|| Uuid::new_v4().to_string()),
            username: input.username.trim().to_string(),
            is_deleted: false,
            created_at: now_utc_iso(),
        };
        self.database
            .with_repositories(|repos| repos.users().upsert(&record))?;
        Ok(record)
    }

    pub fn set_user_deleted(&self, user_id: &str) -> Result<()> {
        self.database.with_repositories(|repos| {
            let mut user = repos
                .users()
                .get(user_id)?
                .with_context(|| format!("user {user_id} not found"))?;
            user.is_deleted = true;
            repos.users().upsert(&user)
        })
    }

    pub fn add_moderator(&self, community_id: &str, user_id: &str) -> Result<()> {
        self.database.with_repositories(|repos| {
            repos
                .moderators()
                .add(community_id, user_id, &now_utc_iso())
        })
    }
}

impl PostDirectory for LocalDirectory {
    fn find_post(&self, post_id: &str) -> Result<Option<PostSummary>> {
        let post = self.get_post(post_id)?;
        Ok(post.map(|post| PostSummary {
            id: post.id,
            author_id: post.author_id,
            community_id: post.community_id,
            is_deleted: post.is_deleted,
        }))
    }

    fn adjust_comment_count(&self, post_id: &str, delta: i64) -> Result<()> {
        let updated = self
            .database
            .with_repositories(|repos| repos.posts().adjust_comment_count(post_id, delta))?;
        if !updated {
            anyhow::bail!("post {post_id} not found");
        }
        Ok(())
    }
}

impl IdentityProvider for LocalDirectory {
    fn is_moderator(&self, community_id: &str, user_id: &str) -> Result<bool> {
        self.database
            .with_repositories(|repos| repos.moderators().is_moderator(community_id, user_id))
    }

    fn display_name(&self, user_id: &str) -> Result<Option<String>> {
        let user = self
            .database
            .with_repositories(|repos| repos.users().get(user_id))?;
        Ok(user
            .filter(|user| !user.is_deleted)
            .map(|user| user.username))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deleted_users_have_no_display_name() {
        let directory = LocalDirectory::new(Database::open_in_memory().unwrap());
        let user = directory
            .register_user(CreateUserInput {
                id: Some("u1".into()),
                username: "alice".into(),
            })
            .unwrap();
        assert_eq!(directory.display_name(&user.id).unwrap().as_deref(), Some("alice"));

        directory.set_user_deleted(&user.id).unwrap();
        assert_eq!(directory.display_name(&user.id).unwrap(), None);
        assert_eq!(directory.display_name("nobody").unwrap(), None);
    }

    #[test]
    fn comment_counter_requires_existing_post() {
        let directory = LocalDirectory::new(Database::open_in_memory().unwrap());
        let post = directory
            .create_post(
                "alice",
                CreatePostInput {
                    title: "Hello".into(),
                    community_id: None,
                },
            )
            .unwrap();
        directory.adjust_comment_count(&post.id, 1).unwrap();
        assert!(directory.adjust_comment_count("missing", 1).is_err());

        let summary = directory.find_post(&post.id).unwrap().unwrap();
        assert_eq!(summary.author_id, "alice");
        assert_eq!(directory.get_post(&post.id).unwrap().unwrap().comment_count, 1);
    }
}
