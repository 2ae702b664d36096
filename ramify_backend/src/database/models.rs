use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentRecord {
    pub id: String,
    pub post_id: String,
    pub parent_id: Option<String>,
    pub author_id: String,
    pub content: String,
    pub vote_count: i64,
    pub reply_count: i64,
    pub is_deleted: bool,
    pub is_edited: bool,
    pub created_at: String,
    pub updated_at: String,
    pub edited_at: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostRecord {
    pub id: String,
    pub author_id: String,
    pub community_id: Option<String>,
    pub title: String,
    pub is_deleted: bool,
    pub comment_count: i64,
    pub vote_count: i64,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: String,
    pub username: String,
    pub is_deleted: bool,
    pub created_at: String,
}

/// Which node table a vote row points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoteTargetKind {
    Comment,
    Post,
}

impl VoteTargetKind {
    pub fn as_str(self) -> &'static str {
        match self {
            VoteTargetKind::Comment => "comment",
            VoteTargetKind::Post => "post",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VoteDirection {
    Up,
    Down,
}

impl VoteDirection {
    pub fn as_i64(self) -> i64 {
        match self {
            VoteDirection::Up => 1,
            VoteDirection::Down => -1,
        }
    }
}

/// Sort orders shared by the paginated projections.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommentSort {
    /// `created_at` descending.
    #[default]
    Newest,
    /// `vote_count` descending, ties broken by `created_at` descending.
    Top,
}
