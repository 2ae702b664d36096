mod comments;
mod moderators;
mod posts;
mod users;
mod votes;

use super::models::{
    CommentRecord, CommentSort, PostRecord, UserRecord, VoteDirection, VoteTargetKind,
};
use anyhow::Result;
use rusqlite::Connection;

pub trait CommentRepository {
    fn create(&self, record: &CommentRecord) -> Result<()>;
    fn get(&self, id: &str) -> Result<Option<CommentRecord>>;
    /// Fetches the given ids in no particular order; unknown ids are skipped.
    fn get_many(&self, ids: &[String]) -> Result<Vec<CommentRecord>>;
    fn list_for_post(&self, post_id: &str) -> Result<Vec<CommentRecord>>;
    fn list_by_parent(
        &self,
        post_id: &str,
        parent_id: Option<&str>,
        sort: CommentSort,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<CommentRecord>>;
    fn count_by_parent(&self, post_id: &str, parent_id: Option<&str>) -> Result<usize>;
    /// Direct children that are not tombstoned, newest first.
    fn list_live_children(&self, parent_id: &str) -> Result<Vec<CommentRecord>>;
    /// Appends to the parent's ordered child list and returns the new position.
    fn append_child(&self, parent_id: &str, child_id: &str) -> Result<i64>;
    fn child_ids(&self, parent_id: &str) -> Result<Vec<String>>;
    fn child_ids_page(&self, parent_id: &str, offset: usize, limit: usize) -> Result<Vec<String>>;
    fn child_count(&self, parent_id: &str) -> Result<usize>;
    /// Bumps `reply_count` by one. Returns `None` when the comment is missing,
    /// otherwise the comment's own `parent_id`.
    fn increment_reply_count(&self, id: &str) -> Result<Option<Option<String>>>;
    /// Sets `reply_count` to `floor` only if it is currently lower.
    fn raise_reply_count(&self, id: &str, floor: i64) -> Result<bool>;
    /// Rewrites a live comment's content. Returns `false` when the comment is
    /// missing or already tombstoned.
    fn update_content(&self, id: &str, content: &str, edited_at: &str) -> Result<bool>;
    /// Returns `false` when the comment is missing or already tombstoned.
    fn tombstone(&self, id: &str, placeholder: &str, updated_at: &str) -> Result<bool>;
    fn set_vote_count(&self, id: &str, vote_count: i64) -> Result<()>;
}

pub trait VoteRepository {
    fn cast(
        &self,
        kind: VoteTargetKind,
        target_id: &str,
        voter_id: &str,
        direction: VoteDirection,
        created_at: &str,
    ) -> Result<()>;
    fn clear(&self, kind: VoteTargetKind, target_id: &str, voter_id: &str) -> Result<bool>;
    fn voters(
        &self,
        kind: VoteTargetKind,
        target_id: &str,
        direction: VoteDirection,
    ) -> Result<Vec<String>>;
}

pub trait PostRepository {
    fn create(&self, record: &PostRecord) -> Result<()>;
    fn get(&self, id: &str) -> Result<Option<PostRecord>>;
    fn set_deleted(&self, id: &str, deleted: bool) -> Result<()>;
    fn adjust_comment_count(&self, id: &str, delta: i64) -> Result<bool>;
    fn set_vote_count(&self, id: &str, vote_count: i64) -> Result<()>;
}

pub trait UserRepository {
    fn upsert(&self, record: &UserRecord) -> Result<()>;
    fn get(&self, id: &str) -> Result<Option<UserRecord>>;
}

pub trait ModeratorRepository {
    fn add(&self, community_id: &str, user_id: &str, added_at: &str) -> Result<()>;
    fn remove(&self, community_id: &str, user_id: &str) -> Result<()>;
    fn is_moderator(&self, community_id: &str, user_id: &str) -> Result<bool>;
}

/// Hands out rusqlite-backed repositories borrowing one locked connection.
pub struct SqliteRepositories<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteRepositories<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    pub fn comments(&self) -> impl CommentRepository + '_ {
        comments::SqliteCommentRepository { conn: self.conn }
    }

    pub fn votes(&self) -> impl VoteRepository + '_ {
        votes::SqliteVoteRepository { conn: self.conn }
    }

    pub fn posts(&self) -> impl PostRepository + '_ {
        posts::SqlitePostRepository { conn: self.conn }
    }

    pub fn users(&self) -> impl UserRepository + '_ {
        users::SqliteUserRepository { conn: self.conn }
    }

    pub fn moderators(&self) -> impl ModeratorRepository + '_ {
        moderators::SqliteModeratorRepository { conn: self.conn }
    }

    pub fn conn(&self) -> &'conn Connection {
        self.conn
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::MIGRATIONS;

    fn setup_conn() -> Connection {
        let conn = Connection::open_in_memory().expect("in-memory db");
        conn.execute_batch(MIGRATIONS).expect("base migrations");
        conn
    }

    fn comment(id: &str, parent_id: Option<&str>, created_at: &str) -> CommentRecord {
        CommentRecord {
            id: id.into(),
            post_id: "post-1".into(),
            parent_id: parent_id.map(Into::into),
            author_id: "user-1".into(),
            content: format!("body of {id}"),
            vote_count: 0,
            reply_count: 0,
            is_deleted: false,
            is_edited: false,
            created_at: created_at.into(),
            updated_at: created_at.into(),
            edited_at: None,
        }
    }

    #[test]
    fn comment_children_keep_append_order() {
        let conn = setup_conn();
        let repos = SqliteRepositories::new(&conn);
        let comments = repos.comments();

        comments
            .create(&comment("root", None, "2024-01-01T00:00:00.000000Z"))
            .unwrap();
        for (idx, id) in ["c", "a", "b"].iter().enumerate() {
            comments
                .create(&comment(id, Some("root"), "2024-01-01T00:00:01.000000Z"))
                .unwrap();
            assert_eq!(comments.append_child("root", id).unwrap(), idx as i64);
        }

        assert_eq!(comments.child_ids("root").unwrap(), vec!["c", "a", "b"]);
        assert_eq!(comments.child_ids_page("root", 1, 5).unwrap(), vec!["a", "b"]);
        assert_eq!(comments.child_count("root").unwrap(), 3);
    }

    #[test]
    fn increment_reply_count_returns_parent() {
        let conn = setup_conn();
        let repos = SqliteRepositories::new(&conn);
        let comments = repos.comments();
        comments
            .create(&comment("root", None, "2024-01-01T00:00:00.000000Z"))
            .unwrap();
        comments
            .create(&comment("child", Some("root"), "2024-01-01T00:00:01.000000Z"))
            .unwrap();

        assert_eq!(
            comments.increment_reply_count("child").unwrap(),
            Some(Some("root".to_string()))
        );
        assert_eq!(comments.increment_reply_count("root").unwrap(), Some(None));
        assert_eq!(comments.increment_reply_count("missing").unwrap(), None);
        assert_eq!(comments.get("root").unwrap().unwrap().reply_count, 1);
    }

    #[test]
    fn raise_reply_count_never_lowers() {
        let conn = setup_conn();
        let repos = SqliteRepositories::new(&conn);
        let comments = repos.comments();
        let mut record = comment("root", None, "2024-01-01T00:00:00.000000Z");
        record.reply_count = 5;
        comments.create(&record).unwrap();

        assert!(!comments.raise_reply_count("root", 3).unwrap());
        assert!(comments.raise_reply_count("root", 7).unwrap());
        assert_eq!(comments.get("root").unwrap().unwrap().reply_count, 7);
    }

    #[test]
    fn tombstoned_rows_reject_content_writes() {
        let conn = setup_conn();
        let repos = SqliteRepositories::new(&conn);
        let comments = repos.comments();
        comments
            .create(&comment("c1", None, "2024-01-01T00:00:00.000000Z"))
            .unwrap();

        assert!(comments
            .tombstone("c1", "[deleted]", "2024-01-01T00:00:05.000000Z")
            .unwrap());
        assert!(!comments
            .update_content("c1", "late edit", "2024-01-01T00:00:06.000000Z")
            .unwrap());
        assert!(!comments
            .tombstone("c1", "[deleted]", "2024-01-01T00:00:07.000000Z")
            .unwrap());
        assert!(!comments
            .update_content("missing", "x", "2024-01-01T00:00:08.000000Z")
            .unwrap());

        let stored = comments.get("c1").unwrap().unwrap();
        assert!(stored.is_deleted);
        assert!(!stored.is_edited);
        assert_eq!(stored.content, "[deleted]");
    }

    #[test]
    fn list_by_parent_filters_null_parent() {
        let conn = setup_conn();
        let repos = SqliteRepositories::new(&conn);
        let comments = repos.comments();
        comments
            .create(&comment("top-1", None, "2024-01-01T00:00:00.000000Z"))
            .unwrap();
        comments
            .create(&comment("top-2", None, "2024-01-01T00:00:02.000000Z"))
            .unwrap();
        comments
            .create(&comment("reply", Some("top-1"), "2024-01-01T00:00:03.000000Z"))
            .unwrap();

        let top = comments
            .list_by_parent("post-1", None, CommentSort::Newest, 10, 0)
            .unwrap();
        let ids: Vec<_> = top.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["top-2", "top-1"]);
        assert_eq!(comments.count_by_parent("post-1", None).unwrap(), 2);
        assert_eq!(comments.count_by_parent("post-1", Some("top-1")).unwrap(), 1);
    }

    #[test]
    fn votes_are_one_row_per_voter() {
        let conn = setup_conn();
        let repos = SqliteRepositories::new(&conn);
        let votes = repos.votes();
        let kind = VoteTargetKind::Comment;

        votes.cast(kind, "c1", "u1", VoteDirection::Up, "t0").unwrap();
        votes.cast(kind, "c1", "u1", VoteDirection::Up, "t1").unwrap();
        votes.cast(kind, "c1", "u2", VoteDirection::Down, "t2").unwrap();
        assert_eq!(votes.voters(kind, "c1", VoteDirection::Up).unwrap(), vec!["u1"]);

        votes.cast(kind, "c1", "u1", VoteDirection::Down, "t3").unwrap();
        assert!(votes.voters(kind, "c1", VoteDirection::Up).unwrap().is_empty());
        assert_eq!(
            votes.voters(kind, "c1", VoteDirection::Down).unwrap(),
            vec!["u1", "u2"]
        );

        assert!(votes.clear(kind, "c1", "u1").unwrap());
        assert!(!votes.clear(kind, "c1", "u1").unwrap());
        // The same id under the other kind is a different node.
        assert!(votes
            .voters(VoteTargetKind::Post, "c1", VoteDirection::Down)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn post_and_moderator_repositories_work() {
        let conn = setup_conn();
        let repos = SqliteRepositories::new(&conn);

        let post = PostRecord {
            id: "post-1".into(),
            author_id: "alice".into(),
            community_id: Some("rust".into()),
            title: "First".into(),
            is_deleted: false,
            comment_count: 0,
            vote_count: 0,
            created_at: "2024-01-01T00:00:00.000000Z".into(),
        };
        repos.posts().create(&post).unwrap();
        assert!(repos.posts().adjust_comment_count("post-1", 1).unwrap());
        assert!(!repos.posts().adjust_comment_count("missing", 1).unwrap());
        assert_eq!(repos.posts().get("post-1").unwrap().unwrap().comment_count, 1);

        repos.moderators().add("rust", "bob", "2024-01-01T00:00:00.000000Z").unwrap();
        assert!(repos.moderators().is_moderator("rust", "bob").unwrap());
        assert!(!repos.moderators().is_moderator("rust", "alice").unwrap());
        repos.moderators().remove("rust", "bob").unwrap();
        assert!(!repos.moderators().is_moderator("rust", "bob").unwrap());
    }
}
