//! Read projections over the comment store.
//!
//! The projections deliberately disagree on tombstones: `list_comments`
//! returns them redacted, while `get_comment` children and
//! `list_direct_replies` drop them.

use crate::collaborators::Collaborators;
use crate::comments::CommentView;
use crate::config::CommentConfig;
use crate::database::models::{CommentRecord, CommentSort};
use crate::database::repositories::CommentRepository;
use crate::database::Database;
use crate::error::{CommentError, CommentResult};
use crate::utils::{DELETED_PLACEHOLDER, UNKNOWN_AUTHOR};
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    /// 1-based.
    pub page: usize,
    pub limit: usize,
    #[serde(default)]
    pub sort: CommentSort,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: usize,
    pub page: usize,
    pub limit: usize,
    pub total_pages: usize,
    pub has_more: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentDetails {
    pub comment: CommentView,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replies: Option<Vec<CommentView>>,
}

/// One node of a fully materialized post tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeNode {
    pub id: String,
    pub parent_id: Option<String>,
    pub author_id: String,
    pub author: String,
    pub content: String,
    pub vote_count: i64,
    pub reply_count: i64,
    pub is_deleted: bool,
    pub is_edited: bool,
    pub created_at: String,
    pub replies: Vec<TreeNode>,
}

#[derive(Clone)]
pub struct TreeReader {
    database: Database,
    collaborators: Collaborators,
    config: CommentConfig,
}

impl TreeReader {
    pub fn new(database: Database, collaborators: Collaborators, config: CommentConfig) -> Self {
        Self {
            database,
            collaborators,
            config,
        }
    }

    /// Siblings under `parent_id` (`None` for top level), tombstones included.
    pub fn list_comments(
        &self,
        post_id: &str,
        parent_id: Option<&str>,
        request: PageRequest,
    ) -> CommentResult<Page<CommentView>> {
        let (limit, offset) = self.window(&request)?;
        let (records, total, child_ids) = self.database.with_repositories(|repos| {
            let comments = repos.comments();
            let total = comments.count_by_parent(post_id, parent_id)?;
            let records = comments.list_by_parent(post_id, parent_id, request.sort, limit, offset)?;
            let mut child_ids = Vec::with_capacity(records.len());
            for record in &records {
                child_ids.push(comments.child_ids(&record.id)?);
            }
            Ok((records, total, child_ids))
        })?;

        let items = records
            .into_iter()
            .zip(child_ids)
            .map(|(record, children)| CommentView::from_record(record, children))
            .collect();
        Ok(build_page(items, total, request.page, limit, offset))
    }

    /// One comment and, optionally, its live direct children (newest first).
    /// A tombstoned comment is only visible to its own author.
    pub fn get_comment(
        &self,
        comment_id: &str,
        requester_id: Option<&str>,
        include_children: bool,
    ) -> CommentResult<CommentDetails> {
        let loaded = self.database.with_repositories(|repos| {
            let comments = repos.comments();
            let Some(record) = comments.get(comment_id)? else {
                return Ok(None);
            };
            let own_children = comments.child_ids(comment_id)?;
            let replies = if include_children && !hidden(&record, requester_id) {
                let mut replies = Vec::new();
                for child in comments.list_live_children(comment_id)? {
                    let grandchildren = comments.child_ids(&child.id)?;
                    replies.push(CommentView::from_record(child, grandchildren));
                }
                Some(replies)
            } else {
                None
            };
            Ok(Some((record, own_children, replies)))
        })?;

        let Some((record, own_children, replies)) = loaded else {
            return Err(CommentError::not_found("comment", comment_id));
        };
        if hidden(&record, requester_id) {
            return Err(CommentError::not_found("comment", comment_id));
        }
        Ok(CommentDetails {
            comment: CommentView::from_record(record, own_children),
            replies,
        })
    }

    /// Pages through the stored child list itself. `total` counts every
    /// stored child, tombstones included, while `items` only holds the live
    /// ones of the slice, so a page may come back short with `has_more` set.
    pub fn list_direct_replies(
        &self,
        comment_id: &str,
        request: PageRequest,
    ) -> CommentResult<Page<CommentView>> {
        let (limit, offset) = self.window(&request)?;
        let loaded = self.database.with_repositories(|repos| {
            let comments = repos.comments();
            if comments.get(comment_id)?.is_none() {
                return Ok(None);
            }
            let total = comments.child_count(comment_id)?;
            let slice = comments.child_ids_page(comment_id, offset, limit)?;
            let mut items = Vec::new();
            for record in comments.get_many(&slice)? {
                if record.is_deleted {
                    continue;
                }
                let children = comments.child_ids(&record.id)?;
                items.push(CommentView::from_record(record, children));
            }
            Ok(Some((items, total, slice.len())))
        })?;

        let Some((mut items, total, sliced)) = loaded else {
            return Err(CommentError::not_found("comment", comment_id));
        };
        sort_views(&mut items, request.sort);
        let mut page = build_page(items, total, request.page, limit, offset);
        page.has_more = offset.saturating_add(sliced) < total;
        Ok(page)
    }

    /// Materializes every comment of a post into nested nodes, with no
    /// pagination. Meant for bulk consumers such as summarizers.
    pub fn build_full_tree(&self, post_id: &str) -> CommentResult<Vec<TreeNode>> {
        if self.collaborators.posts.find_post(post_id)?.is_none() {
            return Err(CommentError::not_found("post", post_id));
        }
        let records = self
            .database
            .with_repositories(|repos| repos.comments().list_for_post(post_id))?;

        let mut authors: HashMap<String, String> = HashMap::new();
        for record in &records {
            if authors.contains_key(&record.author_id) {
                continue;
            }
            let name = self
                .collaborators
                .identity
                .display_name(&record.author_id)?
                .unwrap_or_else(|| UNKNOWN_AUTHOR.to_string());
            authors.insert(record.author_id.clone(), name);
        }

        let total = records.len();
        let mut by_parent: HashMap<Option<String>, Vec<CommentRecord>> = HashMap::new();
        for record in records {
            by_parent
                .entry(record.parent_id.clone())
                .or_default()
                .push(record);
        }
        let roots = assemble(None, &mut by_parent, &authors);
        tracing::debug!(post_id = %post_id, comments = total, roots = roots.len(), "full tree built");
        Ok(roots)
    }

    fn window(&self, request: &PageRequest) -> CommentResult<(usize, usize)> {
        if request.page == 0 {
            return Err(CommentError::Validation("page starts at 1".into()));
        }
        if request.limit == 0 {
            return Err(CommentError::Validation("limit must be at least 1".into()));
        }
        let limit = request.limit.min(self.config.max_page_limit);
        let offset = (request.page - 1)
            .checked_mul(limit)
            .filter(|offset| i64::try_from(*offset).is_ok())
            .ok_or_else(|| CommentError::Validation(format!("page {} is out of range", request.page)))?;
        Ok((limit, offset))
    }
}

fn hidden(record: &CommentRecord, requester_id: Option<&str>) -> bool {
    record.is_deleted && requester_id != Some(record.author_id.as_str())
}

fn build_page<T>(items: Vec<T>, total: usize, page: usize, limit: usize, offset: usize) -> Page<T> {
    let total_pages = total.div_ceil(limit);
    Page {
        has_more: offset.saturating_add(limit) < total,
        items,
        total,
        page,
        limit,
        total_pages,
    }
}

fn sort_views(items: &mut [CommentView], sort: CommentSort) {
    match sort {
        CommentSort::Newest => items.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
        CommentSort::Top => items.sort_by_key(|item| {
            (Reverse(item.vote_count), Reverse(item.created_at.clone()))
        }),
    }
}

/// Takes each node's children out of `by_parent` as it is placed, so every
/// comment lands at most once.
fn assemble(
    parent_id: Option<String>,
    by_parent: &mut HashMap<Option<String>, Vec<CommentRecord>>,
    authors: &HashMap<String, String>,
) -> Vec<TreeNode> {
    let Some(children) = by_parent.remove(&parent_id) else {
        return Vec::new();
    };
    children
        .into_iter()
        .map(|record| {
            let replies = assemble(Some(record.id.clone()), by_parent, authors);
            let content = if record.is_deleted {
                DELETED_PLACEHOLDER.to_string()
            } else {
                record.content
            };
            TreeNode {
                author: authors
                    .get(&record.author_id)
                    .cloned()
                    .unwrap_or_else(|| UNKNOWN_AUTHOR.to_string()),
                id: record.id,
                parent_id: record.parent_id,
                author_id: record.author_id,
                content,
                vote_count: record.vote_count,
                reply_count: record.reply_count,
                is_deleted: record.is_deleted,
                is_edited: record.is_edited,
                created_at: record.created_at,
                replies,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::{CreatePostInput, CreateUserInput, LocalDirectory};
    use crate::comments::{CommentService, CreateCommentInput};
    use crate::votes::{VoteLedger, VoteTarget};

    struct Fixture {
        reader: TreeReader,
        service: CommentService,
        ledger: VoteLedger,
        directory: LocalDirectory,
        post_id: String,
    }

    fn setup() -> Fixture {
        let database = Database::open_in_memory().expect("in-memory db");
        let directory = LocalDirectory::new(database.clone());
        let post = directory
            .create_post(
                "op",
                CreatePostInput {
                    title: "Reader".into(),
                    community_id: None,
                },
            )
            .expect("post");
        let collaborators = Collaborators::local(database.clone());
        Fixture {
            reader: TreeReader::new(
                database.clone(),
                collaborators.clone(),
                CommentConfig::default(),
            ),
            service: CommentService::new(database.clone(), collaborators, CommentConfig::default()),
            ledger: VoteLedger::new(database),
            directory,
            post_id: post.id,
        }
    }

    fn reply(fixture: &Fixture, author: &str, parent_id: Option<&str>, content: &str) -> String {
        fixture
            .service
            .create_comment(CreateCommentInput {
                author_id: author.into(),
                post_id: fixture.post_id.clone(),
                parent_id: parent_id.map(Into::into),
                content: content.into(),
            })
            .expect("create comment")
            .id
    }

    fn page(page: usize, limit: usize) -> PageRequest {
        PageRequest {
            page,
            limit,
            sort: CommentSort::Newest,
        }
    }

    fn ids(items: &[CommentView]) -> Vec<&str> {
        items.iter().map(|item| item.id.as_str()).collect()
    }

    /// C1 <- C2 <- C3
    fn chain(fixture: &Fixture) -> (String, String, String) {
        let c1 = reply(fixture, "alice", None, "C1");
        let c2 = reply(fixture, "bob", Some(c1.as_str()), "C2");
        let c3 = reply(fixture, "carol", Some(c2.as_str()), "C3");
        (c1, c2, c3)
    }

    #[test]
    fn top_level_pagination_reports_consistent_totals() {
        let fixture = setup();
        for idx in 0..3 {
            reply(&fixture, "alice", None, &format!("top {idx}"));
        }
        let first = fixture
            .reader
            .list_comments(&fixture.post_id, None, page(1, 2))
            .unwrap();
        assert_eq!(first.items.len(), 2);
        assert_eq!(first.total, 3);
        assert_eq!(first.total_pages, 2);
        assert!(first.has_more);

        let second = fixture
            .reader
            .list_comments(&fixture.post_id, None, page(2, 2))
            .unwrap();
        assert_eq!(second.items.len(), 1);
        assert!(!second.has_more);
    }

    #[test]
    fn list_comments_sorts_newest_or_top_and_keeps_tombstones() {
        let fixture = setup();
        let old = reply(&fixture, "alice", None, "old");
        let mid = reply(&fixture, "alice", None, "mid");
        let new = reply(&fixture, "alice", None, "new");
        fixture.ledger.upvote(&VoteTarget::comment(&mid), "u1").unwrap();
        fixture.ledger.upvote(&VoteTarget::comment(&old), "u1").unwrap();
        fixture.service.delete_comment(&new, "alice").unwrap();

        let newest = fixture
            .reader
            .list_comments(&fixture.post_id, None, page(1, 10))
            .unwrap();
        assert_eq!(ids(&newest.items), vec![new.as_str(), mid.as_str(), old.as_str()]);
        assert_eq!(newest.items[0].content, DELETED_PLACEHOLDER);

        let top = fixture
            .reader
            .list_comments(
                &fixture.post_id,
                None,
                PageRequest {
                    page: 1,
                    limit: 10,
                    sort: CommentSort::Top,
                },
            )
            .unwrap();
        assert_eq!(ids(&top.items), vec![mid.as_str(), old.as_str(), new.as_str()]);
    }

    #[test]
    fn list_comments_filters_by_parent() {
        let fixture = setup();
        let (c1, c2, _) = chain(&fixture);
        let under_c1 = fixture
            .reader
            .list_comments(&fixture.post_id, Some(c1.as_str()), page(1, 10))
            .unwrap();
        assert_eq!(ids(&under_c1.items), vec![c2.as_str()]);
        assert_eq!(under_c1.total, 1);
    }

    #[test]
    fn invalid_windows_are_rejected_and_limits_clamped() {
        let fixture = setup();
        let zero_page = fixture.reader.list_comments(&fixture.post_id, None, page(0, 5));
        assert!(matches!(zero_page, Err(CommentError::Validation(_))));
        let zero_limit = fixture.reader.list_comments(&fixture.post_id, None, page(1, 0));
        assert!(matches!(zero_limit, Err(CommentError::Validation(_))));

        let clamped = fixture
            .reader
            .list_comments(&fixture.post_id, None, page(1, 10_000))
            .unwrap();
        assert_eq!(clamped.limit, CommentConfig::default().max_page_limit);
    }

    #[test]
    fn huge_page_numbers_are_rejected() {
        let fixture = setup();
        let (c1, _, _) = chain(&fixture);
        let request = page(usize::MAX, 2);

        let listed = fixture.reader.list_comments(&fixture.post_id, None, request);
        assert!(matches!(listed, Err(CommentError::Validation(_))));
        let replies = fixture.reader.list_direct_replies(&c1, request);
        assert!(matches!(replies, Err(CommentError::Validation(_))));

        // Far past the end but still addressable: an empty page.
        let beyond = fixture
            .reader
            .list_comments(&fixture.post_id, None, page(1_000_000, 2))
            .unwrap();
        assert!(beyond.items.is_empty());
        assert!(!beyond.has_more);
    }

    #[test]
    fn tombstone_is_hidden_from_everyone_but_its_author() {
        let fixture = setup();
        let (c1, c2, _) = chain(&fixture);
        fixture.service.delete_comment(&c2, "bob").unwrap();

        let anonymous = fixture.reader.get_comment(&c2, None, false);
        assert!(matches!(anonymous, Err(CommentError::NotFound(_))));
        let stranger = fixture.reader.get_comment(&c2, Some("alice"), true);
        assert!(matches!(stranger, Err(CommentError::NotFound(_))));

        let own = fixture.reader.get_comment(&c2, Some("bob"), false).unwrap();
        assert!(own.comment.is_deleted);
        assert_eq!(own.comment.content, DELETED_PLACEHOLDER);

        // The populated view of the parent skips the tombstone.
        let parent = fixture.reader.get_comment(&c1, None, true).unwrap();
        assert_eq!(parent.replies, Some(Vec::new()));
        assert_eq!(parent.comment.child_ids, vec![c2]);
    }

    #[test]
    fn get_comment_children_are_newest_first() {
        let fixture = setup();
        let root = reply(&fixture, "alice", None, "root");
        let first = reply(&fixture, "bob", Some(root.as_str()), "first");
        let second = reply(&fixture, "bob", Some(root.as_str()), "second");

        let without = fixture.reader.get_comment(&root, None, false).unwrap();
        assert!(without.replies.is_none());

        let with = fixture.reader.get_comment(&root, None, true).unwrap();
        let replies = with.replies.unwrap();
        assert_eq!(ids(&replies), vec![second.as_str(), first.as_str()]);

        let missing = fixture.reader.get_comment("missing", None, false);
        assert!(matches!(missing, Err(CommentError::NotFound(_))));
    }

    #[test]
    fn direct_replies_page_over_stored_children() {
        let fixture = setup();
        let root = reply(&fixture, "alice", None, "root");
        let children: Vec<String> = (0..5)
            .map(|idx| reply(&fixture, "bob", Some(root.as_str()), &format!("child {idx}")))
            .collect();
        fixture.service.delete_comment(&children[1], "bob").unwrap();

        let first = fixture
            .reader
            .list_direct_replies(&root, page(1, 2))
            .unwrap();
        assert_eq!(first.total, 5);
        assert_eq!(first.total_pages, 3);
        // Slice is [child 0, child 1]; child 1 is a tombstone.
        assert_eq!(ids(&first.items), vec![children[0].as_str()]);
        assert!(first.has_more);

        let last = fixture
            .reader
            .list_direct_replies(&root, page(3, 2))
            .unwrap();
        assert_eq!(ids(&last.items), vec![children[4].as_str()]);
        assert!(!last.has_more);
    }

    #[test]
    fn replies_under_a_tombstone_stay_reachable() {
        let fixture = setup();
        let (c1, c2, c3) = chain(&fixture);
        fixture.service.delete_comment(&c2, "bob").unwrap();

        let replies = fixture
            .reader
            .list_direct_replies(&c2, page(1, 10))
            .unwrap();
        assert_eq!(ids(&replies.items), vec![c3.as_str()]);
        assert_eq!(fixture.service.get_record(&c1).unwrap().reply_count, 2);

        let missing = fixture.reader.list_direct_replies("missing", page(1, 10));
        assert!(matches!(missing, Err(CommentError::NotFound(_))));
    }

    #[test]
    fn full_tree_nests_the_whole_chain() {
        let fixture = setup();
        fixture
            .directory
            .register_user(CreateUserInput {
                id: Some("alice".into()),
                username: "Alice".into(),
            })
            .unwrap();
        let (c1, c2, c3) = chain(&fixture);

        let tree = fixture.reader.build_full_tree(&fixture.post_id).unwrap();
        assert_eq!(tree.len(), 1);
        let root = &tree[0];
        assert_eq!(root.id, c1);
        assert_eq!(root.author, "Alice");
        assert_eq!(root.replies.len(), 1);
        assert_eq!(root.replies[0].id, c2);
        assert_eq!(root.replies[0].author, UNKNOWN_AUTHOR);
        assert_eq!(root.replies[0].replies.len(), 1);
        assert_eq!(root.replies[0].replies[0].id, c3);
        assert!(root.replies[0].replies[0].replies.is_empty());
    }

    #[test]
    fn full_tree_redacts_tombstones_and_is_unpaginated() {
        let fixture = setup();
        let root = reply(&fixture, "alice", None, "root");
        for idx in 0..150 {
            reply(&fixture, "bob", Some(root.as_str()), &format!("reply {idx}"));
        }
        let doomed = reply(&fixture, "bob", None, "secret");
        fixture.service.delete_comment(&doomed, "bob").unwrap();

        let tree = fixture.reader.build_full_tree(&fixture.post_id).unwrap();
        assert_eq!(tree.len(), 2);
        assert_eq!(tree[0].replies.len(), 150);
        assert_eq!(tree[1].content, DELETED_PLACEHOLDER);
        assert!(tree[1].is_deleted);

        let missing = fixture.reader.build_full_tree("missing");
        assert!(matches!(missing, Err(CommentError::NotFound(_))));
    }
}
