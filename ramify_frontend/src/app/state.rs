use crate::models::CommentView;

/// Where a node's direct replies are in their fetch lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadState {
    /// Not fetched yet. Holds the message of the last failed attempt.
    Unloaded { error: Option<String> },
    Loading,
    Loaded,
}

impl Default for LoadState {
    fn default() -> Self {
        LoadState::Unloaded { error: None }
    }
}

#[derive(Debug, Clone)]
pub struct NodeState {
    pub comment: CommentView,
    pub depth: usize,
    pub collapsed: bool,
    pub load: LoadState,
    /// Ids of fetched replies, in the order the backend returned them.
    pub children: Vec<String>,
    pub visible_replies: usize,
}

impl NodeState {
    pub fn new(comment: CommentView, depth: usize) -> Self {
        Self {
            comment,
            depth,
            collapsed: false,
            load: LoadState::default(),
            children: Vec::new(),
            visible_replies: 0,
        }
    }

    /// Stored children, tombstones included.
    pub fn stored_replies(&self) -> usize {
        self.comment.child_ids.len()
    }
}

/// One drawable line of the tree. Any UI layer can turn these into widgets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderRow {
    Comment {
        id: String,
        depth: usize,
        author_id: String,
        content: String,
        vote_count: i64,
        reply_count: i64,
        is_deleted: bool,
        collapsed: bool,
    },
    /// Shown in place of a collapsed subtree.
    CollapsedBadge {
        id: String,
        depth: usize,
        reply_count: i64,
    },
    LoadReplies {
        parent_id: String,
        depth: usize,
        count: usize,
        error: Option<String>,
    },
    Loading {
        parent_id: String,
        depth: usize,
    },
    ShowMore {
        parent_id: String,
        depth: usize,
        remaining: usize,
    },
    /// The subtree under `parent_id` is too deep to inline.
    ContinueThread {
        parent_id: String,
        depth: usize,
        reply_count: i64,
    },
}

/// A fetch the caller should perform and report back with
/// [`CommentTree::finish_load`](super::tree::CommentTree::finish_load).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadRequest {
    pub comment_id: String,
}
