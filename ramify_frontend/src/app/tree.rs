use std::collections::HashMap;

use log::{debug, warn};

use crate::config::RenderConfig;
use crate::models::CommentView;

use super::state::{LoadRequest, LoadState, NodeState, RenderRow};

/// Client-side view of a comment tree that fetches replies lazily.
///
/// The tree never talks to the network itself. Every transition that needs
/// data hands back [`LoadRequest`]s, and the results come back through
/// [`CommentTree::finish_load`] in whatever order the fetches complete.
pub struct CommentTree {
    config: RenderConfig,
    nodes: HashMap<String, NodeState>,
    roots: Vec<String>,
}

enum Work {
    Node(String),
    Row(RenderRow),
}

impl CommentTree {
    pub fn new(config: RenderConfig) -> Self {
        Self {
            config,
            nodes: HashMap::new(),
            roots: Vec::new(),
        }
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Replaces the whole tree with `comments` as depth-0 nodes.
    pub fn mount_roots(&mut self, comments: Vec<CommentView>) -> Vec<LoadRequest> {
        self.nodes.clear();
        self.roots.clear();
        let mut requests = Vec::new();
        for comment in comments {
            self.roots.push(comment.id.clone());
            requests.extend(self.mount(comment, 0));
        }
        requests
    }

    pub fn node(&self, comment_id: &str) -> Option<&NodeState> {
        self.nodes.get(comment_id)
    }

    pub fn roots(&self) -> &[String] {
        &self.roots
    }

    pub fn pending_loads(&self) -> usize {
        self.nodes
            .values()
            .filter(|node| node.load == LoadState::Loading)
            .count()
    }

    /// User asked for a node's replies. `None` when there is nothing to fetch
    /// or a fetch is already in flight.
    pub fn request_load(&mut self, comment_id: &str) -> Option<LoadRequest> {
        let max_depth = self.config.max_depth;
        let node = self.nodes.get_mut(comment_id)?;
        if node.stored_replies() == 0 || !inline(node.depth, max_depth) {
            return None;
        }
        match node.load {
            LoadState::Unloaded { .. } => {
                node.load = LoadState::Loading;
                Some(LoadRequest {
                    comment_id: comment_id.to_string(),
                })
            }
            LoadState::Loading | LoadState::Loaded => None,
        }
    }

    /// Applies a finished fetch. Returns the follow-up loads for replies that
    /// are shallow enough to load on mount.
    pub fn finish_load(
        &mut self,
        comment_id: &str,
        result: Result<Vec<CommentView>, String>,
    ) -> Vec<LoadRequest> {
        let Some(node) = self.nodes.get_mut(comment_id) else {
            warn!("replies arrived for unknown comment {comment_id}");
            return Vec::new();
        };
        if node.load != LoadState::Loading {
            debug!("ignoring stale replies for {comment_id}");
            return Vec::new();
        }

        let replies = match result {
            Ok(replies) => replies,
            Err(error) => {
                warn!("failed to load replies for {comment_id}: {error}");
                node.load = LoadState::Unloaded { error: Some(error) };
                return Vec::new();
            }
        };

        let child_depth = node.depth + 1;
        node.children = replies.iter().map(|reply| reply.id.clone()).collect();
        node.visible_replies = self.config.initial_visible_replies.min(replies.len());
        node.load = LoadState::Loaded;

        let mut requests = Vec::new();
        for reply in replies {
            requests.extend(self.mount(reply, child_depth));
        }
        requests
    }

    pub fn collapse(&mut self, comment_id: &str) {
        if let Some(node) = self.nodes.get_mut(comment_id) {
            node.collapsed = true;
        }
    }

    /// Expanding never fetches; fetched replies come back as they were.
    pub fn expand(&mut self, comment_id: &str) {
        if let Some(node) = self.nodes.get_mut(comment_id) {
            node.collapsed = false;
        }
    }

    pub fn toggle_collapsed(&mut self, comment_id: &str) -> bool {
        match self.nodes.get_mut(comment_id) {
            Some(node) => {
                node.collapsed = !node.collapsed;
                node.collapsed
            }
            None => false,
        }
    }

    /// Reveals every fetched reply of the node.
    pub fn show_more(&mut self, comment_id: &str) {
        if let Some(node) = self.nodes.get_mut(comment_id) {
            node.visible_replies = node.children.len();
        }
    }

    /// Flattens the visible tree, depth first, in display order.
    pub fn rows(&self) -> Vec<RenderRow> {
        let mut rows = Vec::new();
        let mut stack: Vec<Work> = self.roots.iter().rev().cloned().map(Work::Node).collect();

        while let Some(work) = stack.pop() {
            let id = match work {
                Work::Row(row) => {
                    rows.push(row);
                    continue;
                }
                Work::Node(id) => id,
            };
            let Some(node) = self.nodes.get(&id) else {
                continue;
            };
            let comment = &node.comment;
            rows.push(RenderRow::Comment {
                id: comment.id.clone(),
                depth: node.depth,
                author_id: comment.author_id.clone(),
                content: comment.content.clone(),
                vote_count: comment.vote_count,
                reply_count: comment.reply_count,
                is_deleted: comment.is_deleted,
                collapsed: node.collapsed,
            });

            if node.collapsed {
                rows.push(RenderRow::CollapsedBadge {
                    id: id.clone(),
                    depth: node.depth,
                    reply_count: comment.reply_count,
                });
                continue;
            }
            if node.stored_replies() == 0 {
                continue;
            }
            let child_depth = node.depth + 1;
            if !inline(node.depth, self.config.max_depth) {
                rows.push(RenderRow::ContinueThread {
                    parent_id: id.clone(),
                    depth: child_depth,
                    reply_count: comment.reply_count,
                });
                continue;
            }

            match &node.load {
                LoadState::Unloaded { error } => rows.push(RenderRow::LoadReplies {
                    parent_id: id.clone(),
                    depth: child_depth,
                    count: node.stored_replies(),
                    error: error.clone(),
                }),
                LoadState::Loading => rows.push(RenderRow::Loading {
                    parent_id: id.clone(),
                    depth: child_depth,
                }),
                LoadState::Loaded => {
                    let visible = node.visible_replies.min(node.children.len());
                    let remaining = node.children.len() - visible;
                    if remaining > 0 {
                        stack.push(Work::Row(RenderRow::ShowMore {
                            parent_id: id.clone(),
                            depth: child_depth,
                            remaining,
                        }));
                    }
                    for child in node.children[..visible].iter().rev() {
                        stack.push(Work::Node(child.clone()));
                    }
                }
            }
        }
        rows
    }

    fn mount(&mut self, comment: CommentView, depth: usize) -> Option<LoadRequest> {
        let id = comment.id.clone();
        let auto_load = depth < self.config.auto_load_depth;
        self.nodes.insert(id.clone(), NodeState::new(comment, depth));
        if auto_load {
            self.request_load(&id)
        } else {
            None
        }
    }
}

/// Whether replies of a node at `depth` are drawn in place.
fn inline(depth: usize, max_depth: usize) -> bool {
    depth + 1 < max_depth
}
