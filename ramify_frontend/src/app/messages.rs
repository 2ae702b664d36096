use log::{error, info};

use crate::models::CommentView;

use super::{tasks, ThreadViewer};

pub enum AppMessage {
    RootsLoaded {
        post_id: String,
        result: Result<Vec<CommentView>, anyhow::Error>,
    },
    /// A single comment opened as the new root ("continue thread").
    FocusLoaded {
        comment_id: String,
        result: Result<CommentView, anyhow::Error>,
    },
    RepliesLoaded {
        comment_id: String,
        result: Result<Vec<CommentView>, anyhow::Error>,
    },
}

/// Applies one message to the viewer and starts any follow-up fetches.
pub(super) fn handle_message(viewer: &mut ThreadViewer, message: AppMessage) {
    let requests = match message {
        AppMessage::RootsLoaded { post_id, result } => match result {
            Ok(comments) => {
                info!("loaded {} top-level comments for {post_id}", comments.len());
                viewer.error = None;
                viewer.tree.mount_roots(comments)
            }
            Err(err) => {
                error!("failed to load comments for {post_id}: {err:#}");
                viewer.error = Some(format!("{err:#}"));
                Vec::new()
            }
        },
        AppMessage::FocusLoaded { comment_id, result } => match result {
            Ok(comment) => {
                viewer.error = None;
                viewer.tree.mount_roots(vec![comment])
            }
            Err(err) => {
                error!("failed to open comment {comment_id}: {err:#}");
                viewer.error = Some(format!("{err:#}"));
                Vec::new()
            }
        },
        AppMessage::RepliesLoaded { comment_id, result } => {
            let result = result.map_err(|err| format!("{err:#}"));
            viewer.tree.finish_load(&comment_id, result)
        }
    };
    viewer.in_flight = viewer.in_flight.saturating_sub(1);
    for request in requests {
        viewer.in_flight += 1;
        tasks::load_replies(
            viewer.api.clone(),
            viewer.tx.clone(),
            request.comment_id,
            viewer.tree.config().page_limit,
        );
    }
}
